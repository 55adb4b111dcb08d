use chrono::NaiveDate;

use crate::models::{
    Application, ApplicationStatus, Details, Document, DocumentStatus, Interaction, JobDetails,
    ScholarshipDetails,
};

/// Sample collection used when the local store has nothing saved yet.
pub fn seed_collection() -> Vec<Application> {
    vec![
        Application {
            app_id: 1,
            title: "Senior Full Stack Developer".to_string(),
            status: ApplicationStatus::Applied,
            applied_date: date(2025, 10, 1),
            deadline: date(2025, 11, 15),
            is_remote: true,
            country: "United States".to_string(),
            notes: "Found through LinkedIn".to_string(),
            created_at: "2025-10-01".to_string(),
            updated_at: "2025-10-01".to_string(),
            details: Details::Job(JobDetails {
                company_name: "TechCorp Inc".to_string(),
                source: "LinkedIn".to_string(),
                job_link: "https://linkedin.com/jobs/12345".to_string(),
                offer_salary: Some(120000.0),
                currency: "USD".to_string(),
                contact_id: Some(1),
                location: "Remote".to_string(),
            }),
            documents: vec![
                document(1, 1, "Resume", DocumentStatus::Submitted),
                document(2, 1, "Cover Letter", DocumentStatus::Submitted),
            ],
            interactions: vec![interaction(
                1,
                1,
                "2025-10-01",
                "Cold DM",
                "Sent initial application",
                "Application submitted",
            )],
        },
        Application {
            app_id: 2,
            title: "PhD Research Fellowship".to_string(),
            status: ApplicationStatus::UnderReview,
            applied_date: date(2025, 9, 15),
            deadline: date(2025, 12, 1),
            is_remote: false,
            country: "Germany".to_string(),
            notes: "Recommended by advisor".to_string(),
            created_at: "2025-09-15".to_string(),
            updated_at: "2025-09-15".to_string(),
            details: Details::Scholarship(ScholarshipDetails {
                institution_name: "Technical University of Munich".to_string(),
                professor_name: "Dr. Robert Johnson".to_string(),
                funding_amount: Some(50000.0),
                currency: "EUR".to_string(),
                awarded: false,
                program_name: "Computer Science PhD".to_string(),
            }),
            documents: vec![
                document(3, 2, "Research Proposal", DocumentStatus::Finalized),
                document(4, 2, "Transcripts", DocumentStatus::Submitted),
            ],
            interactions: vec![],
        },
        Application {
            app_id: 3,
            title: "Frontend Developer".to_string(),
            status: ApplicationStatus::Interviewing,
            applied_date: date(2025, 10, 5),
            deadline: date(2025, 10, 28),
            is_remote: true,
            country: "Canada".to_string(),
            notes: "Referral from colleague".to_string(),
            created_at: "2025-10-05".to_string(),
            updated_at: "2025-10-08".to_string(),
            details: Details::Job(JobDetails {
                company_name: "StartupXYZ".to_string(),
                source: "Referral".to_string(),
                job_link: "https://startupxyz.com/careers".to_string(),
                offer_salary: None,
                currency: "CAD".to_string(),
                contact_id: None,
                location: "Toronto, ON".to_string(),
            }),
            documents: vec![document(5, 3, "Portfolio", DocumentStatus::Submitted)],
            interactions: vec![interaction(
                2,
                3,
                "2025-10-08",
                "Initial Screening",
                "Phone screen with HR",
                "Moved to technical round",
            )],
        },
    ]
}

fn date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn document(doc_id: i64, app_id: i64, name: &str, status: DocumentStatus) -> Document {
    Document {
        doc_id,
        app_id,
        document_name: name.to_string(),
        status,
        path_url: String::new(),
        required: true,
        notes: String::new(),
    }
}

fn interaction(
    interaction_id: i64,
    app_id: i64,
    date: &str,
    kind: &str,
    description: &str,
    outcome: &str,
) -> Interaction {
    Interaction {
        interaction_id,
        app_id,
        interaction_date: date.to_string(),
        interaction_type: kind.to_string(),
        description: description.to_string(),
        outcome: outcome.to_string(),
    }
}
