use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of an application, in the order a tracker walks through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Draft,
    Applied,
    #[serde(rename = "Under Review")]
    UnderReview,
    Interviewing,
    #[serde(rename = "Technical Assessment")]
    TechnicalAssessment,
    #[serde(rename = "Final Round")]
    FinalRound,
    #[serde(rename = "Offer Received")]
    OfferReceived,
    Awarded,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 10] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Interviewing,
        ApplicationStatus::TechnicalAssessment,
        ApplicationStatus::FinalRound,
        ApplicationStatus::OfferReceived,
        ApplicationStatus::Awarded,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "Draft",
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Interviewing => "Interviewing",
            ApplicationStatus::TechnicalAssessment => "Technical Assessment",
            ApplicationStatus::FinalRound => "Final Round",
            ApplicationStatus::OfferReceived => "Offer Received",
            ApplicationStatus::Awarded => "Awarded",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
        }
    }

    /// Submitted and still in play, before any interview.
    pub fn is_pending(&self) -> bool {
        matches!(self, ApplicationStatus::Applied | ApplicationStatus::UnderReview)
    }

    pub fn is_interviewing(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Interviewing
                | ApplicationStatus::TechnicalAssessment
                | ApplicationStatus::FinalRound
        )
    }

    pub fn is_offer(&self) -> bool {
        matches!(self, ApplicationStatus::OfferReceived | ApplicationStatus::Awarded)
    }

    /// Reached at least the submitted stage without dropping out.
    pub fn reached_applied(&self) -> bool {
        self.is_pending() || self.reached_interview()
    }

    pub fn reached_interview(&self) -> bool {
        self.is_interviewing() || self.is_offer()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ShapeError;

    // Accepts "Under Review", "under-review" and "under_review" alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| normalize_label(status.label()) == wanted)
            .ok_or_else(|| ShapeError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentStatus {
    Needed,
    Drafting,
    Finalized,
    Submitted,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Needed,
        DocumentStatus::Drafting,
        DocumentStatus::Finalized,
        DocumentStatus::Submitted,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DocumentStatus::Needed => "Needed",
            DocumentStatus::Drafting => "Drafting",
            DocumentStatus::Finalized => "Finalized",
            DocumentStatus::Submitted => "Submitted",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for DocumentStatus {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_label(s);
        DocumentStatus::ALL
            .into_iter()
            .find(|status| normalize_label(status.label()) == wanted)
            .ok_or_else(|| ShapeError::UnknownDocumentStatus(s.to_string()))
    }
}

fn normalize_label(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Wire discriminant, written as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    Job,
    Scholarship,
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationType::Job => f.pad("JOB"),
            ApplicationType::Scholarship => f.pad("SCHOLARSHIP"),
        }
    }
}

impl FromStr for ApplicationType {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JOB" => Ok(ApplicationType::Job),
            "SCHOLARSHIP" => Ok(ApplicationType::Scholarship),
            _ => Err(ShapeError::UnknownType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub company_name: String,
    #[serde(default)]
    pub source: String, // "LinkedIn", "Referral", ... used for analytics
    #[serde(default)]
    pub job_link: String,
    #[serde(default)]
    pub offer_salary: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub contact_id: Option<i64>, // contacts are not tracked here
    #[serde(default)]
    pub location: String,
}

impl JobDetails {
    pub fn new(company_name: &str, source: &str, job_link: &str) -> Self {
        Self {
            company_name: company_name.to_string(),
            source: source.to_string(),
            job_link: job_link.to_string(),
            offer_salary: None,
            currency: default_currency(),
            contact_id: None,
            location: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipDetails {
    pub institution_name: String,
    #[serde(default)]
    pub professor_name: String,
    #[serde(default)]
    pub funding_amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub awarded: bool,
    #[serde(default)]
    pub program_name: String,
}

impl ScholarshipDetails {
    pub fn new(institution_name: &str, professor_name: &str, program_name: &str) -> Self {
        Self {
            institution_name: institution_name.to_string(),
            professor_name: professor_name.to_string(),
            funding_amount: None,
            currency: default_currency(),
            awarded: false,
            program_name: program_name.to_string(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// The type-specific half of an application. A job can only ever carry job
/// details and a scholarship only scholarship details.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Job(JobDetails),
    Scholarship(ScholarshipDetails),
}

impl Details {
    pub fn kind(&self) -> ApplicationType {
        match self {
            Details::Job(_) => ApplicationType::Job,
            Details::Scholarship(_) => ApplicationType::Scholarship,
        }
    }

    /// Company for jobs, institution for scholarships.
    pub fn organization(&self) -> &str {
        match self {
            Details::Job(job) => &job.company_name,
            Details::Scholarship(s) => &s.institution_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: i64,
    pub app_id: i64,
    pub document_name: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub path_url: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_id: i64,
    pub app_id: i64,
    pub interaction_date: String,
    pub interaction_type: String, // free-form: "Cold DM", "Initial Screening", ...
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub outcome: String,
}

/// A tracked job or scholarship, with everything hanging off it.
///
/// On the wire this is the flat record with a `type` tag and optional
/// `job_details` / `scholarship_details` siblings. Decoding rejects records
/// whose detail sibling does not match the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ApplicationRecord", into = "ApplicationRecord")]
pub struct Application {
    pub app_id: i64,
    pub title: String,
    pub status: ApplicationStatus,
    pub applied_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub is_remote: bool,
    pub country: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
    pub details: Details,
    pub documents: Vec<Document>,
    pub interactions: Vec<Interaction>,
}

impl Application {
    pub fn kind(&self) -> ApplicationType {
        self.details.kind()
    }

    pub fn job_details(&self) -> Option<&JobDetails> {
        match &self.details {
            Details::Job(job) => Some(job),
            Details::Scholarship(_) => None,
        }
    }

    pub fn scholarship_details(&self) -> Option<&ScholarshipDetails> {
        match &self.details {
            Details::Scholarship(s) => Some(s),
            Details::Job(_) => None,
        }
    }

    pub fn organization(&self) -> &str {
        self.details.organization()
    }
}

/// What the creating context supplies; ids and timestamps are assigned on
/// insertion.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub title: String,
    pub status: ApplicationStatus,
    pub applied_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub is_remote: bool,
    pub country: String,
    pub notes: String,
    pub details: Details,
    pub documents: Vec<NewDocument>,
}

impl NewApplication {
    pub fn new(title: &str, details: Details) -> Self {
        Self {
            title: title.to_string(),
            status: ApplicationStatus::Draft,
            applied_date: None,
            deadline: None,
            is_remote: false,
            country: String::new(),
            notes: String::new(),
            details,
            documents: vec![NewDocument::new("Resume")],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub document_name: String,
    pub status: DocumentStatus,
    pub required: bool,
}

impl NewDocument {
    pub fn new(document_name: &str) -> Self {
        Self {
            document_name: document_name.to_string(),
            status: DocumentStatus::Needed,
            required: true,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ShapeError {
    #[error("application #{0} is JOB but has no job_details")]
    MissingJobDetails(i64),
    #[error("application #{0} is SCHOLARSHIP but has no scholarship_details")]
    MissingScholarshipDetails(i64),
    #[error("application #{0} is JOB but carries scholarship_details")]
    StrayScholarshipDetails(i64),
    #[error("application #{0} is SCHOLARSHIP but carries job_details")]
    StrayJobDetails(i64),
    #[error("detail record of application #{app_id} points at #{detail_app_id}")]
    DetailIdMismatch { app_id: i64, detail_app_id: i64 },
    #[error("unknown application status '{0}'")]
    UnknownStatus(String),
    #[error("unknown document status '{0}'")]
    UnknownDocumentStatus(String),
    #[error("unknown application type '{0}' (expected JOB or SCHOLARSHIP)")]
    UnknownType(String),
}

// --- Wire representation ---

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Linked<T> {
    #[serde(default)]
    app_id: Option<i64>,
    #[serde(flatten)]
    inner: T,
}

impl<T> Linked<T> {
    fn unlink(self, app_id: i64) -> Result<T, ShapeError> {
        match self.app_id {
            Some(detail_app_id) if detail_app_id != app_id => Err(ShapeError::DetailIdMismatch {
                app_id,
                detail_app_id,
            }),
            _ => Ok(self.inner),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationRecord {
    app_id: i64,
    #[serde(rename = "type")]
    kind: ApplicationType,
    title: String,
    status: ApplicationStatus,
    #[serde(default)]
    applied_date: Option<NaiveDate>,
    #[serde(default)]
    deadline: Option<NaiveDate>,
    #[serde(default)]
    is_remote: bool,
    #[serde(default)]
    country: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_details: Option<Linked<JobDetails>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scholarship_details: Option<Linked<ScholarshipDetails>>,
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    interactions: Vec<Interaction>,
}

impl TryFrom<ApplicationRecord> for Application {
    type Error = ShapeError;

    fn try_from(record: ApplicationRecord) -> Result<Self, Self::Error> {
        let app_id = record.app_id;
        let details = match (record.kind, record.job_details, record.scholarship_details) {
            (ApplicationType::Job, Some(job), None) => Details::Job(job.unlink(app_id)?),
            (ApplicationType::Job, None, _) => return Err(ShapeError::MissingJobDetails(app_id)),
            (ApplicationType::Job, Some(_), Some(_)) => {
                return Err(ShapeError::StrayScholarshipDetails(app_id));
            }
            (ApplicationType::Scholarship, None, Some(s)) => {
                Details::Scholarship(s.unlink(app_id)?)
            }
            (ApplicationType::Scholarship, _, None) => {
                return Err(ShapeError::MissingScholarshipDetails(app_id));
            }
            (ApplicationType::Scholarship, Some(_), Some(_)) => {
                return Err(ShapeError::StrayJobDetails(app_id));
            }
        };

        let mut documents = record.documents;
        let mut interactions = record.interactions;
        if documents.iter().any(|d| d.app_id != app_id)
            || interactions.iter().any(|i| i.app_id != app_id)
        {
            log::warn!("Re-homing children of application #{} that point elsewhere", app_id);
            documents.iter_mut().for_each(|d| d.app_id = app_id);
            interactions.iter_mut().for_each(|i| i.app_id = app_id);
        }

        Ok(Application {
            app_id,
            title: record.title,
            status: record.status,
            applied_date: record.applied_date,
            deadline: record.deadline,
            is_remote: record.is_remote,
            country: record.country,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
            details,
            documents,
            interactions,
        })
    }
}

impl From<Application> for ApplicationRecord {
    fn from(app: Application) -> Self {
        let app_id = app.app_id;
        let kind = app.kind();
        let (job_details, scholarship_details) = match app.details {
            Details::Job(inner) => (Some(Linked { app_id: Some(app_id), inner }), None),
            Details::Scholarship(inner) => (None, Some(Linked { app_id: Some(app_id), inner })),
        };
        ApplicationRecord {
            app_id,
            kind,
            title: app.title,
            status: app.status,
            applied_date: app.applied_date,
            deadline: app.deadline,
            is_remote: app.is_remote,
            country: app.country,
            notes: app.notes,
            created_at: app.created_at,
            updated_at: app.updated_at,
            job_details,
            scholarship_details,
            documents: app.documents,
            interactions: app.interactions,
        }
    }
}
