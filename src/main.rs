use anyhow::{anyhow, Result};
use apex::models::{
    Application, ApplicationStatus, ApplicationType, Details, DocumentStatus, JobDetails,
    NewApplication, NewDocument, ScholarshipDetails,
};
use apex::stats::{Analytics, Dashboard};
use apex::tracker::{Change, Filter, NewInteraction, Tracker};
use apex::{Config, Database, LocalStore, RemoteSync};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apex")]
#[command(about = "Track job and scholarship applications, locally first")]
struct Cli {
    /// Path to the local database (default: per-user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Never talk to the remote database, even if configured
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List applications
    List {
        /// Filter by status (e.g. applied, under-review, interviewing)
        #[arg(short, long)]
        status: Option<ApplicationStatus>,

        /// Filter by type (job, scholarship)
        #[arg(short = 't', long = "type")]
        kind: Option<ApplicationType>,

        /// Search title, company and institution
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Create an application
    Add {
        #[command(subcommand)]
        command: AddCommands,
    },

    /// Move an application to another status
    Status {
        /// Application ID
        id: i64,

        /// New status
        status: ApplicationStatus,
    },

    /// Log an interaction (call, email, interview...)
    Interact {
        /// Application ID
        id: i64,

        /// Kind of interaction, e.g. "Cold DM" or "Initial Screening"
        kind: String,

        /// Date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long, default_value = "")]
        outcome: String,
    },

    /// Update a document's status
    Doc {
        /// Application ID
        id: i64,

        /// Document ID
        doc_id: i64,

        /// New status (needed, drafting, finalized, submitted)
        status: DocumentStatus,
    },

    /// Stage counts, upcoming deadlines and recent applications
    Dashboard {
        /// Number of recent applications to show
        #[arg(short, long, default_value = "5")]
        recent: usize,
    },

    /// Conversion funnel and per-source success rates
    Analytics,

    /// Manage preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },

    /// Push the whole collection to the remote database now
    Sync,

    /// Forget all saved applications (sample data comes back on next start)
    Reset {
        /// Required to actually clear the store
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AddCommands {
    /// Add a job application
    Job {
        #[command(flatten)]
        common: CommonArgs,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Where the posting was found (LinkedIn, Referral, ...)
        #[arg(long, default_value = "")]
        source: String,

        /// Link to the posting
        #[arg(long, default_value = "")]
        link: String,
    },

    /// Add a scholarship application
    Scholarship {
        #[command(flatten)]
        common: CommonArgs,

        /// Institution name
        #[arg(short, long)]
        institution: String,

        /// Supervising professor
        #[arg(long, default_value = "")]
        professor: String,

        /// Program name
        #[arg(long, default_value = "")]
        program: String,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Title of the position or scholarship
    title: String,

    /// Initial status
    #[arg(short, long, default_value = "draft")]
    status: ApplicationStatus,

    /// Date applied (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    applied: Option<NaiveDate>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    deadline: Option<NaiveDate>,

    /// Remote position / program
    #[arg(long)]
    remote: bool,

    #[arg(long, default_value = "")]
    country: String,

    #[arg(short, long, default_value = "")]
    notes: String,

    /// Required document (repeatable; default: Resume)
    #[arg(long = "doc")]
    docs: Vec<String>,
}

impl CommonArgs {
    fn into_draft(self, details: Details) -> NewApplication {
        let mut draft = NewApplication::new(&self.title, details);
        draft.status = self.status;
        draft.applied_date = self.applied;
        draft.deadline = self.deadline;
        draft.is_remote = self.remote;
        draft.country = self.country;
        draft.notes = self.notes;
        if !self.docs.is_empty() {
            draft.documents = self.docs.iter().map(|d| NewDocument::new(d)).collect();
        }
        draft
    }
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Show or set the dark mode preference
    DarkMode {
        /// on / off
        value: Option<String>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.db, cli.offline);
    let db = Database::open_at(&config.db_path)?;
    let store = LocalStore::new(db);

    match cli.command {
        Commands::Reset { yes } => {
            if yes {
                store.clear();
                println!("Cleared saved applications at {}", config.db_path.display());
            } else {
                println!("This forgets every saved application. Re-run with --yes to confirm.");
            }
        }

        Commands::Prefs { command } => match command {
            PrefsCommands::DarkMode { value } => match value.as_deref() {
                None => println!("Dark mode: {}", on_off(store.dark_mode())),
                Some("on") | Some("true") => {
                    store.set_dark_mode(true);
                    println!("Dark mode: on");
                }
                Some("off") | Some("false") => {
                    store.set_dark_mode(false);
                    println!("Dark mode: off");
                }
                Some(other) => return Err(anyhow!("Expected 'on' or 'off', got '{}'", other)),
            },
        },

        Commands::List {
            status,
            kind,
            query,
        } => {
            let tracker = open_tracker(store, &config);
            let filter = Filter {
                query,
                kind,
                status,
            };
            let apps = tracker.filter(&filter);
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                print_table(&apps);
                println!(
                    "\nShowing {} of {} applications",
                    apps.len(),
                    tracker.applications().len()
                );
            }
        }

        Commands::Show { id } => {
            let tracker = open_tracker(store, &config);
            match tracker.get(id) {
                Some(app) => print_application(app),
                None => println!("Application #{} not found.", id),
            }
        }

        Commands::Add { command } => {
            let draft = match command {
                AddCommands::Job {
                    common,
                    company,
                    source,
                    link,
                } => common.into_draft(Details::Job(JobDetails::new(&company, &source, &link))),
                AddCommands::Scholarship {
                    common,
                    institution,
                    professor,
                    program,
                } => common.into_draft(Details::Scholarship(ScholarshipDetails::new(
                    &institution,
                    &professor,
                    &program,
                ))),
            };
            let mut tracker = open_tracker(store, &config);
            let change = tracker.create(draft)?;
            println!("Added application #{}", change.app_id);
            finish_sync(change);
        }

        Commands::Status { id, status } => {
            let mut tracker = open_tracker(store, &config);
            let change = tracker.set_status(id, status)?;
            println!("Application #{} is now {}.", id, status);
            finish_sync(change);
        }

        Commands::Interact {
            id,
            kind,
            date,
            description,
            outcome,
        } => {
            if let Some(date) = &date {
                parse_date(date).map_err(|e| anyhow!(e))?;
            }
            let mut tracker = open_tracker(store, &config);
            let change = tracker.add_interaction(
                id,
                NewInteraction {
                    interaction_date: date,
                    interaction_type: kind,
                    description,
                    outcome,
                },
            )?;
            println!("Logged interaction on application #{}.", id);
            finish_sync(change);
        }

        Commands::Doc { id, doc_id, status } => {
            let mut tracker = open_tracker(store, &config);
            let change = tracker.set_document_status(id, doc_id, status)?;
            println!("Document #{} is now {}.", doc_id, status);
            finish_sync(change);
        }

        Commands::Dashboard { recent } => {
            let tracker = open_tracker(store, &config);
            let dash = Dashboard::compute(tracker.applications(), chrono::Utc::now());
            println!("{:<14} {:>5}", "TOTAL", dash.total);
            println!("{:<14} {:>5}", "APPLIED", dash.applied);
            println!("{:<14} {:>5}", "INTERVIEWING", dash.interviewing);
            println!("{:<14} {:>5}", "OFFERS", dash.offers);

            println!("\nUpcoming deadlines:");
            if dash.upcoming.is_empty() {
                println!("  No upcoming deadlines.");
            }
            for u in &dash.upcoming {
                println!(
                    "  #{:<4} {:<30} {:<20} {} ({} day{})",
                    u.app_id,
                    truncate(&u.title, 28),
                    truncate(&u.organization, 18),
                    u.deadline,
                    u.days_until,
                    if u.days_until == 1 { "" } else { "s" }
                );
            }

            println!("\nRecent applications:");
            let recent: Vec<&Application> = tracker.recent(recent).iter().collect();
            print_table(&recent);
        }

        Commands::Analytics => {
            let tracker = open_tracker(store, &config);
            let analytics = Analytics::compute(tracker.applications());
            println!("Conversion funnel:");
            for stage in &analytics.funnel {
                println!(
                    "  {:<14} {:>5} ({:>3}%) {}",
                    stage.stage,
                    stage.count,
                    stage.percentage,
                    bar(stage.percentage)
                );
            }

            println!("\nSource analysis:");
            if analytics.sources.is_empty() {
                println!("  No source data available.");
            }
            for source in &analytics.sources {
                println!(
                    "  {:<20} {} / {} ({}%)",
                    truncate(&source.name, 18),
                    source.offers,
                    source.total,
                    source.success_rate
                );
            }
        }

        Commands::Sync => {
            let tracker = open_tracker(store, &config);
            if !tracker.remote().is_enabled() {
                println!(
                    "Remote sync is not configured. Set {} and {}.",
                    apex::config::REMOTE_URL_VAR,
                    apex::config::REMOTE_KEY_VAR
                );
            } else {
                match tracker.sync_now() {
                    Some(_) => println!(
                        "Synced {} applications to the remote database.",
                        tracker.applications().len()
                    ),
                    None => println!("Remote sync failed; local data is unaffected."),
                }
            }
        }
    }

    Ok(())
}

fn open_tracker(store: LocalStore, config: &Config) -> Tracker {
    Tracker::open(store, RemoteSync::initialize(config.remote.clone()))
}

/// A CLI process exits right after the command, so wait for the background
/// push instead of abandoning it.
fn finish_sync(change: Change) {
    if let Some(pending) = change.sync {
        if pending.wait().is_none() {
            eprintln!("Remote sync failed; saved locally only.");
        }
    }
}

fn print_table(apps: &[&Application]) {
    println!(
        "{:<6} {:<12} {:<22} {:<30} {:<20} {:<12}",
        "ID", "TYPE", "STATUS", "TITLE", "ORGANIZATION", "DEADLINE"
    );
    println!("{}", "-".repeat(104));
    for app in apps {
        println!(
            "{:<6} {:<12} {:<22} {:<30} {:<20} {:<12}",
            app.app_id,
            app.kind(),
            app.status,
            truncate(&app.title, 28),
            truncate(app.organization(), 18),
            app.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }
}

fn print_application(app: &Application) {
    println!("Application #{} ({})", app.app_id, app.kind());
    println!("Title: {}", app.title);
    println!("Status: {}", app.status);
    match &app.details {
        Details::Job(job) => {
            println!("Company: {}", job.company_name);
            if !job.location.is_empty() {
                println!("Location: {}", job.location);
            }
            if !job.source.is_empty() {
                println!("Source: {}", job.source);
            }
            if !job.job_link.is_empty() {
                println!("Link: {}", job.job_link);
            }
            if let Some(salary) = job.offer_salary {
                println!("Offer: {} {}", salary, job.currency);
            }
        }
        Details::Scholarship(s) => {
            println!("Institution: {}", s.institution_name);
            if !s.program_name.is_empty() {
                println!("Program: {}", s.program_name);
            }
            if !s.professor_name.is_empty() {
                println!("Professor: {}", s.professor_name);
            }
            if let Some(amount) = s.funding_amount {
                println!("Funding: {} {}", amount, s.currency);
            }
            println!("Awarded: {}", if s.awarded { "yes" } else { "no" });
        }
    }
    if !app.country.is_empty() {
        println!("Country: {}{}", app.country, if app.is_remote { " (remote)" } else { "" });
    }
    if let Some(applied) = app.applied_date {
        println!("Applied: {}", applied);
    }
    if let Some(deadline) = app.deadline {
        println!("Deadline: {}", deadline);
    }
    println!("Created: {}", app.created_at);
    println!("Updated: {}", app.updated_at);

    if !app.notes.is_empty() {
        println!("\n--- Notes ---");
        for line in textwrap::wrap(&app.notes, 72) {
            println!("{}", line);
        }
    }

    if !app.documents.is_empty() {
        println!("\nDocuments ({}):", app.documents.len());
        for doc in &app.documents {
            println!(
                "  #{} - {} [{}]{}",
                doc.doc_id,
                doc.document_name,
                doc.status,
                if doc.required { "" } else { " (optional)" }
            );
        }
    }

    if !app.interactions.is_empty() {
        println!("\nInteractions ({}):", app.interactions.len());
        for i in &app.interactions {
            println!("  {} {}: {}", i.interaction_date, i.interaction_type, i.description);
            if !i.outcome.is_empty() {
                println!("      -> {}", i.outcome);
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn bar(percentage: u32) -> String {
    "#".repeat((percentage / 5) as usize)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
