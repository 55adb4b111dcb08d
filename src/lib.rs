pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod seed;
pub mod stats;
pub mod tracker;

pub use config::Config;
pub use db::{Database, LocalStore, SlotStore};
pub use models::{
    Application, ApplicationStatus, ApplicationType, Details, Document, DocumentStatus,
    Interaction, JobDetails, NewApplication, NewDocument, ScholarshipDetails,
};
pub use remote::{PendingSync, RemoteClient, RemoteConfig, RemoteSync, SupabaseClient};
pub use tracker::{Change, Filter, NewInteraction, Tracker};
