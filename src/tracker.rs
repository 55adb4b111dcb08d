use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::db::LocalStore;
use crate::models::{
    Application, ApplicationStatus, ApplicationType, Details, Document, DocumentStatus,
    Interaction, NewApplication,
};
use crate::remote::{PendingSync, RemoteSync, APPLICATIONS_TABLE};
use crate::seed::seed_collection;

/// Owns the in-memory collection and keeps it mirrored.
///
/// Every mutation saves the full collection to the local store before
/// returning. When remote sync is enabled the same collection is also handed
/// to a background upsert whose outcome the caller may ignore.
pub struct Tracker {
    apps: Vec<Application>,
    store: LocalStore,
    remote: RemoteSync,
}

/// Result of a mutation: the record touched and the remote push, if one was
/// started.
#[derive(Debug)]
pub struct Change {
    pub app_id: i64,
    pub sync: Option<PendingSync>,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub query: Option<String>,
    pub kind: Option<ApplicationType>,
    pub status: Option<ApplicationStatus>,
}

impl Filter {
    pub fn matches(&self, app: &Application) -> bool {
        if let Some(kind) = self.kind {
            if app.kind() != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if app.status != status {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => {
                let q = q.to_lowercase();
                app.title.to_lowercase().contains(&q) || app.organization().to_lowercase().contains(&q)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub interaction_date: Option<String>,
    pub interaction_type: String,
    pub description: String,
    pub outcome: String,
}

impl Tracker {
    /// Loads the saved collection, falling back to the seed data.
    pub fn open(store: LocalStore, remote: RemoteSync) -> Self {
        let apps = match store.load_collection() {
            Some(apps) => apps,
            None => {
                log::info!("No saved applications, starting from sample data");
                seed_collection()
            }
        };
        let tracker = Self { apps, store, remote };
        tracker.store.save_collection(&tracker.apps);
        tracker
    }

    pub fn applications(&self) -> &[Application] {
        &self.apps
    }

    pub fn get(&self, app_id: i64) -> Option<&Application> {
        self.apps.iter().find(|a| a.app_id == app_id)
    }

    /// First `n` records in insertion order.
    pub fn recent(&self, n: usize) -> &[Application] {
        &self.apps[..n.min(self.apps.len())]
    }

    pub fn filter(&self, filter: &Filter) -> Vec<&Application> {
        self.apps.iter().filter(|a| filter.matches(a)).collect()
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote(&self) -> &RemoteSync {
        &self.remote
    }

    pub fn create(&mut self, draft: NewApplication) -> Result<Change> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Title is required"));
        }

        let drafts: Vec<_> = draft
            .documents
            .into_iter()
            .filter(|d| !d.document_name.trim().is_empty())
            .collect();
        let mut doc_ids = Vec::with_capacity(drafts.len());
        let mut last_doc_id =
            max_or_zero(self.apps.iter().flat_map(|a| &a.documents).map(|d| d.doc_id));
        for _ in &drafts {
            last_doc_id = successor(last_doc_id)?;
            doc_ids.push(last_doc_id);
        }

        let floor = successor(max_or_zero(self.apps.iter().map(|a| a.app_id)))?;
        let app_id = self.store.next_id_at_least(floor)?;
        let now = timestamp();

        let documents = drafts
            .into_iter()
            .zip(doc_ids)
            .map(|(d, doc_id)| Document {
                doc_id,
                app_id,
                document_name: d.document_name.trim().to_string(),
                status: d.status,
                path_url: String::new(),
                required: d.required,
                notes: String::new(),
            })
            .collect();

        let details = match draft.details {
            Details::Job(mut job) => {
                if job.location.is_empty() {
                    job.location = draft.country.clone();
                }
                Details::Job(job)
            }
            scholarship => scholarship,
        };

        self.apps.push(Application {
            app_id,
            title: title.to_string(),
            status: draft.status,
            applied_date: draft.applied_date,
            deadline: draft.deadline,
            is_remote: draft.is_remote,
            country: draft.country,
            notes: draft.notes,
            created_at: now.clone(),
            updated_at: now,
            details,
            documents,
            interactions: Vec::new(),
        });
        Ok(self.commit(app_id))
    }

    pub fn set_status(&mut self, app_id: i64, status: ApplicationStatus) -> Result<Change> {
        let app = self.get_mut(app_id)?;
        app.status = status;
        if let Details::Scholarship(s) = &mut app.details {
            s.awarded = status == ApplicationStatus::Awarded;
        }
        app.updated_at = timestamp();
        Ok(self.commit(app_id))
    }

    pub fn add_interaction(&mut self, app_id: i64, new: NewInteraction) -> Result<Change> {
        if new.interaction_type.trim().is_empty() {
            return Err(anyhow!("Interaction type is required"));
        }
        let interaction_id = successor(max_or_zero(
            self.apps
                .iter()
                .flat_map(|a| &a.interactions)
                .map(|i| i.interaction_id),
        ))?;
        let app = self.get_mut(app_id)?;
        app.interactions.push(Interaction {
            interaction_id,
            app_id,
            interaction_date: new
                .interaction_date
                .unwrap_or_else(|| Utc::now().date_naive().to_string()),
            interaction_type: new.interaction_type.trim().to_string(),
            description: new.description,
            outcome: new.outcome,
        });
        app.updated_at = timestamp();
        Ok(self.commit(app_id))
    }

    pub fn set_document_status(
        &mut self,
        app_id: i64,
        doc_id: i64,
        status: DocumentStatus,
    ) -> Result<Change> {
        let app = self.get_mut(app_id)?;
        let doc = app
            .documents
            .iter_mut()
            .find(|d| d.doc_id == doc_id)
            .ok_or_else(|| anyhow!("Document #{} not found on application #{}", doc_id, app_id))?;
        doc.status = status;
        app.updated_at = timestamp();
        Ok(self.commit(app_id))
    }

    /// Pushes the whole collection in the foreground. `None` when sync is
    /// disabled or the remote refused it.
    pub fn sync_now(&self) -> Option<Value> {
        self.remote.sync_collection(APPLICATIONS_TABLE, &self.apps)
    }

    fn commit(&self, app_id: i64) -> Change {
        self.store.save_collection(&self.apps);
        let sync = self.remote.spawn_sync(APPLICATIONS_TABLE, self.apps.clone());
        Change { app_id, sync }
    }

    fn get_mut(&mut self, app_id: i64) -> Result<&mut Application> {
        self.apps
            .iter_mut()
            .find(|a| a.app_id == app_id)
            .ok_or_else(|| anyhow!("Application #{} not found", app_id))
    }
}

fn max_or_zero(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0)
}

fn successor(id: i64) -> Result<i64> {
    id.checked_add(1)
        .ok_or_else(|| anyhow!("Id space exhausted after {}", id))
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
