mod common;

use apex::models::{Application, ApplicationStatus, ApplicationType};
use apex::{RemoteSync, Tracker};
use common::*;

#[test]
fn creating_fourth_record_after_seed() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = db_path(&dir);
    let mut tracker = Tracker::open(open_store(&path), RemoteSync::disabled());

    let change = tracker.create(job_draft("X"))?;
    assert_eq!(change.app_id, 4);
    assert!(change.sync.is_none());
    assert_eq!(tracker.applications().len(), 4);

    let created = tracker.get(4).unwrap().clone();
    assert_eq!(created.kind(), ApplicationType::Job);
    assert_eq!(created.title, "X");

    let saved: Vec<Application> = open_store(&path).load_collection().unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(saved[3], created);
    Ok(())
}

#[test]
fn restart_picks_up_where_it_left_off() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = db_path(&dir);
    {
        let mut tracker = Tracker::open(open_store(&path), RemoteSync::disabled());
        tracker.create(job_draft("First"))?;
        tracker.set_status(4, ApplicationStatus::Applied)?;
    }

    let mut tracker = Tracker::open(open_store(&path), RemoteSync::disabled());
    assert_eq!(tracker.applications().len(), 4);
    assert_eq!(tracker.get(4).unwrap().status, ApplicationStatus::Applied);

    let change = tracker.create(job_draft("Second"))?;
    assert_eq!(change.app_id, 5);
    Ok(())
}

#[test]
fn cleared_store_comes_back_as_seed() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = db_path(&dir);
    {
        let mut tracker = Tracker::open(open_store(&path), RemoteSync::disabled());
        tracker.create(job_draft("Temporary"))?;
        tracker.store().clear();
    }
    let tracker = Tracker::open(open_store(&path), RemoteSync::disabled());
    assert_eq!(tracker.applications().len(), 3);
    Ok(())
}
