//! Test doubles for the store seam.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use uuid::Uuid;

use super::db::{DbHandle, TaskflowDb};
use super::models::*;
use super::store::{ChangeFilter, ChangeSubscription, LocalStore, RemoteStore};

/// Per-operation call counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calls {
    pub project_fetches: usize,
    pub project_inserts: usize,
    pub ticket_fetches: usize,
    pub ticket_inserts: usize,
    pub updates: usize,
    pub notifications: usize,
}

impl Calls {
    pub fn since(&self, earlier: &Calls) -> Calls {
        Calls {
            project_fetches: self.project_fetches - earlier.project_fetches,
            project_inserts: self.project_inserts - earlier.project_inserts,
            ticket_fetches: self.ticket_fetches - earlier.ticket_fetches,
            ticket_inserts: self.ticket_inserts - earlier.ticket_inserts,
            updates: self.updates - earlier.updates,
            notifications: self.notifications - earlier.notifications,
        }
    }
}

/// `LocalStore` over in-memory SQLite that counts calls and can be told
/// to reject individual operations.
pub struct RecordingStore {
    inner: LocalStore,
    calls: Mutex<Calls>,
    last_patch: Mutex<Option<TicketPatch>>,
    fail_updates: AtomicBool,
    fail_notifications: AtomicBool,
    fail_ticket_fetches: AtomicBool,
    fail_inserts: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        let db = TaskflowDb::new_in_memory().expect("in-memory db");
        Self {
            inner: LocalStore::new(DbHandle::new(db)),
            calls: Mutex::new(Calls::default()),
            last_patch: Mutex::new(None),
            fail_updates: AtomicBool::new(false),
            fail_notifications: AtomicBool::new(false),
            fail_ticket_fetches: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_patch(&self) -> Option<TicketPatch> {
        self.last_patch.lock().unwrap().clone()
    }

    pub fn fail_updates(&self, on: bool) {
        self.fail_updates.store(on, Ordering::SeqCst);
    }

    pub fn fail_notifications(&self, on: bool) {
        self.fail_notifications.store(on, Ordering::SeqCst);
    }

    pub fn fail_ticket_fetches(&self, on: bool) {
        self.fail_ticket_fetches.store(on, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, on: bool) {
        self.fail_inserts.store(on, Ordering::SeqCst);
    }

    fn bump(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap());
    }
}

#[async_trait]
impl RemoteStore for RecordingStore {
    async fn upsert_profile(&self, email: &str, full_name: Option<&str>) -> Result<Profile> {
        self.inner.upsert_profile(email, full_name).await
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.inner.get_profile(id).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.bump(|c| c.project_fetches += 1);
        self.inner.list_projects().await
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        self.inner.get_project(id).await
    }

    async fn insert_project(&self, new: NewProject) -> Result<Project> {
        self.bump(|c| c.project_inserts += 1);
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("insert rejected");
        }
        self.inner.insert_project(new).await
    }

    async fn list_tickets(&self, project_id: Uuid) -> Result<Vec<Ticket>> {
        self.bump(|c| c.ticket_fetches += 1);
        if self.fail_ticket_fetches.load(Ordering::SeqCst) {
            bail!("fetch rejected");
        }
        self.inner.list_tickets(project_id).await
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        self.inner.get_ticket(id).await
    }

    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket> {
        self.bump(|c| c.ticket_inserts += 1);
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("insert rejected");
        }
        self.inner.insert_ticket(new).await
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch, updater_id: Uuid) -> Result<Ticket> {
        self.bump(|c| c.updates += 1);
        *self.last_patch.lock().unwrap() = Some(patch.clone());
        if self.fail_updates.load(Ordering::SeqCst) {
            bail!("update rejected");
        }
        self.inner.update_ticket(id, patch, updater_id).await
    }

    async fn insert_notification(&self, new: NewNotification) -> Result<Notification> {
        self.bump(|c| c.notifications += 1);
        if self.fail_notifications.load(Ordering::SeqCst) {
            bail!("notification rejected");
        }
        self.inner.insert_notification(new).await
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.inner.list_notifications(user_id).await
    }

    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        self.inner.subscribe(filter)
    }
}

/// A project with one `todo` ticket "t1" created by `creator`, plus a
/// second user `mover` who drags it.
pub struct Seeded {
    pub creator: Profile,
    pub mover: Profile,
    pub project: Project,
    pub ticket: Ticket,
    pub tickets: Vec<Ticket>,
}

pub async fn seed_board(store: &RecordingStore) -> Seeded {
    let creator = store
        .upsert_profile("creator@example.com", Some("Cora Creator"))
        .await
        .unwrap();
    let mover = store
        .upsert_profile("mover@example.com", None)
        .await
        .unwrap();
    let project = store
        .insert_project(NewProject {
            name: "Launch".into(),
            description: None,
            creator_id: creator.id,
        })
        .await
        .unwrap();
    let ticket = store
        .insert_ticket(NewTicket {
            title: "t1".into(),
            description: None,
            project_id: project.id,
            creator_id: creator.id,
            status: TicketStatus::Todo,
        })
        .await
        .unwrap();
    let tickets = store.list_tickets(project.id).await.unwrap();
    Seeded {
        creator,
        mover,
        project,
        ticket,
        tickets,
    }
}
