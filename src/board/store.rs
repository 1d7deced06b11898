//! The data client seam: row CRUD plus a change feed.
//!
//! Everything above this module talks to `dyn RemoteStore`. `LocalStore` is
//! the SQLite-backed implementation used by the CLI and the HTTP server; it
//! publishes a `ChangeEvent` after every successful write so subscribers can
//! invalidate and refetch.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::db::DbHandle;
use super::models::*;

/// Default broadcast capacity of a change feed.
pub const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Projects,
    Tickets,
    Notifications,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Projects => "projects",
            Self::Tickets => "tickets",
            Self::Notifications => "notifications",
        }
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profiles" => Ok(Self::Profiles),
            "projects" => Ok(Self::Projects),
            "tickets" => Ok(Self::Tickets),
            "notifications" => Ok(Self::Notifications),
            _ => Err(format!("Invalid table: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// "Something changed" signal. Carries just enough to filter on; consumers
/// refetch rather than apply it as a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Uuid,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeFilter {
    pub table: Table,
    pub project_id: Option<Uuid>,
}

impl ChangeFilter {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            project_id: None,
        }
    }

    pub fn in_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match self.project_id {
            Some(wanted) => event.project_id == Some(wanted),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSignal {
    Changed(ChangeEvent),
    /// The receiver fell behind and dropped this many events.
    Missed(u64),
}

/// Fan-out of change events to every live subscription.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(
            table = event.table.as_str(),
            kind = ?event.kind,
            row_id = %event.row_id,
            "change published"
        );
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        ChangeSubscription {
            filter,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}

/// A registered change listener. Dropping it deregisters.
pub struct ChangeSubscription {
    filter: ChangeFilter,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn filter(&self) -> ChangeFilter {
        self.filter
    }

    /// Wait for the next matching signal. `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChangeSignal> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(ChangeSignal::Changed(event));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Some(ChangeSignal::Missed(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<ChangeSignal> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(ChangeSignal::Changed(event));
                }
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(ChangeSignal::Missed(n));
                }
                Err(_) => return None,
            }
        }
    }
}

/// Row-based access to profiles, projects, tickets and notifications.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upsert_profile(&self, email: &str, full_name: Option<&str>) -> Result<Profile>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    /// Newest first, creator embedded.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    async fn insert_project(&self, new: NewProject) -> Result<Project>;

    /// Ascending position, creator and updater embedded.
    async fn list_tickets(&self, project_id: Uuid) -> Result<Vec<Ticket>>;

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>>;

    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket>;

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch, updater_id: Uuid) -> Result<Ticket>;

    async fn insert_notification(&self, new: NewNotification) -> Result<Notification>;

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>>;

    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription;
}

/// SQLite-backed store with an in-process change feed.
#[derive(Clone)]
pub struct LocalStore {
    db: DbHandle,
    feed: ChangeFeed,
}

impl LocalStore {
    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
        }
    }

    pub fn db(&self) -> &DbHandle {
        &self.db
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn into_shared(self) -> Arc<dyn RemoteStore> {
        Arc::new(self)
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn upsert_profile(&self, email: &str, full_name: Option<&str>) -> Result<Profile> {
        let email = email.to_string();
        let full_name = full_name.map(str::to_string);
        let profile = self
            .db
            .call(move |db| db.upsert_profile(&email, full_name.as_deref()))
            .await?;
        self.feed.publish(ChangeEvent {
            table: Table::Profiles,
            kind: ChangeKind::Update,
            row_id: profile.id,
            project_id: None,
        });
        Ok(profile)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        self.db.call(move |db| db.get_profile(id)).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.db.call(|db| db.list_projects()).await
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        self.db.call(move |db| db.get_project(id)).await
    }

    async fn insert_project(&self, new: NewProject) -> Result<Project> {
        let project = self.db.call(move |db| db.create_project(&new)).await?;
        self.feed.publish(ChangeEvent {
            table: Table::Projects,
            kind: ChangeKind::Insert,
            row_id: project.id,
            project_id: Some(project.id),
        });
        Ok(project)
    }

    async fn list_tickets(&self, project_id: Uuid) -> Result<Vec<Ticket>> {
        self.db.call(move |db| db.list_tickets(project_id)).await
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        self.db.call(move |db| db.get_ticket(id)).await
    }

    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket> {
        let ticket = self.db.call(move |db| db.create_ticket(&new)).await?;
        self.feed.publish(ChangeEvent {
            table: Table::Tickets,
            kind: ChangeKind::Insert,
            row_id: ticket.id,
            project_id: Some(ticket.project_id),
        });
        Ok(ticket)
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch, updater_id: Uuid) -> Result<Ticket> {
        let ticket = self
            .db
            .call(move |db| db.update_ticket(id, &patch, updater_id))
            .await?;
        self.feed.publish(ChangeEvent {
            table: Table::Tickets,
            kind: ChangeKind::Update,
            row_id: ticket.id,
            project_id: Some(ticket.project_id),
        });
        Ok(ticket)
    }

    async fn insert_notification(&self, new: NewNotification) -> Result<Notification> {
        let notification = self.db.call(move |db| db.create_notification(&new)).await?;
        self.feed.publish(ChangeEvent {
            table: Table::Notifications,
            kind: ChangeKind::Insert,
            row_id: notification.id,
            project_id: notification.project_id,
        });
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.db.call(move |db| db.list_notifications(user_id)).await
    }

    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        self.feed.subscribe(filter)
    }
}
