use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::models::*;
use crate::errors::TaskflowError;

/// Async-safe handle to the board database.
///
/// Wraps `TaskflowDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TaskflowDb>>,
}

impl DbHandle {
    pub fn new(db: TaskflowDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TaskflowDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| anyhow::Error::new(TaskflowError::LockPoisoned))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

/// Timestamp format shared by every table: RFC 3339, UTC, milliseconds.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

const PROFILE_COLUMNS: &str = "id, email, full_name, created_at, updated_at";

const PROJECT_SELECT: &str = "SELECT p.id, p.name, p.description, p.creator_id, p.created_at, p.updated_at,
        c.id, c.email, c.full_name, c.created_at, c.updated_at
     FROM projects p
     LEFT JOIN profiles c ON c.id = p.creator_id";

const TICKET_SELECT: &str = "SELECT t.id, t.title, t.description, t.status, t.project_id, t.creator_id, t.updater_id,
        t.position, t.created_at, t.updated_at,
        c.id, c.email, c.full_name, c.created_at, c.updated_at,
        u.id, u.email, u.full_name, u.created_at, u.updated_at
     FROM tickets t
     LEFT JOIN profiles c ON c.id = t.creator_id
     LEFT JOIN profiles u ON u.id = t.updater_id";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, message, ticket_id, project_id, read, created_at";

pub struct TaskflowDb {
    conn: Connection,
}

impl TaskflowDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL UNIQUE,
                    full_name TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT,
                    creator_id TEXT NOT NULL REFERENCES profiles(id),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tickets (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    status TEXT NOT NULL DEFAULT 'todo'
                        CHECK (status IN ('todo', 'in_progress', 'done')),
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    creator_id TEXT NOT NULL REFERENCES profiles(id),
                    updater_id TEXT REFERENCES profiles(id),
                    position INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS notifications (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES profiles(id),
                    message TEXT NOT NULL,
                    ticket_id TEXT REFERENCES tickets(id) ON DELETE SET NULL,
                    project_id TEXT REFERENCES projects(id) ON DELETE SET NULL,
                    read INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tickets_project ON tickets(project_id, position);
                CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Profiles ──────────────────────────────────────────────────────

    /// Insert a profile for `email`, or refresh the existing one. A `None`
    /// full name keeps whatever name is already stored.
    pub fn upsert_profile(&self, email: &str, full_name: Option<&str>) -> Result<Profile> {
        let now = now_timestamp();
        self.conn
            .execute(
                "INSERT INTO profiles (id, email, full_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(email) DO UPDATE SET
                    full_name = COALESCE(excluded.full_name, profiles.full_name),
                    updated_at = excluded.updated_at",
                params![Uuid::new_v4().to_string(), email, full_name, now],
            )
            .context("Failed to upsert profile")?;
        self.get_profile_by_email(email)?
            .context("Profile not found after upsert")
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], |row| ProfileRow::read(row, 0))
            .optional()
            .context("Failed to query profile")?;
        match row {
            Some(r) => r.into_profile(),
            None => Ok(None),
        }
    }

    pub fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let sql = format!("SELECT {} FROM profiles WHERE email = ?1", PROFILE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![email], |row| ProfileRow::read(row, 0))
            .optional()
            .context("Failed to query profile by email")?;
        match row {
            Some(r) => r.into_profile(),
            None => Ok(None),
        }
    }

    // ── Projects ──────────────────────────────────────────────────────

    pub fn create_project(&self, new: &NewProject) -> Result<Project> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        self.conn
            .execute(
                "INSERT INTO projects (id, name, description, creator_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    id.to_string(),
                    new.name,
                    new.description,
                    new.creator_id.to_string(),
                    now
                ],
            )
            .context("Failed to insert project")?;
        self.get_project(id)?
            .context("Project not found after insert")
    }

    /// All projects, newest first, with the creator profile embedded.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let sql = format!("{} ORDER BY p.created_at DESC, p.rowid DESC", PROJECT_SELECT);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], ProjectRow::read)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            let r = row.context("Failed to read project row")?;
            projects.push(r.into_project()?);
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let sql = format!("{} WHERE p.id = ?1", PROJECT_SELECT);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], ProjectRow::read)
            .optional()
            .context("Failed to query project")?;
        match row {
            Some(r) => Ok(Some(r.into_project()?)),
            None => Ok(None),
        }
    }

    // ── Tickets ───────────────────────────────────────────────────────

    pub fn create_ticket(&self, new: &NewTicket) -> Result<Ticket> {
        if self.get_project(new.project_id)?.is_none() {
            return Err(TaskflowError::ProjectNotFound { id: new.project_id }.into());
        }

        // Next position within the project; never reassigned afterwards.
        let max_pos: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(position), -1) FROM tickets WHERE project_id = ?1",
                params![new.project_id.to_string()],
                |row| row.get(0),
            )
            .context("Failed to get max position")?;

        let id = Uuid::new_v4();
        let now = now_timestamp();
        self.conn
            .execute(
                "INSERT INTO tickets (id, title, description, status, project_id, creator_id, position, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id.to_string(),
                    new.title,
                    new.description,
                    new.status.as_str(),
                    new.project_id.to_string(),
                    new.creator_id.to_string(),
                    max_pos + 1,
                    now
                ],
            )
            .context("Failed to insert ticket")?;
        self.get_ticket(id)?.context("Ticket not found after insert")
    }

    /// Tickets of one project ordered by ascending position, with creator and
    /// updater profiles embedded.
    pub fn list_tickets(&self, project_id: Uuid) -> Result<Vec<Ticket>> {
        let sql = format!(
            "{} WHERE t.project_id = ?1 ORDER BY t.position ASC, t.created_at ASC",
            TICKET_SELECT
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_tickets")?;
        let rows = stmt
            .query_map(params![project_id.to_string()], TicketRow::read)
            .context("Failed to query tickets")?;
        let mut tickets = Vec::new();
        for row in rows {
            let r = row.context("Failed to read ticket row")?;
            tickets.push(r.into_ticket()?);
        }
        Ok(tickets)
    }

    pub fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        let sql = format!("{} WHERE t.id = ?1", TICKET_SELECT);
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], TicketRow::read)
            .optional()
            .context("Failed to query ticket")?;
        match row {
            Some(r) => Ok(Some(r.into_ticket()?)),
            None => Ok(None),
        }
    }

    /// Apply a partial update and stamp `updater_id`. Last write wins.
    pub fn update_ticket(&self, id: Uuid, patch: &TicketPatch, updater_id: Uuid) -> Result<Ticket> {
        let changed = self
            .conn
            .execute(
                "UPDATE tickets SET
                    title = COALESCE(?1, title),
                    description = COALESCE(?2, description),
                    status = COALESCE(?3, status),
                    updater_id = ?4,
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    patch.title,
                    patch.description,
                    patch.status.map(|s| s.as_str()),
                    updater_id.to_string(),
                    now_timestamp(),
                    id.to_string()
                ],
            )
            .context("Failed to update ticket")?;
        if changed == 0 {
            return Err(TaskflowError::TicketNotFound { id }.into());
        }
        self.get_ticket(id)?.context("Ticket not found after update")
    }

    // ── Notifications ─────────────────────────────────────────────────

    pub fn create_notification(&self, new: &NewNotification) -> Result<Notification> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO notifications (id, user_id, message, ticket_id, project_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.to_string(),
                    new.user_id.to_string(),
                    new.message,
                    new.ticket_id.map(|t| t.to_string()),
                    new.project_id.map(|p| p.to_string()),
                    now_timestamp()
                ],
            )
            .context("Failed to insert notification")?;
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = ?1",
            NOTIFICATION_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![id.to_string()], NotificationRow::read)
            .context("Notification not found after insert")?;
        row.into_notification()
    }

    /// Notifications addressed to `user_id`, newest first.
    pub fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            NOTIFICATION_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_notifications")?;
        let rows = stmt
            .query_map(params![user_id.to_string()], NotificationRow::read)
            .context("Failed to query notifications")?;
        let mut notifications = Vec::new();
        for row in rows {
            let r = row.context("Failed to read notification row")?;
            notifications.push(r.into_notification()?);
        }
        Ok(notifications)
    }
}

// ── Row helpers ───────────────────────────────────────────────────────

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid id in database: {}", value))
}

fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}

/// Profile columns from a LEFT JOIN; every field is nullable.
struct ProfileRow {
    id: Option<String>,
    email: Option<String>,
    full_name: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl ProfileRow {
    fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            email: row.get(offset + 1)?,
            full_name: row.get(offset + 2)?,
            created_at: row.get(offset + 3)?,
            updated_at: row.get(offset + 4)?,
        })
    }

    fn into_profile(self) -> Result<Option<Profile>> {
        let (Some(id), Some(email)) = (self.id, self.email) else {
            return Ok(None);
        };
        Ok(Some(Profile {
            id: parse_uuid(&id)?,
            email,
            full_name: self.full_name,
            created_at: self.created_at.unwrap_or_default(),
            updated_at: self.updated_at.unwrap_or_default(),
        }))
    }
}

struct ProjectRow {
    id: String,
    name: String,
    description: Option<String>,
    creator_id: String,
    created_at: String,
    updated_at: String,
    creator: ProfileRow,
}

impl ProjectRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            creator_id: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            creator: ProfileRow::read(row, 6)?,
        })
    }

    fn into_project(self) -> Result<Project> {
        Ok(Project {
            id: parse_uuid(&self.id)?,
            name: self.name,
            description: self.description,
            creator_id: parse_uuid(&self.creator_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            creator: self.creator.into_profile()?,
        })
    }
}

struct TicketRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    project_id: String,
    creator_id: String,
    updater_id: Option<String>,
    position: i64,
    created_at: String,
    updated_at: String,
    creator: ProfileRow,
    updater: ProfileRow,
}

impl TicketRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            project_id: row.get(4)?,
            creator_id: row.get(5)?,
            updater_id: row.get(6)?,
            position: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            creator: ProfileRow::read(row, 10)?,
            updater: ProfileRow::read(row, 15)?,
        })
    }

    fn into_ticket(self) -> Result<Ticket> {
        let status = TicketStatus::from_str(&self.status).map_err(|e| anyhow::anyhow!(e))?;
        Ok(Ticket {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            status,
            project_id: parse_uuid(&self.project_id)?,
            creator_id: parse_uuid(&self.creator_id)?,
            updater_id: parse_optional_uuid(self.updater_id)?,
            position: self.position,
            created_at: self.created_at,
            updated_at: self.updated_at,
            creator: self.creator.into_profile()?,
            updater: self.updater.into_profile()?,
        })
    }
}

struct NotificationRow {
    id: String,
    user_id: String,
    message: String,
    ticket_id: Option<String>,
    project_id: Option<String>,
    read: bool,
    created_at: String,
}

impl NotificationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            message: row.get(2)?,
            ticket_id: row.get(3)?,
            project_id: row.get(4)?,
            read: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_notification(self) -> Result<Notification> {
        Ok(Notification {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            message: self.message,
            ticket_id: parse_optional_uuid(self.ticket_id)?,
            project_id: parse_optional_uuid(self.project_id)?,
            read: self.read,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_user(db: &TaskflowDb, email: &str) -> Result<Profile> {
        db.upsert_profile(email, None)
    }

    fn seed_project(db: &TaskflowDb, creator: &Profile, name: &str) -> Result<Project> {
        db.create_project(&NewProject {
            name: name.to_string(),
            description: Some(format!("{} description", name)),
            creator_id: creator.id,
        })
    }

    fn seed_ticket(db: &TaskflowDb, project: &Project, creator: &Profile, title: &str) -> Result<Ticket> {
        db.create_ticket(&NewTicket {
            title: title.to_string(),
            description: None,
            project_id: project.id,
            creator_id: creator.id,
            status: TicketStatus::Todo,
        })
    }

    #[test]
    fn test_create_database_and_run_migrations() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let tables: Vec<String> = {
            let mut stmt = db
                .conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            names
        };
        for expected in ["notifications", "profiles", "projects", "tickets"] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
        // Running migrations twice is harmless.
        db.run_migrations()?;
        Ok(())
    }

    #[test]
    fn test_upsert_profile_is_idempotent_by_email() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let first = db.upsert_profile("ada@example.com", Some("Ada"))?;
        let second = db.upsert_profile("ada@example.com", None)?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.full_name.as_deref(), Some("Ada"));

        let renamed = db.upsert_profile("ada@example.com", Some("Ada Lovelace"))?;
        assert_eq!(renamed.id, first.id);
        assert_eq!(renamed.full_name.as_deref(), Some("Ada Lovelace"));

        assert_eq!(db.get_profile(first.id)?.unwrap().email, "ada@example.com");
        assert!(db.get_profile(Uuid::new_v4())?.is_none());
        Ok(())
    }

    #[test]
    fn test_create_project_embeds_creator() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "owner@example.com")?;
        let project = seed_project(&db, &user, "Apollo")?;

        assert_eq!(project.name, "Apollo");
        assert_eq!(project.creator_id, user.id);
        assert_eq!(project.creator.as_ref().unwrap().email, "owner@example.com");
        assert!(!project.created_at.is_empty());

        let fetched = db.get_project(project.id)?.expect("project should exist");
        assert_eq!(fetched, project);
        Ok(())
    }

    #[test]
    fn test_list_projects_newest_first() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "owner@example.com")?;
        seed_project(&db, &user, "alpha")?;
        seed_project(&db, &user, "beta")?;
        seed_project(&db, &user, "gamma")?;

        let names: Vec<String> = db.list_projects()?.into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["gamma", "beta", "alpha"]);
        Ok(())
    }

    #[test]
    fn test_create_ticket_defaults() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let project = seed_project(&db, &user, "proj")?;

        let ticket = seed_ticket(&db, &project, &user, "Fix login bug")?;
        assert_eq!(ticket.title, "Fix login bug");
        assert_eq!(ticket.status, TicketStatus::Todo);
        assert_eq!(ticket.project_id, project.id);
        assert_eq!(ticket.creator_id, user.id);
        assert!(ticket.updater_id.is_none());
        assert!(ticket.updater.is_none());
        assert_eq!(ticket.position, 0);
        assert_eq!(ticket.creator.as_ref().unwrap().id, user.id);
        Ok(())
    }

    #[test]
    fn test_create_ticket_for_missing_project_fails() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let missing = Uuid::new_v4();
        let err = db
            .create_ticket(&NewTicket {
                title: "orphan".into(),
                description: None,
                project_id: missing,
                creator_id: user.id,
                status: TicketStatus::Todo,
            })
            .unwrap_err();
        let typed = TaskflowError::from_store(err);
        assert!(matches!(typed, TaskflowError::ProjectNotFound { id } if id == missing));
        Ok(())
    }

    #[test]
    fn test_list_tickets_ordered_by_position_and_scoped() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let a = seed_project(&db, &user, "a")?;
        let b = seed_project(&db, &user, "b")?;

        seed_ticket(&db, &a, &user, "A1")?;
        seed_ticket(&db, &b, &user, "B1")?;
        seed_ticket(&db, &a, &user, "A2")?;
        seed_ticket(&db, &a, &user, "A3")?;

        let tickets = db.list_tickets(a.id)?;
        let titles: Vec<&str> = tickets.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A1", "A2", "A3"]);
        let positions: Vec<i64> = tickets.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        assert_eq!(db.list_tickets(b.id)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_update_ticket_stamps_updater_and_keeps_position() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let creator = seed_user(&db, "creator@example.com")?;
        let mover = seed_user(&db, "mover@example.com")?;
        let project = seed_project(&db, &creator, "proj")?;
        seed_ticket(&db, &project, &creator, "first")?;
        let ticket = seed_ticket(&db, &project, &creator, "second")?;

        let updated = db.update_ticket(ticket.id, &TicketPatch::status(TicketStatus::Done), mover.id)?;
        assert_eq!(updated.status, TicketStatus::Done);
        assert_eq!(updated.updater_id, Some(mover.id));
        assert_eq!(updated.updater.as_ref().unwrap().email, "mover@example.com");
        assert_eq!(updated.title, "second");
        assert_eq!(updated.position, ticket.position);
        Ok(())
    }

    #[test]
    fn test_update_ticket_partial_fields() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let project = seed_project(&db, &user, "proj")?;
        let ticket = seed_ticket(&db, &project, &user, "Old title")?;

        let patch = TicketPatch {
            title: Some("New title".into()),
            ..TicketPatch::default()
        };
        let updated = db.update_ticket(ticket.id, &patch, user.id)?;
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.status, TicketStatus::Todo);
        Ok(())
    }

    #[test]
    fn test_update_missing_ticket_is_not_found() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let err = db
            .update_ticket(Uuid::new_v4(), &TicketPatch::status(TicketStatus::Done), user.id)
            .unwrap_err();
        assert!(TaskflowError::from_store(err).is_not_found());
        Ok(())
    }

    #[test]
    fn test_status_check_constraint_rejects_unknown_values() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let user = seed_user(&db, "dev@example.com")?;
        let project = seed_project(&db, &user, "proj")?;
        let ticket = seed_ticket(&db, &project, &user, "t")?;
        let result = db.conn.execute(
            "UPDATE tickets SET status = 'blocked' WHERE id = ?1",
            params![ticket.id.to_string()],
        );
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_notifications_for_user_newest_first() -> Result<()> {
        let db = TaskflowDb::new_in_memory()?;
        let creator = seed_user(&db, "creator@example.com")?;
        let other = seed_user(&db, "other@example.com")?;
        let project = seed_project(&db, &creator, "proj")?;
        let ticket = seed_ticket(&db, &project, &creator, "t")?;

        for message in ["first", "second"] {
            db.create_notification(&NewNotification {
                user_id: creator.id,
                message: message.to_string(),
                ticket_id: Some(ticket.id),
                project_id: Some(project.id),
            })?;
        }

        let notes = db.list_notifications(creator.id)?;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].message, "second");
        assert!(!notes[0].read);
        assert_eq!(notes[0].ticket_id, Some(ticket.id));
        assert!(db.list_notifications(other.id)?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_db_handle_runs_on_blocking_pool() -> Result<()> {
        let handle = DbHandle::new(TaskflowDb::new_in_memory()?);
        let profile = handle
            .call(|db| db.upsert_profile("async@example.com", None))
            .await?;
        let fetched = handle.call(move |db| db.get_profile(profile.id)).await?;
        assert_eq!(fetched.unwrap().email, "async@example.com");
        Ok(())
    }
}
