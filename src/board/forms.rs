//! Project and ticket creation forms.
//!
//! A form validates its required field before touching the store, issues a
//! single insert tagged with the acting user, and on success resets and
//! closes. A failed insert leaves the form open with its values intact.

use uuid::Uuid;

use super::models::*;
use super::notice::Notice;
use super::store::RemoteStore;
use crate::errors::TaskflowError;

/// Blank input is absent; anything else is kept exactly as typed.
fn optional(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn required(text: &str, field: &'static str) -> Result<String, TaskflowError> {
    optional(text).ok_or(TaskflowError::MissingField { field })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectForm {
    pub open: bool,
    pub name: String,
    pub description: String,
}

impl ProjectForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Validate and insert. Returns the created project.
    pub async fn submit(
        &mut self,
        store: &dyn RemoteStore,
        actor: &Profile,
    ) -> Result<Project, TaskflowError> {
        let name = required(&self.name, "name")?;
        let project = store
            .insert_project(NewProject {
                name,
                description: optional(&self.description),
                creator_id: actor.id,
            })
            .await
            .map_err(TaskflowError::from_store)?;
        tracing::info!(project_id = %project.id, name = %project.name, "project created");
        *self = Self::default();
        Ok(project)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketForm {
    pub project_id: Uuid,
    pub open: bool,
    pub title: String,
    pub description: String,
}

impl TicketForm {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            open: false,
            title: String::new(),
            description: String::new(),
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Validate and insert a `todo` ticket into the form's project.
    pub async fn submit(
        &mut self,
        store: &dyn RemoteStore,
        actor: &Profile,
    ) -> Result<Ticket, TaskflowError> {
        let title = required(&self.title, "title")?;
        let ticket = store
            .insert_ticket(NewTicket {
                title,
                description: optional(&self.description),
                project_id: self.project_id,
                creator_id: actor.id,
                status: TicketStatus::Todo,
            })
            .await
            .map_err(TaskflowError::from_store)?;
        tracing::info!(ticket_id = %ticket.id, project_id = %self.project_id, "ticket created");
        *self = Self::new(self.project_id);
        Ok(ticket)
    }
}

pub fn ticket_created_notice() -> Notice {
    Notice::info("Success", "Ticket created successfully")
}

pub fn project_created_notice() -> Notice {
    Notice::info("Success", "Project created successfully")
}
