//! Super user mode: a view-local switch revealing who created and last
//! updated each card. Cosmetic only; the data is already on every row.

use serde::Serialize;
use uuid::Uuid;

use super::models::{Project, Ticket, TicketStatus};
use super::notice::Notice;

pub const DEFAULT_SUPER_USER_SECRET: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Disabled,
    /// Enabling needs the secret; the caller should prompt for it.
    SecretRequired,
}

#[derive(Debug, Clone)]
pub struct SuperUserMode {
    secret: String,
    enabled: bool,
}

impl SuperUserMode {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn off when on. When off, nothing changes until a secret is
    /// submitted.
    pub fn toggle(&mut self) -> (ToggleOutcome, Option<Notice>) {
        if self.enabled {
            self.enabled = false;
            (
                ToggleOutcome::Disabled,
                Some(Notice::info(
                    "Super User Mode Disabled",
                    "User information is now hidden",
                )),
            )
        } else {
            (ToggleOutcome::SecretRequired, None)
        }
    }

    pub fn submit_secret(&mut self, candidate: &str) -> Notice {
        if candidate == self.secret {
            self.enabled = true;
            Notice::info(
                "Super User Mode Enabled",
                "You can now see who created and updated tickets",
            )
        } else {
            tracing::debug!("super user secret rejected");
            Notice::destructive("Incorrect Password", "Please try again")
        }
    }
}

/// What a ticket card shows.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TicketCardView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl TicketCardView {
    pub fn render(ticket: &Ticket, reveal: bool) -> Self {
        let (created_by, updated_by) = if reveal {
            (
                ticket.creator.as_ref().map(|p| p.email.clone()),
                ticket.updater.as_ref().map(|p| p.email.clone()),
            )
        } else {
            (None, None)
        };
        Self {
            id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: ticket.status,
            created_by,
            updated_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectCardView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl ProjectCardView {
    pub fn render(project: &Project, reveal: bool) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            description: project.description.clone(),
            created_by: if reveal {
                project.creator.as_ref().map(|p| p.email.clone())
            } else {
                None
            },
        }
    }
}
