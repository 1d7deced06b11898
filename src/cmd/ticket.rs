//! Ticket commands — `taskflow tickets list|create|move`.
//!
//! `move` goes through the same drag controller and update propagator as a
//! drop on the board, so the creator is notified exactly as in the UI.

use std::str::FromStr;

use anyhow::{Context, Result, bail};
use console::style;
use uuid::Uuid;

use taskflow::board::models::TicketStatus;
use taskflow::board::store::{LocalStore, RemoteStore};
use taskflow::board::views::ProjectBoardView;
use taskflow::board::visibility::SuperUserMode;
use taskflow::config::Settings;
use taskflow::errors::TaskflowError;

/// Terminal colour per column.
pub fn status_style(status: TicketStatus, text: &str) -> console::StyledObject<&str> {
    match status {
        TicketStatus::Todo => style(text).yellow(),
        TicketStatus::InProgress => style(text).blue(),
        TicketStatus::Done => style(text).green(),
    }
}

pub(crate) async fn mount_board(
    settings: &Settings,
    store: LocalStore,
    user: Option<&str>,
    project_id: Uuid,
) -> Result<ProjectBoardView> {
    let auth = super::resolve_user(&store, user).await?;
    let mut view = ProjectBoardView::new(
        store.into_shared(),
        auth,
        project_id,
        SuperUserMode::new(settings.super_user_secret()),
    );
    super::require_render(view.mount().await)?;
    if view.project().is_none() {
        super::flush_notices(view.take_notices())?;
        bail!(TaskflowError::ProjectNotFound { id: project_id });
    }
    Ok(view)
}

pub async fn cmd_tickets_list(settings: &Settings, user: Option<&str>, project: Uuid) -> Result<()> {
    let store = super::open_store(settings.db_path())?;
    let mut view = mount_board(settings, store, user, project).await?;
    super::flush_notices(view.take_notices())?;

    if view.tickets().is_empty() {
        println!("No tickets yet");
        return Ok(());
    }
    for ticket in view.tickets() {
        println!(
            "{}  {:<12}  {}",
            style(ticket.id).dim(),
            status_style(ticket.status, ticket.status.as_str()),
            ticket.title
        );
    }
    Ok(())
}

pub async fn cmd_tickets_create(
    settings: &Settings,
    user: Option<&str>,
    project: Uuid,
    title: &str,
    description: Option<&str>,
) -> Result<()> {
    let store = super::open_store(settings.db_path())?;
    let mut view = mount_board(settings, store, user, project).await?;
    view.form.open();
    view.form.title = title.to_string();
    view.form.description = description.unwrap_or_default().to_string();

    let created = view.create_ticket().await;
    super::flush_notices(view.take_notices())?;
    let Some(ticket) = created else {
        bail!("Ticket was not created");
    };
    println!("Created ticket {}", ticket.id);
    Ok(())
}

pub async fn cmd_tickets_move(
    settings: &Settings,
    user: Option<&str>,
    ticket_id: Uuid,
    status: &str,
) -> Result<()> {
    let target = TicketStatus::from_str(status).map_err(|_| TaskflowError::InvalidStatus {
        value: status.to_string(),
    })?;

    let store = super::open_store(settings.db_path())?;
    let ticket = store
        .get_ticket(ticket_id)
        .await
        .context("Failed to load ticket")?
        .ok_or(TaskflowError::TicketNotFound { id: ticket_id })?;

    let mut view = mount_board(settings, store, user, ticket.project_id).await?;
    if !view.drag_start(ticket_id) {
        bail!(TaskflowError::TicketNotFound { id: ticket_id });
    }
    let outcome = view.drag_end(Some(target.as_str())).await;
    super::flush_notices(view.take_notices())?;

    match outcome {
        Some(propagation) => {
            println!(
                "Moved \"{}\" to {}",
                propagation.ticket.title,
                status_style(target, target.title())
            );
            if propagation.notification.is_some() {
                println!("{}", style("Creator notified").dim());
            }
        }
        None => println!("\"{}\" is already in {}", ticket.title, target.title()),
    }
    Ok(())
}
