//! Three-column board rendering — `taskflow board`.

use anyhow::Result;
use console::style;
use uuid::Uuid;

use taskflow::config::Settings;

use super::ticket::{mount_board, status_style};

pub async fn cmd_board(
    settings: &Settings,
    user: Option<&str>,
    project: Uuid,
    reveal: bool,
    secret: Option<&str>,
) -> Result<()> {
    let store = super::open_store(settings.db_path())?;
    let mut view = mount_board(settings, store, user, project).await?;
    if reveal {
        let notices = super::unlock_super_user(&mut view.super_user, secret)?;
        super::flush_notices(notices)?;
    }
    super::flush_notices(view.take_notices())?;

    if let Some(project) = view.project() {
        println!("{}", style(&project.name).bold().underlined());
        if let Some(description) = &project.description {
            println!("{}", style(description).dim());
        }
    }

    for (status, cards) in view.card_columns() {
        println!();
        let heading = format!("{} ({})", status.title(), cards.len());
        println!("{}", status_style(status, &heading).bold());
        if cards.is_empty() {
            println!("  {}", style("No tickets").dim());
        }
        for card in cards {
            println!("  {} {}", style("•").dim(), card.title);
            if let Some(description) = &card.description {
                println!("      {}", style(description).dim());
            }
            if let Some(creator) = &card.created_by {
                println!("      {}", style(format!("created by {}", creator)).cyan());
            }
            if let Some(updater) = &card.updated_by {
                println!("      {}", style(format!("updated by {}", updater)).cyan());
            }
            println!("      {}", style(card.id).dim());
        }
    }
    Ok(())
}
