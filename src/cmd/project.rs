//! Project commands — `taskflow projects list|create`.

use anyhow::{Result, bail};
use console::style;

use taskflow::board::views::DashboardView;
use taskflow::board::visibility::SuperUserMode;
use taskflow::config::Settings;

async fn mount_dashboard(settings: &Settings, user: Option<&str>) -> Result<DashboardView> {
    let store = super::open_store(settings.db_path())?;
    let auth = super::resolve_user(&store, user).await?;
    let mut view = DashboardView::new(
        store.into_shared(),
        auth,
        SuperUserMode::new(settings.super_user_secret()),
    );
    super::require_render(view.mount().await)?;
    Ok(view)
}

pub async fn cmd_projects_list(
    settings: &Settings,
    user: Option<&str>,
    reveal: bool,
    secret: Option<&str>,
) -> Result<()> {
    let mut view = mount_dashboard(settings, user).await?;
    if reveal {
        let notices = super::unlock_super_user(&mut view.super_user, secret)?;
        super::flush_notices(notices)?;
    }
    super::flush_notices(view.take_notices())?;

    let cards = view.cards();
    if cards.is_empty() {
        println!("No projects yet");
        return Ok(());
    }
    for card in cards {
        match &card.created_by {
            Some(creator) => println!(
                "{}  {}  {}",
                style(card.id).dim(),
                style(&card.name).bold(),
                style(format!("created by {}", creator)).cyan()
            ),
            None => println!("{}  {}", style(card.id).dim(), style(&card.name).bold()),
        }
        if let Some(description) = &card.description {
            println!("    {}", style(description).dim());
        }
    }
    Ok(())
}

pub async fn cmd_projects_create(
    settings: &Settings,
    user: Option<&str>,
    name: &str,
    description: Option<&str>,
) -> Result<()> {
    let mut view = mount_dashboard(settings, user).await?;
    view.form.open();
    view.form.name = name.to_string();
    view.form.description = description.unwrap_or_default().to_string();

    let created = view.create_project().await;
    super::flush_notices(view.take_notices())?;
    let Some(project) = created else {
        bail!("Project was not created");
    };
    println!("Created project {}", project.id);
    Ok(())
}
