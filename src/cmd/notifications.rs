//! Notification inbox — `taskflow notifications`.

use anyhow::Result;
use console::style;

use taskflow::board::views::DashboardView;
use taskflow::board::visibility::SuperUserMode;
use taskflow::config::Settings;

pub async fn cmd_notifications(settings: &Settings, user: Option<&str>) -> Result<()> {
    let store = super::open_store(settings.db_path())?;
    let auth = super::resolve_user(&store, user).await?;
    let mut view = DashboardView::new(
        store.into_shared(),
        auth,
        SuperUserMode::new(settings.super_user_secret()),
    );
    super::require_render(view.mount().await)?;

    let notifications = view.notifications().await;
    super::flush_notices(view.take_notices())?;

    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }
    for n in notifications {
        let marker = if n.read { " " } else { "*" };
        println!(
            "{} {}  {}",
            style(marker).yellow(),
            style(&n.created_at).dim(),
            n.message
        );
    }
    Ok(())
}
