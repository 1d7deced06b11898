//! Profile provisioning — `taskflow profile add`.

use anyhow::{Context, Result};

use taskflow::board::store::RemoteStore;
use taskflow::config::Settings;

/// Upsert a profile by email and print its id.
pub async fn cmd_profile_add(settings: &Settings, email: &str, name: Option<&str>) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        anyhow::bail!("email is required");
    }
    let store = super::open_store(settings.db_path())?;
    let profile = store
        .upsert_profile(email, name)
        .await
        .with_context(|| format!("Failed to provision profile {}", email))?;
    println!("{} {}", profile.id, profile.display_name());
    Ok(())
}
