//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `serve`         | `Serve`                                            |
//! | `init`          | `Init`                                             |
//! | `profile`       | `Profile add`                                      |
//! | `project`       | `Projects list`, `Projects create`                 |
//! | `ticket`        | `Tickets list`, `Tickets create`, `Tickets move`   |
//! | `board`         | `Board`                                            |
//! | `notifications` | `Notifications`                                    |

pub mod board;
pub mod init;
pub mod notifications;
pub mod profile;
pub mod project;
pub mod serve;
pub mod ticket;

pub use board::cmd_board;
pub use init::cmd_init;
pub use notifications::cmd_notifications;
pub use profile::cmd_profile_add;
pub use project::{cmd_projects_create, cmd_projects_list};
pub use serve::cmd_serve;
pub use ticket::{cmd_tickets_create, cmd_tickets_list, cmd_tickets_move};

use std::path::Path;

use anyhow::{Context, Result, bail};
use console::style;
use uuid::Uuid;

use taskflow::board::db::{DbHandle, TaskflowDb};
use taskflow::board::notice::Notice;
use taskflow::board::session::{AuthState, Navigation};
use taskflow::board::store::LocalStore;
use taskflow::board::visibility::{SuperUserMode, ToggleOutcome};

/// Open (creating if needed) the board database at `db_path`.
pub fn open_store(db_path: &Path) -> Result<LocalStore> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = TaskflowDb::new(db_path)
        .with_context(|| format!("Failed to open board database {}", db_path.display()))?;
    Ok(LocalStore::new(DbHandle::new(db)))
}

/// Resolve `--user` (a profile id or an email) to an auth state.
pub async fn resolve_user(store: &LocalStore, user: Option<&str>) -> Result<AuthState> {
    use taskflow::board::store::RemoteStore;

    let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(AuthState::SignedOut);
    };
    let profile = match Uuid::parse_str(user) {
        Ok(id) => store.get_profile(id).await?,
        Err(_) => {
            let email = user.to_string();
            store
                .db()
                .call(move |db| db.get_profile_by_email(&email))
                .await?
        }
    };
    match profile {
        Some(profile) => {
            tracing::debug!(user_id = %profile.id, "acting user resolved");
            Ok(AuthState::SignedIn(profile))
        }
        None => bail!(
            "Unknown user '{}'. Create one with `taskflow profile add <email>`",
            user
        ),
    }
}

/// Turn a guard decision into a CLI error when the page would not render.
pub fn require_render(nav: Navigation) -> Result<()> {
    match nav {
        Navigation::Render => Ok(()),
        Navigation::Redirect(_) | Navigation::Wait => {
            bail!("Not signed in. Pass --user or set TASKFLOW_USER")
        }
    }
}

/// Print informational notices and fail on the first error notice.
pub fn flush_notices(notices: Vec<Notice>) -> Result<()> {
    let mut error = None;
    for notice in notices {
        if notice.is_error() {
            eprintln!(
                "{} {}",
                style(format!("{}:", notice.title)).red().bold(),
                notice.description
            );
            error.get_or_insert(notice);
        } else {
            eprintln!(
                "{} {}",
                style(format!("{}:", notice.title)).green(),
                notice.description
            );
        }
    }
    match error {
        Some(notice) if notice.title == "Error" => bail!("{}", notice.description),
        Some(notice) => bail!("{}", notice),
        None => Ok(()),
    }
}

/// Unlock super user mode, prompting for the secret when none was given.
/// Returns the notices the attempt produced.
pub fn unlock_super_user(mode: &mut SuperUserMode, secret: Option<&str>) -> Result<Vec<Notice>> {
    let (outcome, notice) = mode.toggle();
    if outcome != ToggleOutcome::SecretRequired {
        return Ok(notice.into_iter().collect());
    }
    let secret = match secret {
        Some(secret) => secret.to_string(),
        None => dialoguer::Password::new()
            .with_prompt("Super user password")
            .interact()
            .context("Failed to read password")?,
    };
    Ok(vec![mode.submit_secret(&secret)])
}
