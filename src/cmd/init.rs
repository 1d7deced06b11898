//! Workspace initialization — `taskflow init`.

use anyhow::Result;
use console::style;

use taskflow::config::Settings;

/// Write the config file (unless one exists) and create the database.
pub fn cmd_init(settings: &Settings, force: bool) -> Result<()> {
    if settings.config_path.exists() && !force {
        println!(
            "{} already exists, leaving it untouched",
            settings.config_path.display()
        );
    } else {
        settings.toml.save(&settings.config_path)?;
        println!(
            "{} {}",
            style("Wrote").green(),
            settings.config_path.display()
        );
    }

    super::open_store(settings.db_path())?;
    println!(
        "{} {}",
        style("Board database ready at").green(),
        settings.db_path().display()
    );
    Ok(())
}
