//! Board HTTP server command — `taskflow serve`.

use anyhow::Result;

use taskflow::board::server::{ServerConfig, start_server};
use taskflow::config::Settings;

pub async fn cmd_serve(
    settings: &Settings,
    port: Option<u16>,
    host: Option<String>,
    open: bool,
    dev: bool,
) -> Result<()> {
    let server = &settings.toml.server;
    let config = ServerConfig {
        host: host.unwrap_or_else(|| server.host.clone()),
        port: port.unwrap_or(server.port),
        db_path: settings.db_path().to_path_buf(),
        dev_mode: dev || server.dev_mode,
    };

    // Skip in dev mode (no browser inside containers)
    if open && !config.dev_mode {
        let url = format!("http://localhost:{}", config.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, url = %url, "failed to open browser");
            }
        });
    }

    start_server(config).await
}
