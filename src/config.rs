//! Configuration for TaskFlow, read from `.taskflow/taskflow.toml`.
//!
//! Layering is file → environment → CLI. Every section has defaults, so an
//! empty or missing file is valid.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! dev_mode = false
//!
//! [store]
//! db_path = ".taskflow/taskflow.db"
//!
//! [board]
//! super_user_secret = "admin123"
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! directory = ".taskflow/logs"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::board::visibility::DEFAULT_SUPER_USER_SECRET;

/// Directory holding config, database and logs.
pub const TASKFLOW_DIR: &str = ".taskflow";
pub const CONFIG_FILE: &str = "taskflow.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a local front-end dev server
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    Path::new(TASKFLOW_DIR).join("taskflow.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    /// Shared secret for super user mode. Cosmetic, not access control.
    #[serde(default = "default_super_user_secret")]
    pub super_user_secret: String,
}

fn default_super_user_secret() -> String {
    DEFAULT_SUPER_USER_SECRET.to_string()
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            super_user_secret: default_super_user_secret(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Write daily-rotated log files here in addition to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            directory: None,
        }
    }
}

/// The complete taskflow.toml structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskflowToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TaskflowToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskflow.toml")
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize taskflow.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `TASKFLOW_*` overrides read through `lookup`. Unparseable
    /// values are skipped and reported.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        if let Some(port) = lookup("TASKFLOW_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warnings.push(format!("Ignoring TASKFLOW_PORT '{}': not a port", port)),
            }
        }
        if let Some(path) = lookup("TASKFLOW_DB_PATH") {
            self.store.db_path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("TASKFLOW_SUPER_USER_SECRET") {
            self.board.super_user_secret = secret;
        }
        if let Some(format) = lookup("TASKFLOW_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.logging.format = f,
                Err(e) => warnings.push(format!("Ignoring TASKFLOW_LOG_FORMAT: {}", e)),
            }
        }
        warnings
    }

    pub fn apply_env(&mut self) -> Vec<String> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if self.board.super_user_secret.is_empty() {
            warnings.push("board.super_user_secret is empty; a blank entry enables super user mode".to_string());
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "Invalid logging.level '{}': expected a tracing filter such as 'info' or 'taskflow=debug'",
                self.logging.level
            ));
        }
        if self.store.db_path.as_os_str().is_empty() {
            warnings.push("store.db_path is empty".to_string());
        }

        warnings
    }
}

/// CLI-level overrides, the last layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub verbose: bool,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub toml: TaskflowToml,
    pub verbose: bool,
    /// Problems found while layering; shown once logging is up.
    pub warnings: Vec<String>,
}

impl Settings {
    /// Resolve file → environment → CLI, loading `.env` first.
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let config_path = cli
            .config_path
            .unwrap_or_else(|| Path::new(TASKFLOW_DIR).join(CONFIG_FILE));
        let mut toml = TaskflowToml::load_or_default(&config_path)?;
        let mut warnings = toml.apply_env();
        if let Some(db_path) = cli.db_path {
            toml.store.db_path = db_path;
        }
        warnings.extend(toml.validate());

        Ok(Self {
            config_path,
            toml,
            verbose: cli.verbose,
            warnings,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.toml.store.db_path
    }

    pub fn super_user_secret(&self) -> &str {
        &self.toml.board.super_user_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = TaskflowToml::parse("").unwrap();
        assert_eq!(toml.server.host, "127.0.0.1");
        assert_eq!(toml.server.port, 3141);
        assert!(!toml.server.dev_mode);
        assert_eq!(toml.store.db_path, PathBuf::from(".taskflow/taskflow.db"));
        assert_eq!(toml.board.super_user_secret, "admin123");
        assert_eq!(toml.logging.level, "info");
        assert_eq!(toml.logging.format, LogFormat::Pretty);
        assert!(toml.logging.directory.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[server]
port = 8080
dev_mode = true

[board]
super_user_secret = "hunter2"

[logging]
format = "json"
directory = "/var/log/taskflow"
"#;
        let toml = TaskflowToml::parse(content).unwrap();
        assert_eq!(toml.server.port, 8080);
        assert!(toml.server.dev_mode);
        assert_eq!(toml.server.host, "127.0.0.1");
        assert_eq!(toml.board.super_user_secret, "hunter2");
        assert_eq!(toml.logging.format, LogFormat::Json);
        assert_eq!(
            toml.logging.directory,
            Some(PathBuf::from("/var/log/taskflow"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        let content = r#"
[logging]
format = "xml"
"#;
        assert!(TaskflowToml::parse(content).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut toml = TaskflowToml::parse("[server]\nport = 8080\n").unwrap();
        let warnings = toml.apply_env_with(env(&[
            ("TASKFLOW_PORT", "9090"),
            ("TASKFLOW_DB_PATH", "/tmp/tf.db"),
            ("TASKFLOW_SUPER_USER_SECRET", "open-sesame"),
            ("TASKFLOW_LOG_FORMAT", "JSON"),
        ]));
        assert!(warnings.is_empty());
        assert_eq!(toml.server.port, 9090);
        assert_eq!(toml.store.db_path, PathBuf::from("/tmp/tf.db"));
        assert_eq!(toml.board.super_user_secret, "open-sesame");
        assert_eq!(toml.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_env_values_are_reported_and_ignored() {
        let mut toml = TaskflowToml::default();
        let warnings = toml.apply_env_with(env(&[
            ("TASKFLOW_PORT", "eighty"),
            ("TASKFLOW_LOG_FORMAT", "xml"),
        ]));
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("TASKFLOW_PORT"));
        assert_eq!(toml.server.port, 3141);
        assert_eq!(toml.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validate() {
        assert!(TaskflowToml::default().validate().is_empty());

        let mut toml = TaskflowToml::default();
        toml.board.super_user_secret.clear();
        toml.logging.level = "taskflow=loud".to_string();
        let warnings = toml.validate();
        assert!(warnings.iter().any(|w| w.contains("super_user_secret")));
        assert!(warnings.iter().any(|w| w.contains("Invalid logging.level")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".taskflow").join("taskflow.toml");

        let mut toml = TaskflowToml::default();
        toml.server.port = 4000;
        toml.logging.directory = Some(PathBuf::from("logs"));
        toml.save(&path).unwrap();

        let loaded = TaskflowToml::load(&path).unwrap();
        assert_eq!(loaded.server.port, 4000);
        assert_eq!(loaded.logging.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = TaskflowToml::load_or_default(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(toml.server.port, 3141);
    }

    #[test]
    fn test_cli_db_path_wins() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("taskflow.toml");
        std::fs::write(&config_path, "[store]\ndb_path = \"from-file.db\"\n").unwrap();

        let settings = Settings::resolve(CliOverrides {
            config_path: Some(config_path),
            db_path: Some(PathBuf::from("from-cli.db")),
            verbose: true,
        })
        .unwrap();
        assert_eq!(settings.db_path(), Path::new("from-cli.db"));
        assert!(settings.verbose);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("Invalid log format"));
    }
}
