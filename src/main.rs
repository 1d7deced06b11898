use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use taskflow::config::{CliOverrides, Settings};

mod cmd;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(version, about = "Project and ticket tracking board")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to taskflow.toml (defaults to .taskflow/taskflow.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Board database path. Overrides taskflow.toml and TASKFLOW_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Acting user: a profile id or email
    #[arg(long, global = true, env = "TASKFLOW_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the board server (JSON API, realtime channel and pages)
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Open the dashboard in a browser once the server is up
        #[arg(long)]
        open: bool,

        /// Enable dev mode (CORS permissive for a local front-end dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Write a default taskflow.toml and create the board database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// List or create projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },
    /// List, create or move tickets
    Tickets {
        #[command(subcommand)]
        command: TicketsCommands,
    },
    /// Show a project's three-column board
    Board {
        project: Uuid,

        /// Reveal who created and updated each ticket (super user mode)
        #[arg(long)]
        reveal: bool,

        /// Super user secret; prompted for when omitted
        #[arg(long, requires = "reveal")]
        secret: Option<String>,
    },
    /// Show notifications for the acting user
    Notifications,
}

#[derive(Subcommand, Clone)]
pub enum ProfileCommands {
    /// Create a profile, or update the name of an existing one
    Add {
        email: String,
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectsCommands {
    /// List all projects, newest first
    List {
        #[arg(long)]
        reveal: bool,
        #[arg(long, requires = "reveal")]
        secret: Option<String>,
    },
    /// Create a project
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum TicketsCommands {
    /// List a project's tickets in board order
    List { project: Uuid },
    /// Create a ticket in the To Do column
    Create {
        project: Uuid,
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Move a ticket to another column (todo, in_progress, done)
    Move { ticket: Uuid, status: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(CliOverrides {
        config_path: cli.config.clone(),
        db_path: cli.db_path.clone(),
        verbose: cli.verbose,
    })?;

    let _log_guard = taskflow::logging::init_logging(&settings.toml.logging, settings.verbose)?;
    for warning in &settings.warnings {
        tracing::warn!("{}", warning);
    }

    let user = cli.user.as_deref();
    match &cli.command {
        Commands::Serve {
            port,
            host,
            open,
            dev,
        } => {
            cmd::cmd_serve(&settings, *port, host.clone(), *open, *dev).await?;
        }
        Commands::Init { force } => cmd::cmd_init(&settings, *force)?,
        Commands::Profile { command } => match command {
            ProfileCommands::Add { email, name } => {
                cmd::cmd_profile_add(&settings, email, name.as_deref()).await?
            }
        },
        Commands::Projects { command } => match command {
            ProjectsCommands::List { reveal, secret } => {
                cmd::cmd_projects_list(&settings, user, *reveal, secret.as_deref()).await?
            }
            ProjectsCommands::Create { name, description } => {
                cmd::cmd_projects_create(&settings, user, name, description.as_deref()).await?
            }
        },
        Commands::Tickets { command } => match command {
            TicketsCommands::List { project } => {
                cmd::cmd_tickets_list(&settings, user, *project).await?
            }
            TicketsCommands::Create {
                project,
                title,
                description,
            } => {
                cmd::cmd_tickets_create(&settings, user, *project, title, description.as_deref())
                    .await?
            }
            TicketsCommands::Move { ticket, status } => {
                cmd::cmd_tickets_move(&settings, user, *ticket, status).await?
            }
        },
        Commands::Board {
            project,
            reveal,
            secret,
        } => cmd::cmd_board(&settings, user, *project, *reveal, secret.as_deref()).await?,
        Commands::Notifications => cmd::cmd_notifications(&settings, user).await?,
    }

    Ok(())
}
