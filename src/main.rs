use anyhow::{Context, Result};
use boardsync::common::{IssueStatus, IssueType, Priority};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "boardsync")]
#[command(version, about = "Optimistic kanban board client for project-management backends")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Backend API URL. Overrides boardsync.toml and BOARDSYNC_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a project's board
    Board {
        /// Project id (defaults to board.default_project)
        #[arg(short, long)]
        project: Option<String>,

        /// Only issues whose title or key contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only these priorities (repeatable)
        #[arg(long)]
        priority: Vec<Priority>,

        /// Only these issue types (repeatable)
        #[arg(long = "type")]
        issue_type: Vec<IssueType>,

        /// Only issues assigned to these user ids (repeatable)
        #[arg(long)]
        assignee: Vec<String>,

        /// Only issues carrying one of these label ids (repeatable)
        #[arg(long)]
        label: Vec<String>,

        /// Only issues in this epic
        #[arg(long)]
        epic: Option<String>,
    },
    /// Move an issue to another column
    Move {
        issue_id: String,

        /// Target status: backlog, todo, in_progress, in_review, done, cancelled
        status: IssueStatus,

        #[arg(short, long)]
        project: Option<String>,

        /// Position in the target column (defaults to the end)
        #[arg(short, long)]
        index: Option<usize>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default boardsync.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    boardsync::logging::init_logging(cli.verbose, cli.json_logs)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let mut config = boardsync::config::SyncConfig::resolve(&project_dir)?;
    if let Some(url) = &cli.api_url {
        config.api.url = url.clone();
    }

    match &cli.command {
        Commands::Board {
            project,
            search,
            priority,
            issue_type,
            assignee,
            label,
            epic,
        } => {
            let mut filters = boardsync::board::BoardFilters::default()
                .with_search(search.clone().unwrap_or_default())
                .with_priorities(priority.iter().copied())
                .with_types(issue_type.iter().copied())
                .with_assignees(assignee.iter().cloned())
                .with_labels(label.iter().cloned());
            filters.epic_id = epic.clone();
            let project = cmd::resolve_project(&config, project.as_deref())?;
            cmd::cmd_board(&config, &project, filters).await?;
        }
        Commands::Move {
            issue_id,
            status,
            project,
            index,
        } => {
            let project = cmd::resolve_project(&config, project.as_deref())?;
            cmd::cmd_move(&config, &project, issue_id, *status, *index).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, &config, command.clone())?,
    }

    Ok(())
}
