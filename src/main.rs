//! Hatflow CLI entry point.

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hatflow::config::MissionConfig;

#[derive(Parser)]
#[command(
    name = "hatflow",
    version,
    about = "Mission orchestration for a small team of generative agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one mission: produce, review, revise, finalize, archive
    Run {
        /// What the team should accomplish
        #[arg(long)]
        goal: String,

        /// Comma-separated profile ids, in roster order
        #[arg(long, value_delimiter = ',', required = true)]
        team: Vec<String>,

        /// Directory of agent profile files
        #[arg(long)]
        hats_dir: Option<PathBuf>,

        /// Directory for archived mission records
        #[arg(long)]
        missions_dir: Option<PathBuf>,

        /// Retry budget for the QA loop
        #[arg(long)]
        max_retries: Option<u32>,

        /// Timeout for a single engine call, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// External generation engine command
        #[arg(long)]
        engine_cmd: Option<String>,

        /// Skip the manual review prompt, approving escalated output
        #[arg(long)]
        yes: bool,
    },

    /// Inspect agent profiles
    Hats {
        #[command(subcommand)]
        command: HatsCommands,
    },

    /// Inspect the mission archive
    Missions {
        #[command(subcommand)]
        command: MissionsCommands,
    },
}

#[derive(Subcommand)]
enum HatsCommands {
    /// List all known profiles
    List {
        #[arg(long)]
        hats_dir: Option<PathBuf>,
    },

    /// Show one profile as JSON
    Show {
        /// Profile id
        id: String,

        #[arg(long)]
        hats_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MissionsCommands {
    /// List archived missions, most recent first
    List {
        #[arg(long)]
        missions_dir: Option<PathBuf>,
    },
}

fn base_config(hats_dir: Option<PathBuf>, missions_dir: Option<PathBuf>) -> MissionConfig {
    let mut config = MissionConfig::default();
    if let Some(dir) = hats_dir {
        config = config.with_hats_dir(dir);
    }
    if let Some(dir) = missions_dir {
        config = config.with_missions_dir(dir);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            goal,
            team,
            hats_dir,
            missions_dir,
            max_retries,
            timeout_secs,
            engine_cmd,
            yes,
        } => {
            let mut config = base_config(hats_dir, missions_dir).with_auto_approve(yes);
            if let Some(max_retries) = max_retries {
                config = config.with_max_retries(max_retries);
            }
            if let Some(secs) = timeout_secs {
                config = config.with_timeout_secs(secs);
            }
            if let Some(cmd) = engine_cmd {
                config = config.with_engine_cmd(&cmd);
            }
            cmd::cmd_run(config, &goal, &team).await
        }
        Commands::Hats { command } => match command {
            HatsCommands::List { hats_dir } => {
                cmd::cmd_hats_list(&base_config(hats_dir, None))
            }
            HatsCommands::Show { id, hats_dir } => {
                cmd::cmd_hats_show(&base_config(hats_dir, None), &id)
            }
        },
        Commands::Missions { command } => match command {
            MissionsCommands::List { missions_dir } => {
                cmd::cmd_missions_list(&base_config(None, missions_dir))
            }
        },
    }
}
