//! Red alert CLI
//!
//! Runs one-off checks against the alert feed, shows recent history,
//! watches the feed in the foreground and talks to a running agent.

mod client;
mod commands;
mod config;
mod output;
mod sink;

use alert_lib::fetcher::{FetcherConfig, OrefFetcher, DEFAULT_ALERTS_URL, DEFAULT_HISTORY_URL};
use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{agent, check, history, watch};
use tracing_subscriber::EnvFilter;

/// Red alert feed watcher CLI
#[derive(Parser)]
#[command(name = "redalert")]
#[command(author, version, about = "CLI for the red alert feed watcher", long_about = None)]
pub struct Cli {
    /// Active alerts endpoint
    #[arg(long, env = "REDALERT_ALERTS_URL", default_value = DEFAULT_ALERTS_URL)]
    pub alerts_url: String,

    /// Alert history endpoint
    #[arg(long, env = "REDALERT_HISTORY_URL", default_value = DEFAULT_HISTORY_URL)]
    pub history_url: String,

    /// Agent API URL for `agent` commands
    #[arg(long, env = "REDALERT_AGENT_URL")]
    pub agent_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the feed once and print the result
    Check,

    /// Show the most recent alert history
    History {
        /// Number of entries to show
        #[arg(long, short, default_value_t = 5)]
        limit: usize,
    },

    /// Watch the feed until interrupted
    Watch(watch::WatchArgs),

    /// Commands against a running agent
    #[command(subcommand)]
    Agent(AgentCommands),
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Show agent component health
    Health,

    /// Trigger a manual check on the agent
    Check,
}

const DEFAULT_AGENT_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = config::Config::load()?;
    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    let fetcher_config = FetcherConfig {
        alerts_url: cli.alerts_url,
        history_url: cli.history_url,
        ..FetcherConfig::default()
    };

    match cli.command {
        Commands::Check => {
            check::run_check(OrefFetcher::new(fetcher_config)?, format).await?;
        }
        Commands::History { limit } => {
            history::show_history(&OrefFetcher::new(fetcher_config)?, limit, format).await?;
        }
        Commands::Watch(args) => {
            let settings = args.into_settings(&config);
            watch::run_watch(OrefFetcher::new(fetcher_config)?, settings, format).await?;
        }
        Commands::Agent(agent_cmd) => {
            let agent_url = cli
                .agent_url
                .or(config.agent_url)
                .unwrap_or_else(|| DEFAULT_AGENT_URL.to_string());
            let client = client::AgentClient::new(&agent_url)?;

            match agent_cmd {
                AgentCommands::Health => agent::show_health(&client, format).await?,
                AgentCommands::Check => agent::run_check(&client, format).await?,
            }
        }
    }

    Ok(())
}
