//! bbkit CLI - command-line access to the Bitbucket REST API 1.0.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use bbkit_bitbucket::BitBucket;
use bbkit_core::{Config, FailurePolicy};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bbkit")]
#[command(author, version, about = "bbkit - Bitbucket REST API client", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bitbucket username (falls back to BITBUCKET_USERNAME, then the config file)
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Bitbucket password (falls back to BITBUCKET_PASSWORD)
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Report request failures instead of printing an empty list
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Email addresses of the authenticated user
    Emails,

    /// Query a user
    User {
        /// Account name
        name: String,

        #[command(subcommand)]
        action: Option<UserAction>,
    },

    /// Query a repository
    Repo {
        /// Repository owner
        owner: String,

        /// Repository slug
        slug: String,

        #[command(subcommand)]
        action: Option<RepoAction>,
    },

    /// Query an issue
    Issue {
        /// Repository owner
        owner: String,

        /// Repository slug
        slug: String,

        /// Issue number
        number: u64,

        #[command(subcommand)]
        action: Option<IssueAction>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum UserAction {
    /// User profile (default)
    Get,
    /// The user's repositories
    Repositories,
    /// Recent events
    Events,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum RepoAction {
    /// Repository details (default)
    Get,
    /// A single changeset
    Changeset {
        /// Revision hash or number
        revision: String,
    },
    /// Recent changesets
    Changesets {
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Tags
    Tags,
    /// Branches
    Branches,
    /// Issue listing
    Issues {
        #[arg(short, long)]
        start: Option<u32>,
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Recent events
    Events,
    /// Followers
    Followers,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum IssueAction {
    /// Issue details (default)
    Get,
    /// Followers
    Followers,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a value, e.g. `auth.username alice` or `api.failure_policy surface`
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(cli, &|name: &str| std::env::var(name).ok(), &mut std::io::stdout())
}

fn run(
    cli: Cli,
    env: &dyn Fn(&str) -> Option<String>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;

    if let Commands::Config { command } = &cli.command {
        return run_config(command, &mut config, &config_path, out);
    }

    let (username, password) = resolve_credentials(&cli, &config, env);
    let mut api = config.api.clone();
    if cli.strict {
        api.failure_policy = FailurePolicy::Surface;
    }

    let bb = BitBucket::with_config(username, password, api)?;
    tracing::debug!(client = ?bb, "Client ready");

    let value = fetch(&bb, &cli.command).map_err(describe_failure)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

/// Flag, then environment, then config file. The password never comes from
/// the config file.
fn resolve_credentials(
    cli: &Cli,
    config: &Config,
    env: &dyn Fn(&str) -> Option<String>,
) -> (String, String) {
    let username = cli
        .username
        .clone()
        .or_else(|| env("BITBUCKET_USERNAME"))
        .unwrap_or_else(|| config.username().to_string());
    let password = cli
        .password
        .clone()
        .or_else(|| env("BITBUCKET_PASSWORD"))
        .unwrap_or_default();
    (username, password)
}

/// Point transport failures at the endpoint; caller mistakes pass through.
fn describe_failure(err: bbkit_core::Error) -> anyhow::Error {
    if err.is_transport() {
        anyhow::Error::new(err)
            .context("Bitbucket request failed (drop --strict to get an empty list instead)")
    } else {
        err.into()
    }
}

fn fetch(bb: &BitBucket, command: &Commands) -> bbkit_core::Result<Value> {
    let value = match command {
        Commands::Emails => bb.emails()?,
        Commands::User { name, action } => {
            let user = bb.user(name.as_str());
            match action.unwrap_or(UserAction::Get) {
                UserAction::Get => user.get()?,
                UserAction::Repositories => user.repositories()?,
                UserAction::Events => user.events()?,
            }
        }
        Commands::Repo {
            owner,
            slug,
            action,
        } => {
            let repo = bb.repository(owner.as_str(), slug.as_str());
            match action.as_ref().unwrap_or(&RepoAction::Get) {
                RepoAction::Get => repo.get()?,
                RepoAction::Changeset { revision } => repo.changeset(revision)?,
                RepoAction::Changesets { limit } => repo.changesets(*limit)?,
                RepoAction::Tags => repo.tags()?,
                RepoAction::Branches => repo.branches()?,
                RepoAction::Issues { start, limit } => repo.issues(*start, *limit)?,
                RepoAction::Events => repo.events()?,
                RepoAction::Followers => repo.followers()?,
            }
        }
        Commands::Issue {
            owner,
            slug,
            number,
            action,
        } => {
            let issue = bb.repository(owner.as_str(), slug.as_str()).issue(*number);
            match action.unwrap_or(IssueAction::Get) {
                IssueAction::Get => issue.get()?,
                IssueAction::Followers => issue.followers()?,
            }
        }
        Commands::Config { .. } => {
            return Err(bbkit_core::Error::Config(
                "config commands do not query the API".to_string(),
            ));
        }
    };
    Ok(value)
}

fn run_config(
    command: &ConfigCommands,
    config: &mut Config,
    path: &Path,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to render configuration")?;
            write!(out, "{}", rendered)?;
        }
        ConfigCommands::Set { key, value } => {
            config.set(key, value)?;
            config.save_to(path)?;
            tracing::info!(key = key.as_str(), "Configuration updated");
        }
        ConfigCommands::Path => {
            writeln!(out, "{}", path.display())?;
        }
    }
    Ok(())
}
