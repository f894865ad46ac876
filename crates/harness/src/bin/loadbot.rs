//! Loadbot CLI
//!
//! Populates a content-and-voting API with users, posts and votes.

use clap::{Parser, Subcommand};
use loadbot::config::{default_search_dirs, locate_config_file, CONFIG_FILE_NAME};
use loadbot::{probe, Harness, HarnessConfig};
use loadbot_client::ServiceEndpoint;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadbot")]
#[command(about = "Load generator for a content-and-voting API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create users, posts and votes
    Run {
        /// Config file (defaults to ./loadbot.toml, then /etc/loadbot.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// API base URL, e.g. http://127.0.0.1:8000/api/v1
        #[arg(long)]
        api_url: Option<String>,

        /// Number of users to create (<= 0 does nothing). Required without a config file
        #[arg(long, allow_negative_numbers = true)]
        users: Option<i64>,

        /// Upper bound of posts per user (<= 0 skips posting). Required without a config file
        #[arg(long, allow_negative_numbers = true)]
        max_posts: Option<i64>,

        /// Vote budget per user (<= 0 skips voting). Required without a config file
        #[arg(long, allow_negative_numbers = true)]
        max_likes: Option<i64>,

        /// Seed for all random choices
        #[arg(long)]
        seed: Option<u64>,

        /// Reject invalid TLS certificates
        #[arg(long)]
        strict_tls: bool,
    },

    /// Log in as an existing user and exercise every endpoint once
    Probe {
        /// API base URL
        #[arg(long)]
        api_url: String,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Reject invalid TLS certificates
        #[arg(long)]
        strict_tls: bool,
    },
}

/// Config file values overridden by flags. Without a file, every required
/// option must come from a flag.
fn resolve_config(
    path: Option<PathBuf>,
    api_url: Option<String>,
    users: Option<i64>,
    max_posts: Option<i64>,
    max_likes: Option<i64>,
) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let path = path.or_else(|| locate_config_file(&default_search_dirs(), CONFIG_FILE_NAME));
    let Some(path) = path else {
        if api_url.is_none() {
            return Err(format!(
                "Could not find config: no {} found and no --api-url given",
                CONFIG_FILE_NAME
            )
            .into());
        }
        return Ok(HarnessConfig::from_options(api_url, users, max_posts, max_likes)?);
    };

    let mut config = HarnessConfig::load(&path)?;
    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(users) = users {
        config = config.with_number_of_users(users);
    }
    if let Some(posts) = max_posts {
        config = config.with_max_posts_per_user(posts);
    }
    if let Some(likes) = max_likes {
        config = config.with_max_likes_per_user(likes);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            api_url,
            users,
            max_posts,
            max_likes,
            seed,
            strict_tls,
        } => {
            let mut config = resolve_config(config, api_url, users, max_posts, max_likes)?;
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if strict_tls {
                config = config.with_accept_invalid_certs(false);
            }

            let mut harness = Harness::new(config)?;
            let report = harness.run().await;
            report.print();

            if report.is_failed() {
                return Err("Run failed: no users could be created".into());
            }
        }

        Commands::Probe {
            api_url,
            username,
            password,
            strict_tls,
        } => {
            let endpoint = ServiceEndpoint::new(api_url, !strict_tls)?;
            let report = probe(
                &endpoint,
                &username,
                &password,
                &mut ChaCha8Rng::from_entropy(),
            )
            .await?;
            report.print();
        }
    }

    Ok(())
}
