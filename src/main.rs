//! Livechart Server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Settings come from a TOML file (`--config`, or the default locations
//! searched by [`Config::load_default`]) with environment overrides:
//! - `PORT`: Port to listen on (default: 3000)
//! - `LIVECHART_HOST`: Host to bind to (default: 0.0.0.0)
//! - `LIVECHART_FEED_INTERVAL_MS`: Time between samples (default: 2000)
//! - `LIVECHART_STORE_PATH`: SQLite history file (optional)
//! - `LIVECHART_LOG_LEVEL`, `LIVECHART_LOG_FORMAT`: Logging
//! - `RUST_LOG`: Full filter directive, wins over the log level

use anyhow::Context;
use clap::{Parser, Subcommand};
use livechart::config::{generate_default_config, Config, LoggingConfig};
use livechart::{selector, store, AppState, ChartType, SampleFeed};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "livechart")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live chart relay: streams samples to browser dashboards")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (default)
    Serve {
        /// Port to listen on, overrides config and PORT
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of static dashboard assets
        #[arg(long)]
        static_dir: Option<String>,
    },

    /// Suggest a chart type for the given labels
    Rank {
        /// Chart type labels (scatter, line, bar, horizontal, vertical)
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Print a default config file
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        static_dir: None,
    }) {
        Commands::Serve { port, static_dir } => {
            let mut config = load_config(config_path.as_deref())?;
            init_tracing(&config.logging);

            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = dir;
            }

            run_server(config).await
        }
        Commands::Rank { labels } => {
            let config = load_config(config_path.as_deref())?;
            run_rank(&config, &labels)
        }
        Commands::InitConfig => {
            print!("{}", generate_default_config());
            Ok(())
        }
    }
}

/// Load config under a stderr subscriber so its warnings are not lost
///
/// The `[logging]` section is only known once loading is done.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("livechart=info"));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::with_default(bootstrap, || match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Config::load_default().context("loading default config"),
    })
}

/// Initialize tracing from the logging section
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "livechart={level},tower_http={level}",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting livechart v{}", env!("CARGO_PKG_VERSION"));

    // Refuse to start with a weight table that could produce negative scores
    config
        .selector
        .validate()
        .context("invalid [selector] weights")?;
    config.feed.validate().context("invalid [feed] section")?;

    let history = store::from_config(&config.store);
    tracing::info!(store = %history.describe(), "Sample history");
    if let Err(e) = history.check().await {
        tracing::error!(error = %e, "History store not reachable, clients will get empty history");
    }

    let state = AppState::new(config.server.clone(), config.selector.clone(), history);

    let feed = Arc::new(SampleFeed::new(Arc::clone(&state.hub), config.feed.clone()));
    let feed_handle = Arc::clone(&feed).start();

    let result = livechart::serve(state).await;

    feed_handle.abort();
    tracing::info!(samples = feed.generated(), "Livechart stopped");

    result.context("server error")
}

fn run_rank(config: &Config, labels: &[String]) -> anyhow::Result<()> {
    let labels = labels
        .iter()
        .map(|label| label.parse::<ChartType>())
        .collect::<Result<Vec<_>, _>>()?;

    let ranking = selector::score(&labels, &config.selector)?;

    println!("Suggested Graph Type: {}", ranking.suggested);
    println!(
        "distinct={} dispersion={:.3}",
        ranking.distinct_count, ranking.dispersion
    );
    for (label, score) in ranking.scores.iter() {
        println!("  {:<10} {:>8.3}", label, score);
    }
    Ok(())
}
