//! covid-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and either serves the query API or runs a single upstream
//! fetch.
//!
//! ```text
//! covid-server serve
//! covid-server fetch --start 2020-03-01 --end 2020-03-31
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covid_core::clock::Clock;
use covid_server::ServerConfig;
use covid_store_sqlite::SqliteStore;
use covid_sync::{FetchRequest, Fetcher, HttpUpstream, SyncGate};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Italian province COVID-19 case API")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,
  /// Fetch one day, a date range, or the latest publication into the store.
  Fetch {
    /// A single day (YYYY-MM-DD).
    #[arg(long, conflicts_with_all = ["start", "end"])]
    date:  Option<NaiveDate>,
    /// First day of a range; requires `--end`.
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    /// Last day of a range, inclusive; requires `--start`.
    #[arg(long, requires = "start")]
    end:   Option<NaiveDate>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = server_cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let upstream =
    HttpUpstream::new(server_cfg.upstream()).context("failed to build HTTP client")?;
  let fetcher = Fetcher::new(upstream, Clock::System);

  match cli.command {
    Command::Serve => serve(&server_cfg, SyncGate::new(store, fetcher)).await,
    Command::Fetch { date, start, end } => {
      let request = match (date, start, end) {
        (Some(date), ..) => FetchRequest::Date(date),
        (None, Some(start), Some(end)) => {
          anyhow::ensure!(start <= end, "--end cannot be before --start");
          FetchRequest::Range { start, end }
        }
        _ => FetchRequest::Latest,
      };

      let outcome = fetcher
        .try_fetch(&store, request)
        .await
        .with_context(|| format!("fetch {request:?} failed"))?;
      println!(
        "received={} matched={} rejected={} duplicates={} inserted={}",
        outcome.received, outcome.matched, outcome.rejected, outcome.duplicates, outcome.inserted,
      );
      Ok(())
    }
  }
}

async fn serve(
  server_cfg: &ServerConfig,
  gate: SyncGate<SqliteStore, HttpUpstream>,
) -> anyhow::Result<()> {
  let app     = covid_server::router(Arc::new(gate));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
