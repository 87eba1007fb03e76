//! Server assembly for the province case API.
//!
//! Loads [`ServerConfig`] and mounts the [`covid_api`] router under `/api`
//! with request tracing.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use config::{ConfigError, Environment, File};
use covid_core::store::CaseStore;
use covid_sync::{SyncGate, Upstream, UpstreamConfig, upstream::DEFAULT_BASE_URL};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COVID_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  pub upstream_base_url: String,
  pub http_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              8069,
      store_path:        PathBuf::from("covid.sqlite3"),
      upstream_base_url: DEFAULT_BASE_URL.to_owned(),
      http_timeout_secs: 30,
    }
  }
}

impl ServerConfig {
  /// Load from an optional TOML file at `path`, overridden by the
  /// environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_file(File::from(path).required(false))
  }

  fn from_file<F>(file: F) -> Result<Self, ConfigError>
  where
    F: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(Environment::with_prefix("COVID"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `store_path` with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn upstream(&self) -> UpstreamConfig {
    UpstreamConfig {
      base_url: self.upstream_base_url.clone(),
      timeout:  Duration::from_secs(self.http_timeout_secs),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the query API under `/api`, traced.
pub fn router<S, U>(gate: Arc<SyncGate<S, U>>) -> Router
where
  S: CaseStore + 'static,
  U: Upstream + 'static,
{
  Router::new()
    .nest("/api", covid_api::api_router(gate))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::NaiveDate;
  use config::FileFormat;
  use covid_core::clock::Clock;
  use covid_store_sqlite::SqliteStore;
  use covid_sync::{Endpoint, Fetcher};
  use serde_json::Value;
  use tower::ServiceExt as _;

  use super::*;

  struct OfflineUpstream;

  impl Upstream for OfflineUpstream {
    async fn fetch(&self, _endpoint: Endpoint) -> covid_sync::Result<Vec<Value>> {
      Err(covid_sync::Error::EmptyWindow)
    }
  }

  async fn app() -> Router {
    let store   = SqliteStore::open_in_memory().await.unwrap();
    let today   = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    let fetcher = Fetcher::new(OfflineUpstream, Clock::Fixed(today));
    router(Arc::new(SyncGate::new(store, fetcher)))
  }

  async fn send(app: Router, method: &str, uri: &str, body: &str) -> axum::response::Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_owned()))
      .unwrap();
    app.oneshot(req).await.unwrap()
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn missing_config_file_uses_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/covid-config.toml")).unwrap();
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.address(), "127.0.0.1:8069");
    assert_eq!(cfg.upstream().timeout, Duration::from_secs(30));
  }

  #[test]
  fn file_values_override_defaults() {
    let toml = r#"
      port = 9000
      upstream_base_url = "http://localhost:8000/dati-json"
      http_timeout_secs = 5
    "#;
    let cfg = ServerConfig::from_file(File::from_str(toml, FileFormat::Toml)).unwrap();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.upstream().base_url, "http://localhost:8000/dati-json");
    assert_eq!(cfg.upstream().timeout, Duration::from_secs(5));
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/data/covid.sqlite3")),
      PathBuf::from(home).join("data/covid.sqlite3")
    );
    assert_eq!(
      expand_tilde(Path::new("/var/lib/covid.sqlite3")),
      PathBuf::from("/var/lib/covid.sqlite3")
    );
  }

  // ── Routing ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn stats_is_mounted_under_api() {
    let resp = send(app().await, "POST", "/api/v1/covid/stats", "{}").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 0);
  }

  #[tokio::test]
  async fn stats_only_accepts_post() {
    let resp = send(app().await, "GET", "/api/v1/covid/stats", "").await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn unknown_paths_are_404() {
    let resp = send(app().await, "POST", "/v1/covid/stats", "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
