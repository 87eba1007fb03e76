//! Outbound HTTP access to the PCM-DPC `dati-json` files.

use std::{future::Future, time::Duration};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::{Error, Result};

/// Where the official province files are published.
pub const DEFAULT_BASE_URL: &str =
  "https://raw.githubusercontent.com/pcm-dpc/COVID-19/master/dati-json";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Endpoint ────────────────────────────────────────────────────────────────

/// The two upstream files: the full history, or only the most recent day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
  Latest,
  History,
}

impl Endpoint {
  pub fn file_name(self) -> &'static str {
    match self {
      Self::Latest => "dpc-covid19-ita-province-latest.json",
      Self::History => "dpc-covid19-ita-province.json",
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The capability to download one upstream file as a JSON array.
///
/// Entries are returned untyped; each one is validated on its own by
/// [`crate::sanitize`] so a single malformed entry cannot sink the payload.
pub trait Upstream: Send + Sync {
  fn fetch(
    &self,
    endpoint: Endpoint,
  ) -> impl Future<Output = Result<Vec<Value>>> + Send + '_;
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

/// Connection settings for the upstream repository.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_owned(),
      timeout:  DEFAULT_TIMEOUT,
    }
  }
}

/// [`Upstream`] over HTTP GET.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpUpstream {
  client: Client,
  config: UpstreamConfig,
}

impl HttpUpstream {
  pub fn new(config: UpstreamConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn url(&self, endpoint: Endpoint) -> String {
    format!(
      "{}/{}",
      self.config.base_url.trim_end_matches('/'),
      endpoint.file_name()
    )
  }
}

impl Upstream for HttpUpstream {
  async fn fetch(&self, endpoint: Endpoint) -> Result<Vec<Value>> {
    let url  = self.url(endpoint);
    let resp = self.client.get(&url).send().await?;

    let status = resp.status();
    if status != StatusCode::OK {
      warn!(%url, %status, "upstream returned non-200");
      return Err(Error::Status { url, status });
    }

    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }
}
