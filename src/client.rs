//! Fetches templates from a server exposing [`routes::bundle`](crate::actix::routes::bundle)
//! and renders them locally.
//!
//! ```rust,no_run
//! # async fn run() -> livebars::Result<()> {
//! use livebars::client::TemplateClient;
//! use serde_json::json;
//!
//! let client = TemplateClient::new("http://localhost:8080");
//! let app = client.load("/templates").await?;
//! let html = app.render_to_string("index", &json!({ "name": "World" }))?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use crate::core::app::{HandlebarsWeb, HandlebarsWebBuilder};
use crate::core::bundle::TemplateBundle;
use crate::error::{LivebarsError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a remote template bundle.
#[derive(Debug, Clone)]
pub struct TemplateClient {
  base_url: String,
  client: reqwest::Client,
}

impl TemplateClient {
  /// Creates a client for the server at `base_url`, e.g. `http://localhost:8080`.
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      client: reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default(),
    }
  }

  /// Uses a preconfigured `reqwest::Client`.
  pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      client,
    }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Downloads the raw template sources served at `path`.
  pub async fn fetch_bundle(&self, path: &str) -> Result<TemplateBundle> {
    let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
    log::debug!("Fetching template bundle from {}", url);

    let response = self.client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(LivebarsError::Remote {
        status: status.as_u16(),
        url,
      });
    }
    Ok(response.json::<TemplateBundle>().await?)
  }

  /// A builder over the remote bundle, for adding messages, globals or helpers.
  pub async fn load_builder(&self, path: &str) -> Result<HandlebarsWebBuilder> {
    let bundle = self.fetch_bundle(path).await?;
    log::info!(
      "Loaded {} layouts, {} pages and {} partials from {}",
      bundle.layouts.len(),
      bundle.pages.len(),
      bundle.partials.len(),
      self.base_url
    );
    Ok(HandlebarsWeb::from_bundle(bundle))
  }

  /// Fetches the bundle and builds a renderer with the built-in helpers.
  pub async fn load(&self, path: &str) -> Result<HandlebarsWeb> {
    self.load_builder(path).await?.build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_is_normalized() {
    let client = TemplateClient::new("http://localhost:8080/");
    assert_eq!(client.base_url(), "http://localhost:8080");
  }

  #[tokio::test]
  async fn test_unreachable_server_is_http_error() {
    // Port 9 (discard) is closed on test machines.
    let client = TemplateClient::new("http://127.0.0.1:9");
    let result = client.fetch_bundle("/templates").await;
    assert!(matches!(result, Err(LivebarsError::Http(_))));
  }
}
