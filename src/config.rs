//! File based configuration for [`HandlebarsWeb`](crate::HandlebarsWeb).
//!
//! Everything here can also be set through the builder; this is for
//! applications that keep their settings in a JSON file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LivebarsError, Result};

pub const DEFAULT_WS_PATH: &str = "/_livebars/ws";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LivebarsConfig {
  /// Template roots, each holding `layouts/`, `pages/` and `partials/`.
  /// Later entries override earlier ones.
  pub template_dirs: Vec<PathBuf>,
  /// Extra directories watched for stylesheet changes.
  pub static_dirs: Vec<PathBuf>,
  pub default_layout: Option<String>,
  pub strict_mode: bool,
  pub live_reload: bool,
  pub ws_path: String,
  pub auto_inject_script: bool,
  /// A JSON object of message keys and templates for `messageHelper`.
  pub messages_file: Option<PathBuf>,
}

impl Default for LivebarsConfig {
  fn default() -> Self {
    Self {
      template_dirs: Vec::new(),
      static_dirs: Vec::new(),
      default_layout: None,
      strict_mode: false,
      live_reload: true,
      ws_path: DEFAULT_WS_PATH.to_string(),
      auto_inject_script: true,
      messages_file: None,
    }
  }
}

impl LivebarsConfig {
  pub fn from_json_str(raw: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(raw).map_err(|e| LivebarsError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    Self::from_json_str(&raw).map_err(|e| match e {
      LivebarsError::Config(msg) => LivebarsError::Config(format!("{:?}: {}", path, msg)),
      other => other,
    })
  }

  pub fn validate(&self) -> Result<()> {
    if self.template_dirs.is_empty() {
      return Err(LivebarsError::Config("at least one template directory is required".to_string()));
    }
    if !self.ws_path.starts_with('/') {
      return Err(LivebarsError::Config(format!(
        "wsPath must start with '/', got '{}'",
        self.ws_path
      )));
    }
    Ok(())
  }
}
