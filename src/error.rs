use thiserror::Error;

/// A specialized `Result` type for `livebars` operations.
pub type Result<T, E = LivebarsError> = std::result::Result<T, E>;

/// The primary error type for all `livebars` operations.
#[derive(Debug, Error)]
pub enum LivebarsError {
  /// The template key could not be resolved under any template root.
  #[error("Can't find template '{key}' in any of your template directories")]
  TemplateNotFound { key: String },

  /// A template source failed to compile.
  #[error("Failed to compile template '{name}': {source}")]
  Compile {
    name: String,
    #[source]
    source: Box<handlebars::TemplateError>,
  },

  /// An error raised by `handlebars` while rendering.
  #[error("Handlebars rendering error: {0}")]
  Render(#[from] handlebars::RenderError),

  /// An I/O error, typically from reading template files.
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  /// An error that occurs when serializing a user's context.
  #[error("Context serialization error: {0}")]
  Serialization(String),

  /// Invalid builder or file configuration.
  #[error("Invalid configuration: {0}")]
  Config(String),

  /// An error from the file watcher, only available with the `devel` feature.
  #[cfg(feature = "devel")]
  #[error("File watcher error: {0}")]
  Watcher(#[from] notify::Error),

  /// A transport error from the REST client.
  #[cfg(feature = "client")]
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote template endpoint answered with a non-success status.
  #[cfg(feature = "client")]
  #[error("Template server at {url} responded with status {status}")]
  Remote { status: u16, url: String },
}

impl LivebarsError {
  pub(crate) fn compile(name: impl Into<String>, source: handlebars::TemplateError) -> Self {
    Self::Compile {
      name: name.into(),
      source: Box::new(source),
    }
  }
}

impl From<serde_json::Error> for LivebarsError {
  fn from(err: serde_json::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}
