use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::Value;

use crate::core::bundle::TemplateBundle;
use crate::core::layout::{TemplateId, TemplateKind, TemplateRoots};
use crate::error::{LivebarsError, Result};

/// Where template sources come from.
#[derive(Debug)]
pub(crate) enum TemplateSource {
  /// Template root directories on disk.
  Roots(TemplateRoots),
  /// An in-memory bundle, e.g. one fetched from a server.
  Bundle(Arc<TemplateBundle>),
}

/// The compiled-template cache.
///
/// Pages and layouts are compiled on first use and dropped from the registry
/// when invalidated. Partials are compiled up front because any template may
/// include them; an invalidated partial is marked stale and recompiled before
/// the next render.
pub(crate) struct TemplateCache {
  registry: Handlebars<'static>,
  source: TemplateSource,
  stale_partials: BTreeSet<String>,
  bundle: Option<Arc<TemplateBundle>>,
}

impl fmt::Debug for TemplateCache {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TemplateCache")
      .field("source", &self.source)
      .field("stale_partials", &self.stale_partials)
      .finish_non_exhaustive()
  }
}

impl TemplateCache {
  /// Builds a cache over template directories, registering every partial.
  pub(crate) fn from_roots(registry: Handlebars<'static>, roots: TemplateRoots) -> Result<Self> {
    let partials = roots.scan(TemplateKind::Partial);
    let mut cache = Self {
      registry,
      source: TemplateSource::Roots(roots),
      stale_partials: BTreeSet::new(),
      bundle: None,
    };
    for (name, path) in partials {
      cache.compile_file(&TemplateId::new(TemplateKind::Partial, name), &path)?;
    }
    Ok(cache)
  }

  /// Builds a cache over an in-memory bundle, compiling everything in it.
  pub(crate) fn from_bundle(mut registry: Handlebars<'static>, bundle: TemplateBundle) -> Result<Self> {
    for (id, source) in bundle.iter() {
      if id.is_shadowing_partial() {
        log::warn!("Ignoring bundled partial '{}', its name collides with a page or layout", id.name);
        continue;
      }
      registry
        .register_template_string(&id.registry_name(), source)
        .map_err(|e| LivebarsError::compile(id.to_string(), e))?;
    }
    Ok(Self {
      registry,
      source: TemplateSource::Bundle(Arc::new(bundle)),
      stale_partials: BTreeSet::new(),
      bundle: None,
    })
  }

  pub(crate) fn roots(&self) -> Option<&TemplateRoots> {
    match &self.source {
      TemplateSource::Roots(roots) => Some(roots),
      TemplateSource::Bundle(_) => None,
    }
  }

  /// Whether `id` can be rendered without compiling anything first.
  pub(crate) fn is_ready(&self, id: &TemplateId) -> bool {
    self.stale_partials.is_empty() && self.registry.has_template(&id.registry_name())
  }

  /// Whether a source exists for `id`.
  pub(crate) fn contains(&self, id: &TemplateId) -> bool {
    if self.registry.has_template(&id.registry_name()) {
      return true;
    }
    match &self.source {
      TemplateSource::Roots(roots) => roots.resolve(id).is_some(),
      TemplateSource::Bundle(bundle) => bundle.get(id).is_some(),
    }
  }

  /// Recompiles stale partials and compiles `id` if it is not registered.
  pub(crate) fn prepare(&mut self, id: &TemplateId) -> Result<()> {
    self.refresh_partials()?;
    if self.registry.has_template(&id.registry_name()) {
      return Ok(());
    }
    let path = match &self.source {
      TemplateSource::Roots(roots) => roots.resolve(id),
      TemplateSource::Bundle(_) => None,
    };
    match path {
      Some(path) => self.compile_file(id, &path),
      None => Err(LivebarsError::TemplateNotFound { key: id.to_string() }),
    }
  }

  pub(crate) fn render(&self, id: &TemplateId, data: &Value) -> Result<String> {
    Ok(self.registry.render(&id.registry_name(), data)?)
  }

  /// Forgets the compiled form of `id` so the next render recompiles it.
  pub(crate) fn invalidate(&mut self, id: &TemplateId) {
    self.bundle = None;
    match id.kind {
      TemplateKind::Partial if id.is_shadowing_partial() => {}
      TemplateKind::Partial => {
        self.stale_partials.insert(id.name.clone());
      }
      TemplateKind::Page | TemplateKind::Layout => {
        self.registry.unregister_template(&id.registry_name());
      }
    }
  }

  /// Invalidates the template defined by the file at `path`, if any.
  pub(crate) fn invalidate_path(&mut self, path: &Path) -> Option<TemplateId> {
    let id = self.roots()?.locate(path)?;
    self.invalidate(&id);
    Some(id)
  }

  pub(crate) fn cached_bundle(&self) -> Option<Arc<TemplateBundle>> {
    match &self.source {
      TemplateSource::Bundle(bundle) => Some(Arc::clone(bundle)),
      TemplateSource::Roots(_) => self.bundle.clone(),
    }
  }

  /// The raw sources of every template, read from disk once per change.
  pub(crate) fn bundle(&mut self) -> Result<Arc<TemplateBundle>> {
    if let Some(bundle) = self.cached_bundle() {
      return Ok(bundle);
    }
    let bundle = match &self.source {
      TemplateSource::Roots(roots) => Arc::new(TemplateBundle::load(roots)?),
      TemplateSource::Bundle(bundle) => Arc::clone(bundle),
    };
    self.bundle = Some(Arc::clone(&bundle));
    Ok(bundle)
  }

  fn refresh_partials(&mut self) -> Result<()> {
    while let Some(name) = self.stale_partials.first().cloned() {
      let id = TemplateId::new(TemplateKind::Partial, name.clone());
      let path = self.roots().and_then(|roots| roots.resolve(&id));
      match path {
        // On failure the partial stays stale and the next render retries.
        Some(path) => self.compile_file(&id, &path)?,
        None => {
          log::debug!("Partial '{}' no longer exists, unregistering", name);
          self.registry.unregister_template(&name);
        }
      }
      self.stale_partials.remove(&name);
    }
    Ok(())
  }

  fn compile_file(&mut self, id: &TemplateId, path: &Path) -> Result<()> {
    let source = std::fs::read_to_string(path)?;
    self
      .registry
      .register_template_string(&id.registry_name(), source)
      .map_err(|e| LivebarsError::compile(id.to_string(), e))?;
    log::debug!("Compiled template {} from {:?}", id, path);
    Ok(())
  }
}
