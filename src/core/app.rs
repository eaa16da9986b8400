use crate::config::LivebarsConfig;
use crate::core::bundle::TemplateBundle;
use crate::core::cache::TemplateCache;
use crate::core::helpers::{self, KeyDataHelper};
use crate::core::layout::{TemplateId, TemplateRoots};
use crate::core::messages::Messages;
use crate::error::{LivebarsError, Result};

use handlebars::{Handlebars, HelperDef};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "devel")]
use crate::core::reload::{DevReloader, ReloadMessage};

/// Which layout wraps a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LayoutChoice {
  /// The builder's default layout, if any.
  Default,
  Named(String),
  Without,
}

/// A framework-agnostic representation of a template to be rendered.
///
/// It is created by [`HandlebarsWeb::render`]. Web framework integration
/// layers turn it into their native response type.
pub struct Template {
  pub(crate) app_state: HandlebarsWeb,
  pub(crate) template_key: String,
  pub(crate) context: Result<Value>,
  pub(crate) layout: LayoutChoice,
}

impl Template {
  /// Wraps the page in `layout` instead of the default layout.
  pub fn with_layout(mut self, layout: &str) -> Self {
    self.layout = LayoutChoice::Named(layout.to_string());
    self
  }

  /// Renders the page on its own, even if a default layout is configured.
  pub fn without_layout(mut self) -> Self {
    self.layout = LayoutChoice::Without;
    self
  }

  pub fn template_key(&self) -> &str {
    &self.template_key
  }

  pub fn render_to_string(self) -> Result<String> {
    let context = self.context?;
    self.app_state.render_value(&self.template_key, context, &self.layout)
  }
}

/// The primary application state, designed to be shared across threads.
///
/// It owns one Handlebars registry with its helpers, partials and compiled
/// templates. Clones share that registry. It is created using
/// [`HandlebarsWeb::builder`].
#[derive(Clone, Debug)]
pub struct HandlebarsWeb {
  /// The compiled-template cache, shared with the file watcher.
  pub(crate) cache: Arc<RwLock<TemplateCache>>,
  /// The pre-built global context, shared across all requests.
  pub(crate) global_context: Arc<Map<String, Value>>,
  pub(crate) default_layout: Option<Arc<str>>,
  pub(crate) messages: Messages,
  /// The live-reload controller, absent when live reload is off or the watcher could not start.
  #[cfg(feature = "devel")]
  pub(crate) reloader: Option<Arc<DevReloader>>,
}

impl HandlebarsWeb {
  /// Creates a new `HandlebarsWebBuilder` over a template root.
  ///
  /// # Arguments
  ///
  /// * `template_dir` - A directory holding `layouts/`, `pages/` and `partials/`.
  pub fn builder(template_dir: impl AsRef<Path>) -> HandlebarsWebBuilder {
    HandlebarsWebBuilder::new(TemplateOrigin::Dirs(vec![template_dir.as_ref().to_path_buf()]))
  }

  /// Creates a builder over templates already in memory. Live reload does not apply.
  pub fn from_bundle(bundle: TemplateBundle) -> HandlebarsWebBuilder {
    HandlebarsWebBuilder::new(TemplateOrigin::Bundle(bundle))
  }

  /// Creates a builder from file based configuration.
  pub fn from_config(config: &LivebarsConfig) -> HandlebarsWebBuilder {
    let mut builder = HandlebarsWebBuilder::new(TemplateOrigin::Dirs(config.template_dirs.clone()))
      .strict_mode(config.strict_mode)
      .live_reload(config.live_reload);
    if let Some(layout) = &config.default_layout {
      builder = builder.default_layout(layout);
    }
    if let Some(path) = &config.messages_file {
      builder = builder.messages_file(path);
    }
    #[cfg(feature = "devel")]
    {
      builder = builder
        .ws_path(&config.ws_path)
        .auto_inject_script(config.auto_inject_script);
      for dir in &config.static_dirs {
        builder = builder.watch_static(dir);
      }
    }
    builder
  }

  /// Renders a page to a string, wrapped in the default layout if one is configured.
  ///
  /// The user's context is merged over the globals. Fails if `key` does not
  /// resolve to a template under any root.
  pub fn render_to_string<T: Serialize>(&self, key: &str, context: &T) -> Result<String> {
    self.render_value(key, serde_json::to_value(context)?, &LayoutChoice::Default)
  }

  /// Renders a page inside the given layout. The layout sees the page as `body`.
  pub fn render_with_layout<T: Serialize>(&self, layout: &str, key: &str, context: &T) -> Result<String> {
    self.render_value(key, serde_json::to_value(context)?, &LayoutChoice::Named(layout.to_string()))
  }

  /// Renders a single partial on its own.
  pub fn render_partial<T: Serialize>(&self, name: &str, context: &T) -> Result<String> {
    let data = self.merge_context(serde_json::to_value(context)?)?;
    self.render_id(&TemplateId::partial(name), &data)
  }

  /// Creates a [`Template`] to be turned into a response by the web layer.
  pub fn render<T: Serialize>(&self, key: &str, context: &T) -> Template {
    Template {
      app_state: self.clone(),
      template_key: key.to_string(),
      context: serde_json::to_value(context).map_err(LivebarsError::from),
      layout: LayoutChoice::Default,
    }
  }

  /// Whether a page with this key exists.
  pub fn has_template(&self, key: &str) -> bool {
    self.cache.read().contains(&TemplateId::page(key))
  }

  /// The raw sources of every template, as served to remote clients.
  pub fn bundle(&self) -> Result<Arc<TemplateBundle>> {
    if let Some(bundle) = self.cache.read().cached_bundle() {
      return Ok(bundle);
    }
    self.cache.write().bundle()
  }

  pub fn messages(&self) -> &Messages {
    &self.messages
  }

  /// Invalidates a template by key (`index`, `pages/index`, `partials/nav`, ...).
  pub fn invalidate(&self, key: &str) {
    self.cache.write().invalidate(&TemplateId::page(key));
  }

  /// Invalidates the template defined by a file, as the watcher does.
  pub fn invalidate_path(&self, path: impl AsRef<Path>) -> Option<TemplateId> {
    self.cache.write().invalidate_path(path.as_ref())
  }

  /// Whether templates are being watched for changes.
  pub fn is_live(&self) -> bool {
    #[cfg(feature = "devel")]
    {
      self.reloader.is_some()
    }
    #[cfg(not(feature = "devel"))]
    {
      false
    }
  }

  /// Subscribes to change notifications. `None` when live reload is not running.
  ///
  /// A render issued after a [`ReloadMessage::Reload`] was received sees the
  /// changed template.
  #[cfg(feature = "devel")]
  pub fn subscribe(&self) -> Option<tokio::sync::broadcast::Receiver<ReloadMessage>> {
    self.reloader.as_ref().map(|reloader| reloader.subscribe())
  }

  pub(crate) fn render_value(&self, key: &str, context: Value, layout: &LayoutChoice) -> Result<String> {
    let mut data = self.merge_context(context)?;
    let body = self.render_id(&TemplateId::page(key), &data)?;

    let layout = match layout {
      LayoutChoice::Default => self.default_layout.as_deref().map(TemplateId::layout),
      LayoutChoice::Named(name) => Some(TemplateId::layout(name)),
      LayoutChoice::Without => None,
    };
    let Some(layout) = layout else {
      return Ok(body);
    };
    if let Value::Object(fields) = &mut data {
      fields.insert("body".to_string(), Value::String(body));
    }
    self.render_id(&layout, &data)
  }

  fn render_id(&self, id: &TemplateId, data: &Value) -> Result<String> {
    {
      let cache = self.cache.read();
      if cache.is_ready(id) {
        return cache.render(id, data);
      }
    }
    let mut cache = self.cache.write();
    cache.prepare(id)?;
    let cache = RwLockWriteGuard::downgrade(cache);
    cache.render(id, data)
  }

  fn merge_context(&self, context: Value) -> Result<Value> {
    // Start with the globals, the user's values overwrite them.
    let mut merged = (*self.global_context).clone();
    match context {
      Value::Object(fields) => merged.extend(fields),
      Value::Null => {}
      other => {
        return Err(LivebarsError::Serialization(format!(
          "template context must serialize to a JSON object, got {}",
          other
        )));
      }
    }
    Ok(Value::Object(merged))
  }
}

pub(crate) enum TemplateOrigin {
  Dirs(Vec<PathBuf>),
  Bundle(TemplateBundle),
}

/// A builder for creating a configured `HandlebarsWeb` instance.
pub struct HandlebarsWebBuilder {
  origin: TemplateOrigin,
  globals: Map<String, Value>,
  messages: HashMap<String, String>,
  messages_file: Option<PathBuf>,
  helpers: Vec<(String, Box<dyn HelperDef + Send + Sync>)>,
  // A closure to run on the registry for advanced configuration.
  handlebars_configurator: Option<Box<dyn FnOnce(&mut Handlebars<'static>)>>,
  default_layout: Option<String>,
  strict_mode: bool,
  live_reload: bool,
  // Deferred so the builder chain stays infallible.
  pending_error: Option<LivebarsError>,
  #[cfg(feature = "devel")]
  static_paths_to_watch: Vec<PathBuf>,
  #[cfg(feature = "devel")]
  ws_path: String,
  #[cfg(feature = "devel")]
  auto_inject_script: bool,
}

impl HandlebarsWebBuilder {
  pub(crate) fn new(origin: TemplateOrigin) -> Self {
    Self {
      origin,
      globals: Map::new(),
      messages: HashMap::new(),
      messages_file: None,
      helpers: Vec::new(),
      handlebars_configurator: None,
      default_layout: None,
      strict_mode: false,
      live_reload: true,
      pending_error: None,
      #[cfg(feature = "devel")]
      static_paths_to_watch: Vec::new(),
      #[cfg(feature = "devel")]
      ws_path: crate::config::DEFAULT_WS_PATH.to_string(),
      #[cfg(feature = "devel")]
      auto_inject_script: true,
    }
  }

  /// Adds another template root. Roots added later override earlier ones.
  pub fn template_dir(mut self, dir: impl AsRef<Path>) -> Self {
    match &mut self.origin {
      TemplateOrigin::Dirs(dirs) => dirs.push(dir.as_ref().to_path_buf()),
      TemplateOrigin::Bundle(_) => {
        log::warn!("Ignoring template directory {:?} for a bundle-backed renderer", dir.as_ref());
      }
    }
    self
  }

  /// Adds a global variable that will be available to all templates.
  ///
  /// # Arguments
  ///
  /// * `key` - The name of the variable in the template (e.g., "site_name").
  /// * `value` - Any value that can be serialized.
  pub fn add_global<S: Into<String>, T: Serialize>(mut self, key: S, value: T) -> Self {
    match serde_json::to_value(value) {
      Ok(value) => {
        self.globals.insert(key.into(), value);
      }
      Err(e) => {
        self.pending_error.get_or_insert(LivebarsError::Serialization(e.to_string()));
      }
    }
    self
  }

  /// Adds message templates for the `messageHelper` helper.
  pub fn messages<I, K, V>(mut self, entries: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    self
      .messages
      .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    self
  }

  /// Loads message templates from a JSON file at build time.
  /// Entries added with [`messages`](Self::messages) take precedence.
  pub fn messages_file(mut self, path: impl AsRef<Path>) -> Self {
    self.messages_file = Some(path.as_ref().to_path_buf());
    self
  }

  /// Registers a helper into this renderer's registry.
  pub fn helper<H>(mut self, name: &str, helper: H) -> Self
  where
    H: HelperDef + Send + Sync + 'static,
  {
    self.helpers.push((name.to_string(), Box::new(helper)));
    self
  }

  /// Registers a `(key, data) -> String` function as a helper.
  ///
  /// `{{name "key"}}` receives the root context as data, `{{name "key" value}}` receives `value`.
  pub fn key_data_helper<F>(self, name: &str, func: F) -> Self
  where
    F: Fn(&str, &Value) -> String + Send + Sync + 'static,
  {
    let helper = KeyDataHelper::new(name, func);
    self.helper(name, helper)
  }

  /// Provides a closure to run for advanced configuration of the registry.
  ///
  /// It runs after all helpers are registered and before any template is compiled.
  pub fn configure_handlebars<F>(mut self, configurator: F) -> Self
  where
    F: FnOnce(&mut Handlebars<'static>) + 'static,
  {
    self.handlebars_configurator = Some(Box::new(configurator));
    self
  }

  /// Wraps every rendered page in this layout unless told otherwise.
  pub fn default_layout(mut self, layout: &str) -> Self {
    self.default_layout = Some(layout.to_string());
    self
  }

  /// Fails renders that reference missing fields.
  pub fn strict_mode(mut self, enabled: bool) -> Self {
    self.strict_mode = enabled;
    self
  }

  /// Enables or disables watching the template roots.
  ///
  /// Defaults to `true`. Has no effect without the `devel` feature.
  pub fn live_reload(mut self, enabled: bool) -> Self {
    self.live_reload = enabled;
    self
  }

  /// Sets the path for the dev-reload WebSocket endpoint.
  ///
  /// Defaults to `/_livebars/ws`.
  #[cfg(feature = "devel")]
  pub fn ws_path(mut self, path: &str) -> Self {
    self.ws_path = path.to_string();
    self
  }

  /// Enables or disables the automatic injection of the live-reload JavaScript.
  ///
  /// Defaults to `true`. Set this to `false` if you want to manually
  /// include the script in your base layout.
  #[cfg(feature = "devel")]
  pub fn auto_inject_script(mut self, enabled: bool) -> Self {
    self.auto_inject_script = enabled;
    self
  }

  /// Adds a static directory to watch for changes.
  ///
  /// This is typically used for CSS files. Can be called multiple times.
  #[cfg(feature = "devel")]
  pub fn watch_static(mut self, path: impl AsRef<Path>) -> Self {
    self.static_paths_to_watch.push(path.as_ref().to_path_buf());
    self
  }

  /// Consumes the builder to construct the final `HandlebarsWeb` application state.
  ///
  /// Registers helpers and partials and, if live reload is on, starts the
  /// file watcher. A watcher that cannot start is logged and the renderer
  /// runs without live reload.
  pub fn build(self) -> Result<HandlebarsWeb> {
    if let Some(err) = self.pending_error {
      return Err(err);
    }

    // 1. Messages: the file first, explicit entries on top.
    let mut entries = match &self.messages_file {
      Some(path) => {
        let loaded = Messages::from_json_file(path)?;
        let mut map = HashMap::with_capacity(loaded.len() + self.messages.len());
        map.extend(loaded.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        map
      }
      None => HashMap::new(),
    };
    entries.extend(self.messages);
    let messages = Messages::new(entries);

    // 2. The registry with built-in and user helpers.
    let mut registry = Handlebars::new();
    registry.set_strict_mode(self.strict_mode);
    helpers::register_builtin(&mut registry, &messages);
    for (name, helper) in self.helpers {
      registry.register_helper(&name, helper);
    }
    if let Some(configurator) = self.handlebars_configurator {
      configurator(&mut registry);
    }

    // 3. Load partials from the roots, or everything from the bundle.
    let cache = match self.origin {
      TemplateOrigin::Dirs(dirs) => {
        if dirs.is_empty() {
          return Err(LivebarsError::Config("at least one template directory is required".to_string()));
        }
        for dir in dirs.iter().filter(|dir| !dir.is_dir()) {
          log::warn!("Template directory does not exist: {:?}", dir);
        }
        TemplateCache::from_roots(registry, TemplateRoots::new(&dirs))?
      }
      TemplateOrigin::Bundle(bundle) => TemplateCache::from_bundle(registry, bundle)?,
    };
    #[cfg(feature = "devel")]
    let watchable = cache.roots().is_some();
    let cache = Arc::new(RwLock::new(cache));

    // 4. Conditionally start the reloader.
    #[cfg(feature = "devel")]
    let reloader = if self.live_reload && watchable {
      match DevReloader::start(
        Arc::clone(&cache),
        self.static_paths_to_watch,
        self.ws_path,
        self.auto_inject_script,
      ) {
        Ok(reloader) => Some(Arc::new(reloader)),
        Err(e) => {
          log::error!("Live reload disabled, the file watcher could not start: {}", e);
          None
        }
      }
    } else {
      None
    };
    #[cfg(not(feature = "devel"))]
    let _ = self.live_reload;

    Ok(HandlebarsWeb {
      #[cfg(feature = "devel")]
      reloader,
      cache,
      global_context: Arc::new(self.globals),
      default_layout: self.default_layout.map(Arc::from),
      messages,
    })
  }
}
