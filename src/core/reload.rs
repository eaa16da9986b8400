use crate::core::cache::TemplateCache;
use crate::core::layout::{TemplateId, is_template_file};
use crate::error::Result;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A message sent from the reloader to all subscribers and connected clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadMessage {
  /// A template changed and has been invalidated. Clients should do a full page reload.
  Reload(TemplateId),
  /// Instructs the client to only reload CSS stylesheets.
  ReloadCss,
}

/// The core, framework-agnostic live-reload controller.
///
/// It holds the file watcher and a broadcast channel to send messages to
/// connected clients.
#[derive(Debug)]
pub(crate) struct DevReloader {
  // We only store the sender. Receivers are created on demand.
  pub(crate) broadcaster: broadcast::Sender<ReloadMessage>,
  // Dropping the watcher stops the notifications.
  _watcher: RecommendedWatcher,
  pub(crate) ws_path: String,
  pub(crate) auto_inject_script: bool,
}

impl DevReloader {
  /// Creates a new `DevReloader` and starts watching.
  ///
  /// Only creating the watcher itself can fail. A root or static path that
  /// cannot be watched is logged and skipped.
  pub(crate) fn start(
    cache: Arc<RwLock<TemplateCache>>,
    static_paths: Vec<PathBuf>,
    ws_path: String,
    auto_inject_script: bool,
  ) -> Result<Self> {
    let (tx, _rx) = broadcast::channel(16);
    let broadcaster = tx.clone();

    let roots: Vec<PathBuf> = cache
      .read()
      .roots()
      .map(|roots| roots.iter().map(Path::to_path_buf).collect())
      .unwrap_or_default();

    let cache_clone = Arc::clone(&cache);
    let broadcaster_clone = broadcaster.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
      let event = match res {
        Ok(event) => event,
        Err(e) => {
          log::error!("File watch error: {:?}", e);
          return;
        }
      };

      if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
        return;
      }

      let mut changed = Vec::new();
      let mut css_changed = false;
      for path in &event.paths {
        if is_template_file(path) {
          // The write lock is released before anyone is told about the change.
          if let Some(id) = cache_clone.write().invalidate_path(path) {
            log::info!("📝 Template change detected: {} ({:?})", id, path);
            if !changed.contains(&id) {
              changed.push(id);
            }
          }
        } else if path.extension().and_then(|s| s.to_str()) == Some("css") {
          log::info!("🎨 CSS change detected: {:?}", path);
          css_changed = true;
        }
      }

      for id in changed {
        let _ = broadcaster_clone.send(ReloadMessage::Reload(id));
      }
      if css_changed {
        let _ = broadcaster_clone.send(ReloadMessage::ReloadCss);
      }
    })?;

    for root in &roots {
      log::debug!("Watching template root: {:?}", root);
      if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
        log::error!("Cannot watch template root {:?}, changes there will not reload: {}", root, e);
      }
    }

    for path in &static_paths {
      if !path.exists() {
        log::warn!("Static path to watch does not exist, skipping: {:?}", path);
        continue;
      }
      if let Err(e) = watcher.watch(path, RecursiveMode::Recursive) {
        log::error!("Cannot watch static path {:?}: {}", path, e);
      }
    }

    Ok(Self {
      broadcaster,
      _watcher: watcher,
      ws_path,
      auto_inject_script,
    })
  }

  pub(crate) fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
    self.broadcaster.subscribe()
  }
}
