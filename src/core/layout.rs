use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

/// File extensions recognised as templates, in lookup order.
pub const TEMPLATE_EXTENSIONS: [&str; 2] = ["handlebars", "hbs"];

/// The three kinds of template a root directory can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
  Layout,
  Page,
  Partial,
}

impl TemplateKind {
  pub const ALL: [TemplateKind; 3] = [TemplateKind::Layout, TemplateKind::Page, TemplateKind::Partial];

  /// The subdirectory of a template root holding this kind.
  pub fn dir_name(self) -> &'static str {
    match self {
      TemplateKind::Layout => "layouts",
      TemplateKind::Page => "pages",
      TemplateKind::Partial => "partials",
    }
  }

  fn from_dir_name(dir: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.dir_name() == dir)
  }
}

/// Logical identity of a template, independent of root and file extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId {
  pub kind: TemplateKind,
  pub name: String,
}

impl TemplateId {
  pub fn new(kind: TemplateKind, name: impl Into<String>) -> Self {
    Self {
      kind,
      name: name.into(),
    }
  }

  pub fn page(key: &str) -> Self {
    Self::parse(key, TemplateKind::Page)
  }

  pub fn layout(key: &str) -> Self {
    Self::parse(key, TemplateKind::Layout)
  }

  pub fn partial(key: &str) -> Self {
    Self::parse(key, TemplateKind::Partial)
  }

  /// Parses a user supplied key such as `index`, `pages/index` or
  /// `partials/header`. A leading kind directory overrides `default_kind`.
  pub fn parse(key: &str, default_kind: TemplateKind) -> Self {
    let key = key.trim_matches('/');
    if let Some((head, rest)) = key.split_once('/') {
      if let Some(kind) = TemplateKind::from_dir_name(head) {
        return Self::new(kind, strip_template_extension(rest));
      }
    }
    Self::new(default_kind, strip_template_extension(key))
  }

  /// Whether this is a partial whose bare name would collide with the
  /// registry name of a page or layout, e.g. `partials/pages/index`.
  pub fn is_shadowing_partial(&self) -> bool {
    let Some((head, _)) = self.name.split_once('/') else {
      return false;
    };
    self.kind == TemplateKind::Partial
      && matches!(
        TemplateKind::from_dir_name(head),
        Some(TemplateKind::Page | TemplateKind::Layout)
      )
  }

  /// The name this template is registered under in the Handlebars registry.
  ///
  /// Partials use their bare name so that `{{> name}}` resolves. Partials
  /// below `partials/pages/` or `partials/layouts/` are never registered.
  pub fn registry_name(&self) -> String {
    match self.kind {
      TemplateKind::Partial => self.name.clone(),
      kind => format!("{}/{}", kind.dir_name(), self.name),
    }
  }
}

impl fmt::Display for TemplateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.kind.dir_name(), self.name)
  }
}

/// Returns the logical name of a template file, or `None` if the file is
/// not a template.
pub fn template_name(file_name: &str) -> Option<&str> {
  let (stem, ext) = file_name.rsplit_once('.')?;
  if stem.is_empty() {
    return None;
  }
  TEMPLATE_EXTENSIONS
    .iter()
    .any(|known| ext.eq_ignore_ascii_case(known))
    .then_some(stem)
}

pub fn is_template_file(path: &Path) -> bool {
  path
    .file_name()
    .and_then(|name| name.to_str())
    .and_then(template_name)
    .is_some()
}

fn strip_template_extension(key: &str) -> &str {
  template_name(key).unwrap_or(key)
}

/// The ordered set of template root directories.
///
/// When the same template exists in several roots, the root configured last
/// wins. This holds for pages, layouts and partials alike.
#[derive(Debug, Clone, Default)]
pub struct TemplateRoots {
  roots: Vec<PathBuf>,
}

impl TemplateRoots {
  pub fn new<I, P>(dirs: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
  {
    let roots = dirs
      .into_iter()
      .map(|dir| {
        let dir = dir.as_ref();
        // Watcher events report canonical paths.
        dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
      })
      .collect();
    Self { roots }
  }

  pub fn iter(&self) -> impl Iterator<Item = &Path> {
    self.roots.iter().map(PathBuf::as_path)
  }

  pub fn is_empty(&self) -> bool {
    self.roots.is_empty()
  }

  /// Finds the file backing `id`, honouring root precedence.
  ///
  /// Extensions match regardless of case, as in [`scan`](Self::scan).
  pub fn resolve(&self, id: &TemplateId) -> Option<PathBuf> {
    let name = Path::new(&id.name);
    // Keys may come straight from a URL.
    if id.is_shadowing_partial() || !name.components().all(|c| matches!(c, Component::Normal(_))) {
      return None;
    }
    let stem = name.file_name()?.to_str()?;
    let parent = name.parent().unwrap_or_else(|| Path::new(""));
    self
      .roots
      .iter()
      .rev()
      .find_map(|root| find_template_file(&root.join(id.kind.dir_name()).join(parent), stem))
  }

  /// Maps a file on disk back to the template it defines.
  pub fn locate(&self, path: &Path) -> Option<TemplateId> {
    self.roots.iter().find_map(|root| {
      let relative = path.strip_prefix(root).ok()?;
      id_from_relative(relative).filter(|id| !id.is_shadowing_partial())
    })
  }

  /// Every template of `kind` across all roots, keyed by name.
  pub fn scan(&self, kind: TemplateKind) -> BTreeMap<String, PathBuf> {
    let mut found = BTreeMap::new();
    for root in &self.roots {
      let dir = root.join(kind.dir_name());
      if !dir.is_dir() {
        log::debug!("No {} directory in template root {:?}", kind.dir_name(), root);
        continue;
      }
      let mut in_root: BTreeMap<String, PathBuf> = BTreeMap::new();
      for entry in WalkDir::new(&dir).follow_links(true).into_iter() {
        let entry = match entry {
          Ok(entry) => entry,
          Err(e) => {
            log::warn!("Skipping unreadable template entry under {:?}: {}", dir, e);
            continue;
          }
        };
        if !entry.file_type().is_file() {
          continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&dir) else {
          continue;
        };
        let Some(name) = name_from_relative(relative) else {
          continue;
        };
        if TemplateId::new(kind, name.as_str()).is_shadowing_partial() {
          log::warn!("Ignoring partial {:?}, its name collides with a page or layout", entry.path());
          continue;
        }
        // `.handlebars` beats `.hbs` inside a single root.
        let replace = match in_root.get(&name) {
          None => true,
          Some(existing) => !has_primary_extension(existing) && has_primary_extension(entry.path()),
        };
        if replace {
          in_root.insert(name, entry.into_path());
        }
      }
      found.extend(in_root);
    }
    found
  }
}

/// The template file named `stem` in `dir`, `.handlebars` before `.hbs`.
fn find_template_file(dir: &Path, stem: &str) -> Option<PathBuf> {
  let mut fallback = None;
  for entry in fs::read_dir(dir).ok()?.flatten() {
    let path = entry.path();
    let matches = path
      .file_name()
      .and_then(|file_name| file_name.to_str())
      .and_then(template_name)
      == Some(stem);
    if !matches || !path.is_file() {
      continue;
    }
    if has_primary_extension(&path) {
      return Some(path);
    }
    fallback.get_or_insert(path);
  }
  fallback
}

fn has_primary_extension(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSIONS[0]))
}

fn id_from_relative(relative: &Path) -> Option<TemplateId> {
  let mut components = relative.components();
  let kind = match components.next()? {
    Component::Normal(dir) => TemplateKind::from_dir_name(dir.to_str()?)?,
    _ => return None,
  };
  let name = name_from_relative(components.as_path())?;
  Some(TemplateId::new(kind, name))
}

fn name_from_relative(relative: &Path) -> Option<String> {
  let file_name = relative.file_name()?.to_str()?;
  let stem = template_name(file_name)?;
  let mut parts: Vec<&str> = Vec::new();
  if let Some(parent) = relative.parent() {
    for component in parent.components() {
      match component {
        Component::Normal(part) => parts.push(part.to_str()?),
        _ => return None,
      }
    }
  }
  parts.push(stem);
  Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  #[test]
  fn test_template_name_strips_known_extensions() {
    assert_eq!(template_name("index.handlebars"), Some("index"));
    assert_eq!(template_name("header.HBS"), Some("header"));
    assert_eq!(template_name("style.css"), None);
    assert_eq!(template_name("README"), None);
    assert_eq!(template_name(".hbs"), None);
  }

  #[test]
  fn test_parse_keys() {
    assert_eq!(TemplateId::page("index"), TemplateId::new(TemplateKind::Page, "index"));
    assert_eq!(TemplateId::page("pages/index"), TemplateId::new(TemplateKind::Page, "index"));
    assert_eq!(
      TemplateId::page("partials/header.handlebars"),
      TemplateId::new(TemplateKind::Partial, "header")
    );
    assert_eq!(TemplateId::layout("main"), TemplateId::new(TemplateKind::Layout, "main"));
    assert_eq!(TemplateId::page("blog/post"), TemplateId::new(TemplateKind::Page, "blog/post"));
  }

  #[test]
  fn test_registry_names() {
    assert_eq!(TemplateId::partial("header").registry_name(), "header");
    assert_eq!(TemplateId::page("index").registry_name(), "pages/index");
    assert_eq!(TemplateId::layout("main").registry_name(), "layouts/main");
  }

  #[test]
  fn test_last_root_wins() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(first.path(), "pages/index.handlebars", "first");
    write(second.path(), "pages/index.hbs", "second");
    write(first.path(), "pages/only-first.handlebars", "only");

    let roots = TemplateRoots::new([first.path(), second.path()]);

    let resolved = roots.resolve(&TemplateId::page("index")).unwrap();
    assert_eq!(fs::read_to_string(resolved).unwrap(), "second");
    assert!(roots.resolve(&TemplateId::page("only-first")).is_some());
    assert!(roots.resolve(&TemplateId::page("missing")).is_none());
    assert!(roots.resolve(&TemplateId::page("../pages/index")).is_none());

    let pages = roots.scan(TemplateKind::Page);
    assert_eq!(pages.len(), 2);
    assert_eq!(fs::read_to_string(&pages["index"]).unwrap(), "second");
  }

  #[test]
  fn test_handlebars_extension_preferred_within_root() {
    let root = tempdir().unwrap();
    write(root.path(), "partials/card.hbs", "short");
    write(root.path(), "partials/card.handlebars", "long");
    let roots = TemplateRoots::new([root.path()]);

    let resolved = roots.resolve(&TemplateId::partial("card")).unwrap();
    assert_eq!(fs::read_to_string(resolved).unwrap(), "long");
    let scanned = roots.scan(TemplateKind::Partial);
    assert_eq!(fs::read_to_string(&scanned["card"]).unwrap(), "long");
  }

  #[test]
  fn test_locate_maps_files_back_to_ids() {
    let root = tempdir().unwrap();
    write(root.path(), "pages/blog/post.handlebars", "post");
    let roots = TemplateRoots::new([root.path()]);
    let canonical = root.path().canonicalize().unwrap();

    assert_eq!(
      roots.locate(&canonical.join("pages/blog/post.handlebars")),
      Some(TemplateId::new(TemplateKind::Page, "blog/post"))
    );
    assert_eq!(
      roots.locate(&canonical.join("partials/nav.hbs")),
      Some(TemplateId::new(TemplateKind::Partial, "nav"))
    );
    assert_eq!(roots.locate(&canonical.join("static/site.css")), None);
    assert_eq!(roots.locate(Path::new("/elsewhere/pages/x.handlebars")), None);
  }

  #[test]
  fn test_resolve_ignores_extension_case() {
    let root = tempdir().unwrap();
    write(root.path(), "pages/about.HBS", "about");
    write(root.path(), "pages/docs/intro.Handlebars", "intro");
    write(root.path(), "partials/nav.hbs", "short");
    write(root.path(), "partials/nav.HANDLEBARS", "long");
    let roots = TemplateRoots::new([root.path()]);

    let about = roots.resolve(&TemplateId::page("about")).unwrap();
    assert_eq!(fs::read_to_string(about).unwrap(), "about");
    let intro = roots.resolve(&TemplateId::page("docs/intro")).unwrap();
    assert_eq!(fs::read_to_string(intro).unwrap(), "intro");
    let nav = roots.resolve(&TemplateId::partial("nav")).unwrap();
    assert_eq!(fs::read_to_string(nav).unwrap(), "long");
    assert!(roots.resolve(&TemplateId::page("About")).is_none());
  }

  #[test]
  fn test_partials_cannot_take_page_or_layout_names() {
    let root = tempdir().unwrap();
    write(root.path(), "partials/pages/index.handlebars", "partial");
    write(root.path(), "partials/layouts/main.handlebars", "partial");
    write(root.path(), "partials/widgets/card.handlebars", "card");
    let roots = TemplateRoots::new([root.path()]);
    let canonical = root.path().canonicalize().unwrap();

    let shadowing = TemplateId::new(TemplateKind::Partial, "pages/index");
    assert!(shadowing.is_shadowing_partial());
    assert!(!TemplateId::new(TemplateKind::Page, "pages/index").is_shadowing_partial());

    let partials = roots.scan(TemplateKind::Partial);
    assert_eq!(partials.keys().collect::<Vec<_>>(), ["widgets/card"]);
    assert!(roots.resolve(&shadowing).is_none());
    assert_eq!(roots.locate(&canonical.join("partials/pages/index.handlebars")), None);
  }
}
