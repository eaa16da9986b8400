use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::layout::{TemplateId, TemplateKind, TemplateRoots};
use crate::error::Result;

/// Raw template sources of every layout, page and partial, keyed by name.
///
/// This is the payload served to remote clients so they can render with
/// the same templates as the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBundle {
  #[serde(default)]
  pub layouts: BTreeMap<String, String>,
  #[serde(default)]
  pub pages: BTreeMap<String, String>,
  #[serde(default)]
  pub partials: BTreeMap<String, String>,
}

impl TemplateBundle {
  /// Reads every template below `roots`. Later roots override earlier ones.
  pub fn load(roots: &TemplateRoots) -> Result<Self> {
    let mut bundle = Self::default();
    for kind in TemplateKind::ALL {
      for (name, path) in roots.scan(kind) {
        let source = std::fs::read_to_string(&path)?;
        bundle.section_mut(kind).insert(name, source);
      }
    }
    Ok(bundle)
  }

  pub fn section(&self, kind: TemplateKind) -> &BTreeMap<String, String> {
    match kind {
      TemplateKind::Layout => &self.layouts,
      TemplateKind::Page => &self.pages,
      TemplateKind::Partial => &self.partials,
    }
  }

  pub fn section_mut(&mut self, kind: TemplateKind) -> &mut BTreeMap<String, String> {
    match kind {
      TemplateKind::Layout => &mut self.layouts,
      TemplateKind::Page => &mut self.pages,
      TemplateKind::Partial => &mut self.partials,
    }
  }

  pub fn get(&self, id: &TemplateId) -> Option<&str> {
    self.section(id.kind).get(&id.name).map(String::as_str)
  }

  /// Every template in the bundle with its id.
  pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &str)> {
    TemplateKind::ALL.into_iter().flat_map(move |kind| {
      self
        .section(kind)
        .iter()
        .map(move |(name, source)| (TemplateId::new(kind, name.clone()), source.as_str()))
    })
  }
}
