#![allow(dead_code)]

use std::fs;
use std::path::Path;

use actix_web::{Responder, web};
use livebars::HandlebarsWeb;
use serde_json::json;
use tempfile::{TempDir, tempdir};

// Test handler that uses the livebars render method
pub async fn test_handler(app_state: web::Data<HandlebarsWeb>) -> impl Responder {
  app_state.render("index", &json!({ "page_title": "Integration Test" }))
}

/// Writes `(relative path, content)` pairs into a fresh template root.
pub fn template_root(files: &[(&str, &str)]) -> TempDir {
  let dir = tempdir().unwrap();
  write_files(dir.path(), files);
  dir
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
  for (relative, content) in files {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }
}
