//! Ready-made routes for common rendering patterns.
//!
//! ```rust,no_run
//! use actix_web::{App, web};
//! use livebars::{HandlebarsWeb, actix::routes};
//!
//! # fn app(state: HandlebarsWeb) {
//! let app = App::new()
//!   .app_data(web::Data::new(state))
//!   .route("/about", routes::single_template("about"))
//!   .route("/pages/{template}", routes::dispatcher("index"))
//!   .route("/templates", routes::bundle());
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{Either, HttpRequest, HttpResponse, Route, web};
use serde_json::{Map, Value, json};

use crate::core::app::HandlebarsWeb;
use crate::core::layout::{TemplateId, TemplateKind};
use crate::error::LivebarsError;

/// The context every request-driven route renders with:
/// `{ req: { query, params, path } }`.
pub fn request_context(req: &HttpRequest, query: HashMap<String, String>) -> Value {
  let params: Map<String, Value> = req
    .match_info()
    .iter()
    .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
    .collect();
  json!({
    "req": {
      "query": query,
      "params": params,
      "path": req.path(),
    }
  })
}

/// A GET route that always renders the same page with the request's data.
pub fn single_template(template_key: &str) -> Route {
  let template_key: Arc<str> = Arc::from(template_key);
  web::get().to(
    move |app: web::Data<HandlebarsWeb>, req: HttpRequest, query: web::Query<HashMap<String, String>>| {
      let template_key = Arc::clone(&template_key);
      async move { app.render(&template_key, &request_context(&req, query.into_inner())) }
    },
  )
}

/// A GET route rendering the page named by the `{template}` path segment,
/// or `default_key` when the route has no such segment. Unknown pages are 404,
/// and so are keys naming a layout or partial (`layouts/main`, `partials/nav`).
pub fn dispatcher(default_key: &str) -> Route {
  let default_key: Arc<str> = Arc::from(default_key);
  web::get().to(
    move |app: web::Data<HandlebarsWeb>, req: HttpRequest, query: web::Query<HashMap<String, String>>| {
      let default_key = Arc::clone(&default_key);
      async move {
        let key = req.match_info().get("template").unwrap_or(&default_key).to_string();
        if TemplateId::page(&key).kind != TemplateKind::Page || !app.has_template(&key) {
          log::debug!("No page '{}' to dispatch to", key);
          return Either::Left(HttpResponse::NotFound().finish());
        }
        Either::Right(app.render(&key, &request_context(&req, query.into_inner())))
      }
    },
  )
}

/// A GET route serving the raw template bundle as JSON for remote clients.
pub fn bundle() -> Route {
  web::get().to(|app: web::Data<HandlebarsWeb>| async move {
    let bundle = app.bundle()?;
    Ok::<_, LivebarsError>(HttpResponse::Ok().json(&*bundle))
  })
}
