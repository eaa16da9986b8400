//! # Livebars
//!
//! Handlebars templating with live reload, featuring first-class support
//! for Actix Web.
//!
//! ## Features
//!
//! - **Directory Layout:** Each template root holds `layouts/`, `pages/` and
//!   `partials/`. Several roots can be stacked, later ones win.
//! - **Message Strings:** `{{messageHelper "key"}}` fills `%token`
//!   placeholders of a message template from the render context.
//! - **Live Reload (Dev Mode):** Changed templates are recompiled on their
//!   next render and the browser is told to reload. CSS changes reload
//!   stylesheets only.
//! - **Ready-made Routes:** Single page routes, a page dispatcher, an error
//!   page middleware and a JSON endpoint serving the raw templates.
//! - **Remote Templates:** With the `client` feature, render templates
//!   fetched from another server.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use actix_web::{App, HttpServer, Responder, web};
//! use livebars::HandlebarsWeb;
//! use serde_json::json;
//!
//! // An Actix handler that renders `templates/pages/index.handlebars`.
//! async fn index(app_state: web::Data<HandlebarsWeb>) -> impl Responder {
//!   // The `render` method returns a `Template` struct which is a Responder.
//!   app_state.render("index", &json!({ "page_title": "Welcome" }))
//! }
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!   let app_state = HandlebarsWeb::builder("templates")
//!     .add_global("site_name", "My Awesome Site")
//!     .messages([("greeting", "Hello, %name!")])
//!     .default_layout("main")
//!     // In dev mode, also watch the static directory for CSS changes.
//!     .watch_static("static")
//!     .build()
//!     .expect("Failed to build HandlebarsWeb app");
//!
//!   HttpServer::new(move || {
//!     App::new()
//!       .app_data(web::Data::new(app_state.clone()))
//!       // The middleware injects the reload script in dev mode.
//!       .wrap(livebars::actix::dev::InjectReloadScript::default())
//!       .route("/", web::get().to(index))
//!       // The configure method adds the WebSocket route in dev mode.
//!       .configure(|cfg| app_state.configure_routes(cfg))
//!   })
//!   .bind(("127.0.0.1", 3000))?
//!   .run()
//!   .await
//! }
//! ```
//!
//! ### Production Builds
//!
//! To build your application for production, use the `--no-default-features` flag
//! to disable the `devel` feature:
//!
//! ```sh
//! cargo build --release --no-default-features
//! ```

pub mod actix;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod core;
pub mod error;

pub use crate::config::LivebarsConfig;
pub use crate::core::app::{HandlebarsWeb, HandlebarsWebBuilder, Template};
pub use crate::core::bundle::TemplateBundle;
pub use crate::core::helpers::KeyDataHelper;
pub use crate::core::layout::{TemplateId, TemplateKind};
pub use crate::core::messages::{Messages, resolve_message, string_template};
#[cfg(feature = "devel")]
pub use crate::core::reload::ReloadMessage;
pub use crate::error::{LivebarsError, Result};
