use std::path::PathBuf;

use actix_files::Files;
use actix_web::{App, HttpServer, Responder, web};
use livebars::{HandlebarsWeb, actix::RenderErrorPage, actix::routes};
use serde_json::json;

#[derive(serde::Serialize)]
struct User {
  name: String,
  email: String,
}

/// Renders the home page.
async fn index(app_state: web::Data<HandlebarsWeb>) -> impl Responder {
  app_state.render(
    "index",
    &json!({
      "page_title": "Home",
      "visitor": "friend",
    }),
  )
}

/// Renders a page with more complex context.
async fn user_profile(app_state: web::Data<HandlebarsWeb>) -> impl Responder {
  let user = User {
    name: "Alice".to_string(),
    email: "alice@example.com".to_string(),
  };
  app_state.render("user", &json!({ "page_title": "User Profile", "user": user }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize logging
  env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

  let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let static_path = manifest_dir.join("static");

  // 1. Configure and build the Livebars state.
  let app_state = HandlebarsWeb::builder(manifest_dir.join("templates"))
    .add_global("site_name", "Livebars Demo")
    .add_global("version", env!("CARGO_PKG_VERSION"))
    .messages_file(manifest_dir.join("messages.json"))
    .default_layout("main")
    // Watch the static directory for CSS changes
    .watch_static(&static_path)
    .build()
    .expect("Failed to build HandlebarsWeb app");

  log::info!("🚀 Starting server at http://127.0.0.1:3000");

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      // 2. [devel only] Inject the dev middleware.
      .wrap(livebars::actix::dev::InjectReloadScript::default())
      .wrap(RenderErrorPage::new("error"))
      .service(Files::new("/static", static_path.clone()))
      .route("/", web::get().to(index))
      .route("/profile", web::get().to(user_profile))
      .route("/about", routes::single_template("about"))
      .route("/pages/{template}", routes::dispatcher("index"))
      .route("/templates", routes::bundle())
      // 3. [devel only] Configure dev routes (the WebSocket).
      .configure(|cfg| app_state.configure_routes(cfg))
  })
  .bind(("127.0.0.1", 3000))?
  .run()
  .await
}
