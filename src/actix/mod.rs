use crate::core::app::{HandlebarsWeb, Template};
use crate::error::LivebarsError;
use actix_web::{HttpRequest, HttpResponse, Responder, ResponseError, body::BoxBody, http::header::ContentType, web::ServiceConfig};

#[cfg(feature = "devel")]
use actix_web::web;

pub mod dev;
pub mod error_page;
pub mod routes;

pub use error_page::RenderErrorPage;

impl Responder for Template {
  type Body = BoxBody;

  fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
    let template_key = self.template_key.clone();
    match self.render_to_string() {
      Ok(body) => HttpResponse::Ok().content_type(ContentType::html()).body(body),
      Err(e) => {
        log::error!("Template rendering error for '{}': {}", template_key, e);
        // The error stays attached to the response for error-page middleware.
        HttpResponse::from_error(e)
      }
    }
  }
}

/// Every rendering failure is a server error. Routes that accept template
/// keys from the URL answer 404 themselves before rendering.
impl ResponseError for LivebarsError {}

#[cfg(feature = "devel")]
impl HandlebarsWeb {
  /// Configures Actix services needed for development.
  ///
  /// Currently, this adds the WebSocket route handler for live reloading at
  /// the `ws_path` set in the builder. Does nothing when live reload is not running.
  pub fn configure_routes(&self, cfg: &mut ServiceConfig) {
    let Some(reloader) = &self.reloader else {
      log::debug!("Live reload is not running, no WebSocket route attached");
      return;
    };
    log::info!("🔥 Livebars devel enabled. Attaching WebSocket at {}", reloader.ws_path);

    let broadcaster = reloader.broadcaster.clone();

    cfg.route(
      &reloader.ws_path,
      web::get().to(move |req, stream| {
        // Each connection gets its own receiver.
        dev::ws::websocket_handler(req, stream, broadcaster.clone())
      }),
    );
  }
}

#[cfg(not(feature = "devel"))]
impl HandlebarsWeb {
  /// In release builds, this is a no-op that allows user code to compile
  /// without having to add `#[cfg]` attributes.
  pub fn configure_routes(&self, _cfg: &mut ServiceConfig) {}
}
