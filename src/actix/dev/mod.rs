//! Development-only Actix pieces: the reload script middleware and the
//! WebSocket that tells browsers about template and stylesheet changes.
//!
//! Without the `devel` feature there is no watcher, so `InjectReloadScript`
//! is a passthrough that hands back the inner service untouched. Apps can
//! keep `.wrap(InjectReloadScript::default())` in both builds.

#[cfg(feature = "devel")]
mod middleware;
#[cfg(feature = "devel")]
pub(crate) mod ws;
#[cfg(feature = "devel")]
pub use middleware::InjectReloadScript;

#[cfg(not(feature = "devel"))]
pub use passthrough::InjectReloadScript;

#[cfg(not(feature = "devel"))]
mod passthrough {
  use actix_web::body::MessageBody;
  use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
  use std::future::{Ready, ready};

  /// Leaves responses alone; release builds never inject a reload script.
  #[derive(Debug, Clone, Default)]
  pub struct InjectReloadScript;

  impl<S, B> Transform<S, ServiceRequest> for InjectReloadScript
  where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
  {
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    // No wrapper service: requests go straight to the inner one.
    type Transform = S;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
      ready(Ok(service))
    }
  }
}
