use actix_web::{
  Error, HttpResponse,
  body::{BoxBody, MessageBody},
  dev::{Service, ServiceRequest, ServiceResponse, Transform},
  http::header::ContentType,
  web,
};
use futures_util::future::{self, LocalBoxFuture};
use serde_json::json;
use std::{rc::Rc, task::Poll};

use crate::core::app::HandlebarsWeb;

/// Middleware that renders errors raised further down the stack as HTML.
///
/// The page is rendered with `{ message, statusCode }` and keeps the
/// original status code. It needs `web::Data<HandlebarsWeb>` in the app data.
/// If the error page itself fails to render, the original response is sent.
#[derive(Debug, Clone)]
pub struct RenderErrorPage {
  template_key: Rc<str>,
}

impl RenderErrorPage {
  pub fn new(template_key: &str) -> Self {
    Self {
      template_key: Rc::from(template_key),
    }
  }
}

impl<S, B> Transform<S, ServiceRequest> for RenderErrorPage
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  B: MessageBody + 'static,
{
  type Response = ServiceResponse<BoxBody>;
  type Error = Error;
  type Transform = RenderErrorPageMiddleware<S>;
  type InitError = ();
  type Future = future::Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    future::ok(RenderErrorPageMiddleware {
      service: Rc::new(service),
      template_key: Rc::clone(&self.template_key),
    })
  }
}

pub struct RenderErrorPageMiddleware<S> {
  service: Rc<S>,
  template_key: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for RenderErrorPageMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  B: MessageBody + 'static,
{
  type Response = ServiceResponse<BoxBody>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  fn poll_ready(&self, cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
    self.service.poll_ready(cx)
  }

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = self.service.clone();
    let template_key = self.template_key.clone();

    Box::pin(async move {
      let res = service.call(req).await?;

      let Some(message) = res.response().error().map(|e| e.to_string()) else {
        return Ok(res.map_into_boxed_body());
      };
      let Some(app) = res.request().app_data::<web::Data<HandlebarsWeb>>().cloned() else {
        log::warn!("RenderErrorPage needs web::Data<HandlebarsWeb> in the app data");
        return Ok(res.map_into_boxed_body());
      };

      let status = res.status();
      let context = json!({ "message": message, "statusCode": status.as_u16() });
      match app.render_to_string(&template_key, &context) {
        Ok(html) => {
          let page = HttpResponse::build(status).content_type(ContentType::html()).body(html);
          Ok(res.into_response(page))
        }
        Err(e) => {
          log::error!("Failed to render error page '{}': {}", template_key, e);
          Ok(res.map_into_boxed_body())
        }
      }
    })
  }
}
