use actix_web::{
  Error,
  body::{BoxBody, MessageBody},
  dev::{Service, ServiceRequest, ServiceResponse, Transform},
  http::header::CONTENT_TYPE,
  web,
};
use bytes::{Bytes, BytesMut};
use futures_util::future::{self, LocalBoxFuture};
use std::{rc::Rc, task::Poll};

use crate::core::app::HandlebarsWeb;

const SCRIPT_TAG_START: &[u8] = b"<script data-livebars-reload=\"true\">";
const SCRIPT_CONTENT: &str = include_str!("injected.js");
const WS_PATH_PLACEHOLDER: &str = "__LIVEBARS_WS_PATH__";
const SCRIPT_TAG_END: &[u8] = b"</script>";
const BODY_TAG: &[u8] = b"</body>";

/// Injects the live-reload script into HTML responses.
///
/// The WebSocket path and the on/off switch come from the
/// `web::Data<HandlebarsWeb>` in the app data. Without it, or when live
/// reload is not running, responses pass through untouched.
#[derive(Debug, Clone, Default)]
pub struct InjectReloadScript;

impl<S, B> Transform<S, ServiceRequest> for InjectReloadScript
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  B: MessageBody + 'static,
{
  type Response = ServiceResponse<BoxBody>;
  type Error = Error;
  type Transform = InjectReloadScriptMiddleware<S>;
  type InitError = ();
  type Future = future::Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    future::ok(InjectReloadScriptMiddleware {
      // Wrap the service in an Rc so it can be shared and owned by futures
      service: Rc::new(service),
    })
  }
}

pub struct InjectReloadScriptMiddleware<S> {
  service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for InjectReloadScriptMiddleware<S>
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
    let script = req.app_data::<web::Data<HandlebarsWeb>>().and_then(|app| reload_script(app));

    Box::pin(async move {
      let res = service.call(req).await?;

      let Some(script) = script else {
        return Ok(res.map_into_boxed_body());
      };

      let is_html = res
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|val| val.to_str().unwrap_or("").contains("text/html"));

      if !is_html {
        return Ok(res.map_into_boxed_body());
      }

      // The body length changes, so any upstream length header is stale.
      let res = res.map_body(move |head, body| {
        head.headers.remove(actix_web::http::header::CONTENT_LENGTH);
        let body_fut = async move {
          let body_bytes = match actix_web::body::to_bytes(body).await {
            Ok(bytes) => bytes,
            Err(_e) => {
              return Err(actix_web::error::ErrorInternalServerError(
                "Failed to buffer response body",
              ));
            }
          };
          Ok::<_, Error>(inject(&body_bytes, &script))
        };

        actix_web::body::BodyStream::new(Box::pin(async_stream::stream! {
          yield body_fut.await;
        }))
        .boxed()
      });

      Ok(res)
    })
  }
}

/// The script to inject, or `None` if injection is off for this app.
fn reload_script(app: &HandlebarsWeb) -> Option<Bytes> {
  let reloader = app.reloader.as_ref()?;
  if !reloader.auto_inject_script {
    return None;
  }
  let ws_path = serde_json::to_string(&reloader.ws_path).ok()?;
  let content = SCRIPT_CONTENT.replace(WS_PATH_PLACEHOLDER, &ws_path);

  let mut script = BytesMut::with_capacity(SCRIPT_TAG_START.len() + content.len() + SCRIPT_TAG_END.len());
  script.extend_from_slice(SCRIPT_TAG_START);
  script.extend_from_slice(content.as_bytes());
  script.extend_from_slice(SCRIPT_TAG_END);
  Some(script.freeze())
}

/// Places the script right before `</body>`, or at the end if there is none.
fn inject(body: &[u8], script: &[u8]) -> Bytes {
  let split_at = find_case_insensitive(body, BODY_TAG).unwrap_or(body.len());
  let mut new_body = BytesMut::with_capacity(body.len() + script.len());
  new_body.extend_from_slice(&body[..split_at]);
  new_body.extend_from_slice(script);
  new_body.extend_from_slice(&body[split_at..]);
  new_body.freeze()
}

fn find_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack
    .windows(needle.len())
    .position(|window| window.eq_ignore_ascii_case(needle))
}
