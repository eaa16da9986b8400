mod common;

use crate::common::{template_root, test_handler};

use actix_web::{App, HttpResponse, test, web};
use livebars::{HandlebarsWeb, LivebarsError, actix::RenderErrorPage, actix::dev::InjectReloadScript, actix::routes};

#[actix_rt::test]
async fn test_render_in_actix_server() {
  // 1. Setup: a page inside a layout
  let temp_dir = template_root(&[
    ("layouts/main.handlebars", "<html>{{{body}}}</html>"),
    (
      "pages/index.handlebars",
      "<head><title>{{ site_name }} | {{ page_title }}</title></head>",
    ),
  ]);

  // 2. Setup: Build the Livebars app state
  let livebars_app = HandlebarsWeb::builder(temp_dir.path())
    .add_global("site_name", "Livebars App")
    .default_layout("main")
    .live_reload(false)
    .build()
    .unwrap();

  // 3. Setup: Create the Actix test server
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .route("/", web::get().to(test_handler)),
  )
  .await;

  // 4. Execution: Make a request to the test server
  let req = test::TestRequest::get().uri("/").to_request();
  let resp = test::call_service(&app, req).await;

  // 5. Assertion: Check the response status and body
  assert!(resp.status().is_success());
  assert_eq!(resp.headers().get("content-type").unwrap(), "text/html; charset=utf-8");

  let body = test::read_body(resp).await;
  let body_str = std::str::from_utf8(&body).unwrap();

  let expected_html = "<html><head><title>Livebars App | Integration Test</title></head></html>";
  assert_eq!(body_str, expected_html);
}

#[actix_rt::test]
async fn test_missing_template_is_server_error() {
  let temp_dir = template_root(&[("pages/other.handlebars", "other")]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .route("/", web::get().to(test_handler)),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
  assert_eq!(resp.status(), 500);
  let error = resp.response().error().unwrap();
  assert!(error.as_error::<LivebarsError>().is_some());
}

#[actix_rt::test]
async fn test_single_template_route_sees_request() {
  let temp_dir = template_root(&[(
    "pages/about.handlebars",
    "{{req.path}} {{req.query.myvar}} {{messageHelper \"who\" req.query}}",
  )]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path())
    .messages([("who", "by %myvar")])
    .live_reload(false)
    .build()
    .unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .route("/about", routes::single_template("about")),
  )
  .await;

  let req = test::TestRequest::get().uri("/about?myvar=hello").to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(std::str::from_utf8(&body).unwrap(), "/about hello by hello");
}

#[actix_rt::test]
async fn test_dispatcher_route() {
  let temp_dir = template_root(&[
    ("pages/index.handlebars", "home"),
    ("pages/contact.handlebars", "contact {{req.params.template}}"),
    ("layouts/main.handlebars", "layout {{{body}}}"),
    ("partials/nav.handlebars", "nav"),
  ]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .route("/", routes::dispatcher("index"))
      .route("/{template:.*}", routes::dispatcher("index")),
  )
  .await;

  let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
  assert_eq!(&body[..], b"home");

  let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/contact").to_request()).await;
  assert_eq!(&body[..], b"contact contact");

  let resp = test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;
  assert_eq!(resp.status(), 404);

  let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/pages/contact").to_request()).await;
  assert_eq!(&body[..], b"contact pages/contact");

  // Only pages are reachable from a URL.
  for uri in ["/layouts/main", "/partials/nav"] {
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(resp.status(), 404, "{uri}");
  }
}

#[actix_rt::test]
async fn test_bundle_route_serves_raw_sources() {
  let temp_dir = template_root(&[
    ("layouts/main.handlebars", "<main>{{{body}}}</main>"),
    ("pages/index.handlebars", "{{> nav}}"),
    ("partials/nav.hbs", "<nav></nav>"),
  ]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .route("/templates", routes::bundle()),
  )
  .await;

  let bundle: serde_json::Value =
    test::call_and_read_body_json(&app, test::TestRequest::get().uri("/templates").to_request()).await;
  assert_eq!(bundle["layouts"]["main"], "<main>{{{body}}}</main>");
  assert_eq!(bundle["pages"]["index"], "{{> nav}}");
  assert_eq!(bundle["partials"]["nav"], "<nav></nav>");
}

async fn failing_handler() -> actix_web::Result<HttpResponse> {
  Err(actix_web::error::ErrorBadGateway("upstream went away"))
}

#[actix_rt::test]
async fn test_error_page_middleware() {
  let temp_dir = template_root(&[(
    "pages/error.handlebars",
    "<h1>{{statusCode}}</h1><p>{{message}}</p>",
  )]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .wrap(RenderErrorPage::new("error"))
      .route("/fail", web::get().to(failing_handler))
      .route("/missing", routes::single_template("missing"))
      .route("/ok", web::get().to(|| async { HttpResponse::Ok().body("fine") })),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/fail").to_request()).await;
  assert_eq!(resp.status(), 502);
  let body = test::read_body(resp).await;
  assert_eq!(
    std::str::from_utf8(&body).unwrap(),
    "<h1>502</h1><p>upstream went away</p>"
  );

  // A template that does not exist surfaces as a 500 with its message.
  let resp = test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;
  assert_eq!(resp.status(), 500);
  let body = test::read_body(resp).await;
  let body_str = std::str::from_utf8(&body).unwrap();
  assert!(body_str.starts_with("<h1>500</h1>"));
  assert!(body_str.contains("missing"));

  let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/ok").to_request()).await;
  assert_eq!(&body[..], b"fine");
}

#[actix_rt::test]
async fn test_error_page_falls_back_when_it_cannot_render() {
  let temp_dir = template_root(&[("pages/index.handlebars", "x")]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .wrap(RenderErrorPage::new("no-such-error-page"))
      .route("/fail", web::get().to(failing_handler)),
  )
  .await;

  let resp = test::call_service(&app, test::TestRequest::get().uri("/fail").to_request()).await;
  assert_eq!(resp.status(), 502);
  let body = test::read_body(resp).await;
  assert_eq!(&body[..], b"upstream went away");
}

#[actix_rt::test]
async fn test_reload_middleware_passes_through_without_live_reload() {
  let temp_dir = template_root(&[("pages/index.handlebars", "<html><body>{{page_title}}</body></html>")]);
  let livebars_app = HandlebarsWeb::builder(temp_dir.path()).live_reload(false).build().unwrap();
  assert!(!livebars_app.is_live());

  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(livebars_app))
      .wrap(InjectReloadScript::default())
      .route("/", web::get().to(test_handler)),
  )
  .await;

  let body = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
  assert_eq!(&body[..], b"<html><body>Integration Test</body></html>");
}
