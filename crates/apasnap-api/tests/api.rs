//! API integration tests for apasnap-api routes.
//!
//! Requests go straight to the router through `tower::ServiceExt`. Upstream
//! directories are served by wiremock behind a proxy template, so targets
//! keep public-looking hostnames that pass validation.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apasnap_api::app::build_app;
use apasnap_api::state::AppState;
use apasnap_core::{GalleryConfig, ProxyTransport};

const TARGET: &str = "https://files.example.org/pics/";
const SLOW_TARGET: &str = "https://slow.example.org/pics/";

const LISTING: &str = r#"<pre><a href="../">../</a>
<a href="alpha.jpg">alpha.jpg</a>   2024-05-01 08:00  120K
<a href="beta.png">beta.png</a>     2024-05-03 08:00  80K
<a href="movie.mp4">movie.mp4</a>   2024-05-02 08:00  12M
<a href="readme.txt">readme.txt</a> 2024-05-02 08:00  1K
</pre>"#;

fn app_with(server: &MockServer) -> axum::Router {
    let config = GalleryConfig::default().with_proxies(vec![ProxyTransport::new(
        "mock",
        format!("{}/proxy?url={{url}}", server.uri()),
    )]);
    build_app(AppState::from_config(config).unwrap())
}

async fn mock_upstream() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("url", TARGET))
        .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("url", SLOW_TARGET))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LISTING)
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("url", "https://locked.example.org/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    server
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(b) = body {
        builder.body(Body::from(serde_json::to_vec(&b).unwrap())).unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    }
}

async fn create_session(app: &axum::Router) -> String {
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/sessions", Some(json!({}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp.into_body()).await["id"].as_str().unwrap().to_string()
}

async fn load(app: &axum::Router, id: &str, url: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/sessions/{id}/load"),
            Some(json!({ "url": url })),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let server = mock_upstream().await;
    let resp = app_with(&server)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn validate_reports_blocked_hosts() {
    let server = mock_upstream().await;
    let app = app_with(&server);

    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/validate?url=files.example.org", None))
        .await
        .unwrap();
    assert_eq!(body_json(resp.into_body()).await, json!({ "valid": true }));

    let resp = app
        .oneshot(json_request("GET", "/api/v1/validate?url=http%3A%2F%2Frouter%2Fadmin", None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_and_list_sessions() {
    let server = mock_upstream().await;
    let app = app_with(&server);

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/sessions", Some(json!({ "proxy_enabled": false }))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["proxy_enabled"], false);
    assert_eq!(body["item_count"], 0);
    assert_eq!(body["view"]["sort"], "date_desc");

    let resp = app
        .oneshot(json_request("GET", "/api/v1/sessions", None))
        .await
        .unwrap();
    let list = body_json(resp.into_body()).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_session_ids() {
    let server = mock_upstream().await;
    let app = app_with(&server);

    let resp = app
        .clone()
        .oneshot(json_request("GET", "/api/v1/sessions/not-a-uuid", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(json_request(
            "GET",
            "/api/v1/sessions/00000000-0000-0000-0000-000000000000",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp.into_body()).await["error"], "not_found");
}

#[tokio::test]
async fn load_returns_sorted_media_with_delivery_urls() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;

    let resp = load(&app, &id, TARGET).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;

    assert_eq!(body["manifest_mode"], false);
    assert_eq!(body["used_proxy"], true);
    assert_eq!(body["transport"], "mock");
    assert_eq!(body["total"], 3);

    let names: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["beta.png", "movie.mp4", "alpha.jpg"]);

    let beta = &body["items"][0];
    assert_eq!(beta["type"], "IMAGE");
    assert!(beta["thumbnailUrl"].as_str().unwrap().starts_with("https://wsrv.nl/?url="));
    assert!(body["items"][1].get("thumbnailUrl").is_none());
}

#[tokio::test]
async fn view_and_items_filter_the_collection() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;
    load(&app, &id, TARGET).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/sessions/{id}/view"),
            Some(json!({ "type": "image", "sort": "name_asc" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["items"][0]["name"], "alpha.jpg");

    let resp = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}/items?query=BET"), None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["name"], "beta.png");

    let resp = app
        .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}/items?sort=size"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_loads_map_to_statuses() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;

    let resp = load(&app, &id, "http://localhost/pics").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp.into_body()).await["error"], "local_hostname_blocked");

    let resp = load(&app, &id, "https://locked.example.org/").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["error"], "auth_denied");
    assert!(body["message"].as_str().unwrap().contains("password protected"));

    let resp = load(&app, &id, "https://empty.example.org/").await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(resp.into_body()).await["error"], "all_transports_exhausted");

    let resp = app
        .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}"), None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["item_count"], 0);
    assert_eq!(body["error_kind"], "all_transports_exhausted");
}

#[tokio::test]
async fn superseded_load_returns_conflict() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;

    let slow = tokio::spawn({
        let app = app.clone();
        let id = id.clone();
        async move { load(&app, &id, SLOW_TARGET).await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", &format!("/api/v1/sessions/{id}/demo"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp.into_body()).await["total"], 10);

    let resp = slow.await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = app
        .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}"), None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["loaded_url"], "demo");
    assert_eq!(body["item_count"], 10);
}

#[tokio::test]
async fn reset_proxy_toggle_and_delete() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;
    load(&app, &id, TARGET).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/sessions/{id}/proxy"),
            Some(json!({ "enabled": false })),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp.into_body()).await["proxy_enabled"], false);

    let resp = app
        .clone()
        .oneshot(json_request("POST", &format!("/api/v1/sessions/{id}/reset"), None))
        .await
        .unwrap();
    let body = body_json(resp.into_body()).await;
    assert_eq!(body["item_count"], 0);
    assert!(body["loaded_url"].is_null());
    assert_eq!(body["last_valid_url"], TARGET);

    let resp = app
        .clone()
        .oneshot(json_request("DELETE", &format!("/api/v1/sessions/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enrichment_marks_images_checked() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;
    load(&app, &id, TARGET).await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", &format!("/api/v1/sessions/{id}/enrich"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(resp.into_body()).await["pending"], 2);

    let mut checked = 0;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let resp = app
            .clone()
            .oneshot(json_request("GET", &format!("/api/v1/sessions/{id}/items"), None))
            .await
            .unwrap();
        let body = body_json(resp.into_body()).await;
        checked = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|i| i["hasCheckedExif"] == true)
            .count();
        if checked == 2 {
            break;
        }
    }
    assert_eq!(checked, 2);
}

#[tokio::test]
async fn metrics_count_loads() {
    let server = mock_upstream().await;
    let app = app_with(&server);
    let id = create_session(&app).await;
    load(&app, &id, TARGET).await;

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.contains("openmetrics-text"));
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("apasnap_loads_succeeded_total 1"));
    assert!(text.contains("apasnap_sessions 1"));
    assert!(text.ends_with("# EOF\n"));
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let server = mock_upstream().await;
    let resp = app_with(&server)
        .oneshot(json_request("GET", "/api/v2/sessions", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp.into_body()).await["error"], "not_found");
}
