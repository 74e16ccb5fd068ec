use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use prefixgate_core::{AllowListConfiguration, LocaleConfig};
use prefixgate_gateway::{GatewayConfig, GatewayServer, PathPrefixResolver};
use serde_json::{json, Value};
use tower::ServiceExt;

const ANDROID_UA: &str = "Mozilla/5.0 (Android; Mobile; rv:40.0) Gecko/40.0 Firefox/40.0";

fn server(config: GatewayConfig) -> GatewayServer {
    let resolver = PathPrefixResolver::new(AllowListConfiguration::default(), LocaleConfig::default());
    GatewayServer::new(config, resolver)
}

async fn send(config: GatewayConfig, request: Request<Body>) -> Response<Body> {
    server(config).build_router().oneshot(request).await.unwrap()
}

async fn get(uri: &str) -> Response<Body> {
    send(
        GatewayConfig::default(),
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn vary(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::VARY)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_bypasses_prefixing() {
    let response = get("/__health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint_bypasses_prefixing() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = server(GatewayConfig::default()).with_metrics(handle).build_router();

    let response = app
        .oneshot(Request::builder().uri("/__metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_miscased_lang_is_permanent_redirect() {
    let response = get("/en-us/firefox/").await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/en-US/firefox/");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=31536000");
    assert!(vary(&response).is_empty());
}

#[tokio::test]
async fn test_default_lang_redirect_varies_on_accept_language() {
    let response = get("/firefox/whatever/").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/en-US/firefox/whatever/");
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    assert_eq!(vary(&response), vec!["accept-language"]);

    let request = Request::builder()
        .uri("/firefox/whatever/")
        .header(header::ACCEPT_LANGUAGE, "de")
        .body(Body::empty())
        .unwrap();
    let response = send(GatewayConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/de/firefox/whatever/");
    assert_eq!(vary(&response), vec!["accept-language"]);
}

#[tokio::test]
async fn test_query_string_survives_redirect() {
    let response = get("/en-us/firefox/?src=home&q=a%20b").await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/en-US/firefox/?src=home&q=a%20b");
}

#[tokio::test]
async fn test_root_negotiates_from_headers() {
    let request = Request::builder()
        .uri("/")
        .header(header::ACCEPT_LANGUAGE, "de,en;q=0.5")
        .body(Body::empty())
        .unwrap();
    let response = send(GatewayConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/de/firefox/");
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());
    assert_eq!(vary(&response), vec!["accept-language", "user-agent"]);
}

#[tokio::test]
async fn test_android_user_agent_picks_android() {
    let request = Request::builder()
        .uri("/en-US/")
        .header(header::USER_AGENT, ANDROID_UA)
        .body(Body::empty())
        .unwrap();
    let response = send(GatewayConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/en-US/android/");
    assert_eq!(vary(&response), vec!["user-agent"]);
}

#[tokio::test]
async fn test_canonical_path_reaches_handler() {
    let request = Request::builder()
        .uri("/en-US/firefox/")
        .header(header::USER_AGENT, ANDROID_UA)
        .body(Body::empty())
        .unwrap();
    let response = send(GatewayConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(vary(&response).is_empty());
    assert_eq!(
        json_body(response).await,
        json!({
            "lang": "en-US",
            "client_app": "firefox",
            "direction": "ltr",
            "user_agent": ANDROID_UA,
        })
    );
}

#[tokio::test]
async fn test_rtl_lang_sets_direction() {
    let response = get("/ar/android/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["lang"], "ar");
    assert_eq!(body["client_app"], "android");
    assert_eq!(body["direction"], "rtl");
}

#[tokio::test]
async fn test_served_exception_passes_through_with_sniffed_app() {
    let response = get("/en-US/about").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(vary(&response), vec!["user-agent"]);
    assert_eq!(json_body(response).await["client_app"], "firefox");
}

#[tokio::test]
async fn test_unserved_exception_is_not_found() {
    let response = get("/en-US/developers/").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_locale_exception_gets_client_app() {
    let response = get("/downloads/file/1234/addon.xpi").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/firefox/downloads/file/1234/addon.xpi");
    assert_eq!(vary(&response), vec!["user-agent"]);
}

#[tokio::test]
async fn test_missing_trailing_slash_is_added() {
    let response = get("/en-US/firefox/addon/tab-mix?src=search").await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/en-US/firefox/addon/tab-mix/?src=search");
}

#[tokio::test]
async fn test_trailing_slash_exception_is_served() {
    let response = get("/en-US/firefox/search").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_trailing_slash_can_be_disabled() {
    let config = GatewayConfig {
        enforce_trailing_slash: false,
        ..GatewayConfig::default()
    };
    let request = Request::builder()
        .uri("/en-US/firefox/addon/tab-mix")
        .body(Body::empty())
        .unwrap();
    let response = send(config, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redirect_target_is_stable() {
    let first = get("/pt/firefox/addon/tab-mix/").await;
    assert_eq!(first.status(), StatusCode::MOVED_PERMANENTLY);
    let target = location(&first).to_string();
    assert_eq!(target, "/pt-PT/firefox/addon/tab-mix/");

    let second = get(&target).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await["lang"], "pt-PT");
}
