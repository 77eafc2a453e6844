//! Router-level tests that don't need a live database.
//!
//! The app is built against a lazily-connected pool pointed at nothing;
//! every request here is answered before any query runs (health banner,
//! auth rejections, input validation), which is exactly the surface worth
//! pinning without infrastructure.

use std::net::IpAddr;
use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::util::ServiceExt;

use tunila_core::UserId;
use tunila_server::config::{EmailConfig, KhaltiConfig, RecommenderConfig, ServerConfig};
use tunila_server::services::auth::AuthService;
use tunila_server::state::AppState;

fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://127.0.0.1:1/tunila_unreachable"),
        host: "127.0.0.1".parse::<IpAddr>().expect("valid ip"),
        port: 4000,
        frontend_url: "https://tunila.netlify.app".to_string(),
        cors_allowed_origins: vec!["https://tunila.netlify.app".to_string()],
        jwt_secret: SecretString::from("kQ9!vR2@mX7#bT4$cW8%nZ1^aL5&dJ3*"),
        uploads_dir: PathBuf::from("./uploads"),
        khalti: KhaltiConfig {
            secret_key: SecretString::from("kH4!tQ8@wE2#rT6$yU0%iO9^pA3&sD7*"),
            base_url: "https://a.khalti.com/api/v2".to_string(),
        },
        recommender: RecommenderConfig {
            base_url: "http://127.0.0.1:5000".to_string(),
        },
        email: EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_username: "noreply@tunila.app".to_string(),
            smtp_password: SecretString::from("mail-pass"),
            from_address: "noreply@tunila.app".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

fn test_app() -> (Router, ServerConfig) {
    let config = test_config();
    let pool =
        tunila_server::db::create_pool_lazy(&config.database_url).expect("lazy pool");
    let state = AppState::new(config.clone(), pool).expect("app state");
    (tunila_server::app(state), config)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn banner_and_health_respond() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_cookie_is_401() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/merch/wishlist/my-items")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().expect("message").contains("Login again"));
}

#[tokio::test]
async fn garbage_token_is_401() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/auth/is-auth")
                .header(header::COOKIE, "token=not.a.jwt")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn valid_token_passes_the_session_probe() {
    let (app, config) = test_app();

    let pool = tunila_server::db::create_pool_lazy(&config.database_url).expect("pool");
    let token = AuthService::new(&pool, &config.jwt_secret)
        .issue_token(UserId::new(42))
        .expect("token");

    let response = app
        .oneshot(
            Request::get("/api/auth/is-auth")
                .header(header::COOKIE, format!("token={token}"))
                .header("x-forwarded-for", "203.0.113.8")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::post("/api/auth/logout")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie");
    assert!(set_cookie.starts_with("token=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn search_requires_a_query() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/search?q=")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Search query required");
}

#[tokio::test]
async fn payment_verify_requires_pidx() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/merch/payment/verify")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Payment ID is required");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::get("/api/nope")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_preflight_allows_the_frontend() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/songs")
                .header(header::ORIGIN, "https://tunila.netlify.app")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("allow-origin header");
    assert_eq!(allowed, "https://tunila.netlify.app");
}
