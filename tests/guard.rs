use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use internship_portal::{AppState, build_router, config::Config};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

// 这些请求都在访问数据库之前结束，连接池不会真正建立连接
fn app(dev_identity_fallback: bool) -> Router {
    let config = Config {
        database_url: "postgres://localhost/internship_portal_test".into(),
        dev_identity_fallback,
        ..Config::default()
    };
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    build_router(AppState::new(pool, config, None))
}

async fn send(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, token);
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_is_public() {
    let (status, body) = send(app(false), "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let (status, body) = send(app(false), "/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_and_roleless_tokens_are_rejected() {
    for token in [
        "Bearer not-a-token",
        "Bearer 42",
        "Bearer token:abc:admin",
        "Bearer token:7:superuser:s1",
    ] {
        let (status, _) = send(app(false), "/auth/verify/admin", Some(token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token}");
    }
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let (status, body) = send(
        app(false),
        "/admin/users",
        Some("Bearer token:7:mentor:s1"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 1003);
    assert_eq!(body["error"], "Admin access required. Your role: mentor");

    let (status, body) = send(
        app(false),
        "/mentor/dashboard",
        Some("Bearer token:3:student"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Mentor access required. Your role: student");
}

#[tokio::test]
async fn verify_role_reports_identity() {
    let (status, body) = send(
        app(false),
        "/auth/verify/mentor",
        Some("Bearer token:7:mentor:s1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user_id"], 7);
    assert_eq!(body["role"], "mentor");
    assert_eq!(body["session_id"], "s1");

    let (status, _) = send(
        app(false),
        "/auth/verify/admin",
        Some("Bearer token:7:mentor:s1"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        app(false),
        "/auth/verify/superuser",
        Some("Bearer token:7:mentor:s1"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1000);
}

#[tokio::test]
async fn raw_header_without_bearer_prefix_is_accepted() {
    let (status, body) = send(
        app(false),
        "/auth/verify/student",
        Some("12:student"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 12);
    assert_eq!(body["session_id"], "default");
}

#[tokio::test]
async fn development_fallback_only_when_enabled() {
    let (status, _) = send(app(false), "/auth/verify/admin", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(app(true), "/auth/verify/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["session_id"], "default");

    // 裸用户ID在开发模式下获得管理员角色
    let (status, body) = send(app(true), "/auth/verify/admin", Some("Bearer 42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 42);

    // 完整令牌仍按原角色处理
    let (status, _) = send(
        app(true),
        "/admin/users",
        Some("Bearer token:7:student:s1"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = send(app(false), "/nope", Some("Bearer token:1:admin")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
