//! 通过路由访问真实数据库，需要 Postgres：`DATABASE_URL=... cargo test -- --ignored`

mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use common::{bearer, mentor, student};
use internship_portal::{
    AppState, assignment::AssignmentRegistry, auth::Role, build_router, config::Config,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

fn app(pool: PgPool) -> Router {
    let config = Config {
        bcrypt_cost: 4,
        ..Config::default()
    };
    build_router(AppState::new(pool, config, None))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, token);
    }
    let body = match body {
        Some(json) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn other_mentor_cannot_read_evaluations(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = mentor(&mut conn, "a@staff.example", None).await;
    let b = mentor(&mut conn, "b@staff.example", None).await;
    student(&mut conn, "R100").await;
    AssignmentRegistry::assign(&mut conn, a.id, "R100").await.unwrap();
    drop(conn);

    let app = app(pool);
    let uri = "/mentor/students/R100/evaluations";
    let token_a = bearer(a.user_id, Role::Mentor);
    let token_b = bearer(b.user_id, Role::Mentor);

    let (status, body) = send(&app, Method::GET, uri, Some(token_b.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 1003);
    assert_eq!(body["error"], "You are not assigned as a mentor to this student");

    let (status, _) = send(
        &app,
        Method::POST,
        uri,
        Some(token_b.as_str()),
        Some(json!({"evaluation_type": "midterm", "marks": 70.0})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, uri, Some(token_a.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(
        &app,
        Method::GET,
        "/mentor/students/R999/evaluations",
        Some(token_a.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn register_rejects_duplicates(pool: PgPool) {
    let app = app(pool);
    let payload = |email: &str, registration_number: &str| {
        json!({
            "email": email,
            "password": "secret123",
            "role": "student",
            "name": "Asha Rao",
            "registration_number": registration_number,
            "batch": "2025",
        })
    };

    let (status, body) = send(&app, Method::POST, "/auth/register", None, Some(payload("asha@students.example", "R100"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registration_number"], "R100");

    let (status, body) = send(&app, Method::POST, "/auth/register", None, Some(payload("ASHA@students.example", "R101"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 1001);
    assert_eq!(body["error"], "Email already registered");

    let (status, body) = send(&app, Method::POST, "/auth/register", None, Some(payload("other@students.example", "R100"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Registration number already exists");

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "asha@students.example", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "student");
    assert_eq!(body["registration_number"], "R100");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn parent_record_lifecycle(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let s = student(&mut conn, "R100").await;
    drop(conn);

    let app = app(pool);
    let token = bearer(s.user_id, Role::Student);
    let token = Some(token.as_str());

    let (status, _) = send(&app, Method::GET, "/student/parent", token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PUT, "/student/parent", token, Some(json!({"pin_code": "560001"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/student/parent",
        token,
        Some(json!({"father_name": "Ravi Rao", "father_is_professional": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["registration_number"], "R100");
    assert_eq!(body["father_is_professional"], true);
    assert_eq!(body["mother_is_home_maker"], false);

    let (status, body) = send(&app, Method::POST, "/student/parent", token, Some(json!({"mother_name": "Lata Rao"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Parent information already exists");

    let (status, body) = send(&app, Method::PUT, "/student/parent", token, Some(json!({"pin_code": "560001"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pin_code"], "560001");
    assert_eq!(body["father_name"], "Ravi Rao");

    let (status, body) = send(&app, Method::GET, "/student/parent", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pin_code"], "560001");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn profile_update_maintains_alumni_relation(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let s = student(&mut conn, "R100").await;
    drop(conn);

    let app = app(pool);
    let token = bearer(s.user_id, Role::Student);
    let token = Some(token.as_str());

    let (status, body) = send(
        &app,
        Method::PUT,
        "/student/profile",
        token,
        Some(json!({
            "section": "B",
            "has_alumni": true,
            "alumni_relation": {"alumni_name": "Kiran Rao", "relation_with_student": "Brother"},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["section"], "B");
    assert_eq!(body["alumni_relation"]["alumni_name"], "Kiran Rao");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/student/profile",
        token,
        Some(json!({"alumni_relation": {"alumni_batch": "2015"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alumni_relation"]["alumni_name"], "Kiran Rao");
    assert_eq!(body["alumni_relation"]["alumni_batch"], "2015");

    let (status, body) = send(&app, Method::GET, "/student/profile", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alumni_relation"]["relation_with_student"], "Brother");

    let (status, body) = send(&app, Method::PUT, "/student/profile", token, Some(json!({"has_alumni": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alumni_relation"], Value::Null);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/student/profile",
        token,
        Some(json!({"has_alumni": false, "alumni_relation": {"alumni_name": "X"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
