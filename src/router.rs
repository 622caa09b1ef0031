use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    auth::Role,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit, require_role},
    routes,
};

// 管理员路由
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(routes::admin::list_users))
        .route(
            "/users/{user_id}/reset-password",
            post(routes::admin::reset_user_password),
        )
        .route(
            "/mentors",
            get(routes::admin::list_mentors).post(routes::admin::create_mentor),
        )
        .route(
            "/assignments",
            get(routes::admin::list_assignments).post(routes::admin::assign_mentor),
        )
        .route(
            "/assignments/{registration_number}",
            put(routes::admin::reassign_mentor).delete(routes::admin::unassign_mentor),
        )
        .route("/password-logs", get(routes::admin::list_password_logs))
        .route_layer(from_fn_with_state(Role::Admin, require_role))
}

// 导师路由
fn mentor_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(routes::mentor::dashboard))
        .route(
            "/students",
            get(routes::mentor::list_students).post(routes::mentor::create_student),
        )
        .route(
            "/students/{registration_number}",
            get(routes::mentor::student_detail),
        )
        .route(
            "/students/{registration_number}/evaluations",
            get(routes::mentor::list_evaluations).post(routes::mentor::create_evaluation),
        )
        .route(
            "/students/{registration_number}/weekly-feedback",
            get(routes::mentor::list_weekly_feedback).post(routes::mentor::submit_weekly_feedback),
        )
        .route(
            "/students/{registration_number}/progress",
            get(routes::mentor::list_progress).put(routes::mentor::update_progress),
        )
        .route(
            "/students/{registration_number}/feedback",
            get(routes::mentor::list_mentor_feedback).post(routes::mentor::create_mentor_feedback),
        )
        .route(
            "/students/{registration_number}/internship",
            get(routes::mentor::get_internship),
        )
        .route(
            "/students/{registration_number}/internship/approval",
            put(routes::mentor::approve_internship),
        )
        .route(
            "/students/{registration_number}/reports",
            get(routes::mentor::list_reports),
        )
        .route(
            "/students/{registration_number}/reports/{report_id}/grade",
            put(routes::mentor::grade_report),
        )
        .route_layer(from_fn_with_state(Role::Mentor, require_role))
}

// 学生路由
fn student_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(routes::student::get_profile).put(routes::student::update_profile),
        )
        .route(
            "/parent",
            get(routes::student::get_parent)
                .post(routes::student::create_parent)
                .put(routes::student::update_parent),
        )
        .route("/evaluations", get(routes::student::list_evaluations))
        .route("/progress", get(routes::student::get_progress))
        .route(
            "/weekly-feedback",
            get(routes::student::list_weekly_feedback),
        )
        .route("/feedback", get(routes::student::list_mentor_feedback))
        .route(
            "/internship",
            get(routes::student::get_internship)
                .post(routes::student::submit_internship)
                .put(routes::student::update_internship),
        )
        .route(
            "/weekly-reports",
            get(routes::student::list_weekly_reports).post(routes::student::submit_weekly_report),
        )
        .route(
            "/reports",
            get(routes::student::list_reports).post(routes::student::submit_report),
        )
        .route_layer(from_fn_with_state(Role::Student, require_role))
}

/// 组装全部路由与中间件
pub fn build_router(state: AppState) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .route("/auth/reset-password", post(routes::auth::reset_password));

    // 需要认证的路由
    let protected_routes = Router::new()
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/verify/{role}", get(routes::auth::verify_role))
        .nest("/admin", admin_routes())
        .nest("/mentor", mentor_routes())
        .nest("/student", student_routes())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let routes = Router::new().merge(public_routes).merge(protected_routes);
    let router = if state.config.api_base_uri.is_empty() {
        routes
    } else {
        Router::new().nest(&state.config.api_base_uri, routes)
    };

    // 限流只在配置了 Redis 时启用
    let router = match &state.redis {
        Some(redis) => {
            let limiter = Arc::new(RateLimiter::new(
                redis.clone(),
                state.config.rate_limit_window(),
                state.config.rate_limit_requests,
            ));
            router.layer(from_fn_with_state(limiter, rate_limit))
        }
        None => router,
    };

    let router = router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn(log_errors)),
    );

    // 开发模式下允许所有来源
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
