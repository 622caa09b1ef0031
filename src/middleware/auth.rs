use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{
    AppState,
    auth::{Identity, ParsedToken, Role, TokenError},
    error::AppError,
};

/// 解析请求令牌并把调用方身份写入请求扩展。
///
/// 未开启开发身份回退时，缺失、无法解析或不含角色的令牌一律返回 401。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let parsed = match bearer_token(req.headers()) {
        Some(token) => state.codec.parse(&token),
        None => Err(TokenError::Missing),
    };

    let identity = match &state.dev_identity {
        Some(provider) => provider.resolve(parsed),
        None => match parsed? {
            ParsedToken::Identity(identity) => identity,
            ParsedToken::BareId(_) => return Err(TokenError::MissingRole.into()),
        },
    };

    tracing::debug!(
        user_id = identity.user_id,
        role = %identity.role,
        session_id = %identity.session_id,
        "Authenticated request"
    );
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// 角色门禁，需放在 `auth_middleware` 之内
pub async fn require_role(
    State(expected): State<Role>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let actual = req
        .extensions()
        .get::<Identity>()
        .map(|identity| identity.role)
        .ok_or_else(|| AppError::Authentication(TokenError::Missing.to_string()))?;

    if actual != expected {
        tracing::warn!(%expected, %actual, path = %req.uri().path(), "Role check failed");
        return Err(AppError::RoleMismatch { expected, actual });
    }

    Ok(next.run(req).await)
}

/// 优先按 `Bearer` 解析，否则接受不带前缀的原始值
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
