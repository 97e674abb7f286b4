use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::oid::ObjectId;

use crate::{
    AppState,
    db::UserExt,
    error::{ApiError, ErrorMessage},
    models::{User, UserRole},
    utils::token,
};

/// Inserted into request extensions after successful authentication.
#[derive(Debug, Clone)]
pub struct JWTAuthMiddleware {
    pub user_id: ObjectId,
    pub user: User,
}

/// Identity resolved when a valid token happens to be present; never blocks.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<JWTAuthMiddleware>);

fn extract_token(cookie_jar: &CookieJar, req: &Request) -> Option<String> {
    // Cookie first (browser clients), then the Authorization header.
    cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })
}

async fn resolve_user(app_state: &AppState, token: &str) -> Result<JWTAuthMiddleware, ApiError> {
    let user_id = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    // The token carries only the user id; everything else comes from the
    // live record so deletions and role changes take effect immediately.
    let user_id = ObjectId::parse_str(&user_id)
        .map_err(|_| ApiError::Unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user = app_state
        .db_client
        .get_user_by_id(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized(ErrorMessage::UserNoLongerExists.to_string()))?;

    let user =
        user.ok_or_else(|| ApiError::Unauthorized(ErrorMessage::UserNoLongerExists.to_string()))?;

    Ok(JWTAuthMiddleware { user_id, user })
}

/// Require a valid token and a still-existing user.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(&cookie_jar, &req)
        .ok_or_else(|| ApiError::Unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let auth = resolve_user(&app_state, &token).await?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// Admin gate: must follow `auth`. Requires the admin role on an active
/// account.
pub async fn admin_gate(req: Request, next: Next) -> Result<impl IntoResponse, ApiError> {
    let auth = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| ApiError::Unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    if auth.user.role != UserRole::Admin {
        return Err(ApiError::Forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }
    if !auth.user.is_active {
        return Err(ApiError::Forbidden(
            ErrorMessage::AccountDeactivated.to_string(),
        ));
    }

    Ok(next.run(req).await)
}

/// Resolve identity when a token is present, but let anonymous requests
/// through untouched. Used by endpoints that personalize for logged-in users.
pub async fn optional_auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> impl IntoResponse {
    let auth = match extract_token(&cookie_jar, &req) {
        Some(token) => resolve_user(&app_state, &token).await.ok(),
        None => None,
    };

    req.extensions_mut().insert(OptionalAuth(auth));
    next.run(req).await
}
