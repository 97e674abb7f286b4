use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::UserExt,
    dtos::{ApiResponse, FilterUserDto, LoginDataDto, LoginDto, SignupDto},
    error::{ApiError, ErrorMessage},
    utils::{password, token},
};

pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn issue_token(app_state: &AppState, user_id: &str) -> Result<String, ApiError> {
    token::create_token(
        user_id,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("token creation error: {}", e);
        ApiError::Internal(ErrorMessage::ServerError.to_string())
    })
}

fn token_cookie_headers(token: &str) -> Result<HeaderMap, ApiError> {
    let cookie = Cookie::build(("token", token))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| ApiError::Internal(ErrorMessage::ServerError.to_string()))?,
    );
    Ok(headers)
}

#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(body): Json<SignupDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let hashed = password::hash(&body.password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = app_state
        .db_client
        .save_user(&body.username, &body.email, &hashed)
        .await?;

    let user_dto = FilterUserDto::filter_user(&user);
    let token = issue_token(&app_state, &user_dto.id)?;
    let headers = token_cookie_headers(&token)?;

    tracing::info!(username = %body.username, "Signup successful");

    let response = Json(ApiResponse::ok(
        "Registration successful",
        LoginDataDto {
            token,
            user: user_dto,
        },
    ));
    let mut response = (StatusCode::CREATED, response).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = app_state
        .db_client
        .get_user_by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| ApiError::Unauthorized("Invalid email or password".to_string()))?;
    if !password_matched {
        tracing::warn!(email = %body.email, "Login failed: password mismatch");
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden(
            ErrorMessage::AccountDeactivated.to_string(),
        ));
    }

    let user_dto = FilterUserDto::filter_user(&user);
    if let Some(user_id) = user.id {
        app_state.db_client.update_last_login(user_id).await?;
    }

    let token = issue_token(&app_state, &user_dto.id)?;
    let headers = token_cookie_headers(&token)?;

    tracing::info!(email = %body.email, "Login successful");

    let response = Json(ApiResponse::ok(
        "Login successful",
        LoginDataDto {
            token,
            user: user_dto,
        },
    ));
    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}

#[instrument]
pub async fn logout() -> Result<impl IntoResponse, ApiError> {
    // Expire the cookie immediately; the token itself simply ages out.
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        header::HeaderValue::from_static("token=; Path=/; HttpOnly; Max-Age=0"),
    );

    let response = Json(ApiResponse::message_only("Logged out successfully"));
    let mut response = response.into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}
