use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{MovieExt, UserExt},
    dtos::{
        ApiResponse, FavoritesQueryDto, FilterUserDto, PaginationDto, PopulatedMovieDto,
        UpdatePasswordDto, UpdateProfileDto,
    },
    error::ApiError,
    middleware::{JWTAuthMiddleware, auth},
    utils::{
        password,
        query::{clamp_limit, clamp_page, parse_object_id},
    },
};

pub fn users_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).patch(update_profile))
        .route("/password", put(update_password))
        .route("/favorites", get(get_favorites))
        .route(
            "/favorites/{movie_id}",
            axum::routing::post(add_favorite).delete(remove_favorite),
        )
        .layer(middleware::from_fn_with_state(app_state, auth))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id))]
pub async fn get_profile(
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::ok(
        "Profile fetched successfully",
        FilterUserDto::filter_user(&jwt.user),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id))]
pub async fn update_profile(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = app_state
        .db_client
        .update_profile(
            jwt.user_id,
            body.username.as_deref(),
            body.email.as_deref(),
            body.profile_pic.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        FilterUserDto::filter_user(&user),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id))]
pub async fn update_password(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdatePasswordDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let matched = password::compare(&body.old_password, &jwt.user.password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if !matched {
        return Err(ApiError::BusinessRule("Old password is incorrect".to_string()));
    }

    let hashed = password::hash(&body.new_password)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    app_state
        .db_client
        .update_password(jwt.user_id, &hashed)
        .await?;

    Ok(Json(ApiResponse::message_only(
        "Password updated successfully",
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id))]
pub async fn get_favorites(
    Query(params): Query<FavoritesQueryDto>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, 24);

    let (movies, total) = app_state
        .db_client
        .get_favorite_movies(
            jwt.user_id,
            params.genre.as_deref(),
            params.year,
            params.sort.as_deref(),
            params.order.as_deref(),
            page,
            limit,
        )
        .await?;

    let data: Vec<PopulatedMovieDto> = movies
        .iter()
        .map(PopulatedMovieDto::from_populated)
        .collect();

    Ok(Json(ApiResponse::ok_paginated(
        "Favorites fetched successfully",
        data,
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, movie_id = %movie_id))]
pub async fn add_favorite(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let movie_id = parse_object_id(&movie_id, "movie")?;
    let user = app_state.db_client.add_favorite(jwt.user_id, movie_id).await?;

    Ok(Json(ApiResponse::ok(
        "Movie added to favorites",
        FilterUserDto::filter_user(&user),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, movie_id = %movie_id))]
pub async fn remove_favorite(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let movie_id = parse_object_id(&movie_id, "movie")?;
    let user = app_state
        .db_client
        .remove_favorite(jwt.user_id, movie_id)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Movie removed from favorites",
        FilterUserDto::filter_user(&user),
    )))
}
