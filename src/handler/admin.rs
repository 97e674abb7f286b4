use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use futures::future::join_all;
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{MovieExt, MovieListQuery, ReviewExt, StatsExt, UserExt},
    dtos::{
        AdminReviewQueryDto, AdminUpdateUserDto, AdminUserQueryDto, ApiResponse, BulkDeleteDto,
        BulkDeleteResultDto, FilterMovieDto, FilterReviewDto, FilterUserDto, MovieQueryDto,
        PaginationDto, UpdateMovieDto,
    },
    error::ApiError,
    middleware::{JWTAuthMiddleware, admin_gate, auth},
    utils::query::{clamp_limit, clamp_page, parse_object_id},
};

/// `/api/admin`: global-scope moderation surface. Every route sits behind
/// `auth` plus the admin gate (admin role on an active account).
pub fn admin_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(get_users))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/movies", get(get_movies))
        .route("/movies/bulk-delete", post(bulk_delete_movies))
        .route(
            "/movies/{movie_id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
        .route("/reviews", get(get_reviews))
        .route("/reviews/{review_id}", axum::routing::delete(delete_review))
        .route("/stats", get(get_stats))
        .nest(
            "/master-data",
            crate::handler::master_data::admin_master_data_routes(),
        )
        .layer(middleware::from_fn(admin_gate))
        .layer(middleware::from_fn_with_state(app_state, auth))
}

#[instrument(skip(app_state, params))]
pub async fn get_users(
    Query(params): Query<AdminUserQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, 10);

    let (users, total) = app_state
        .db_client
        .get_users(params.search.as_deref(), page, limit)
        .await?;

    Ok(Json(ApiResponse::ok_paginated(
        "Users fetched successfully",
        FilterUserDto::filter_users(&users),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip(app_state))]
pub async fn get_user(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let user = app_state
        .db_client
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "User fetched successfully",
        FilterUserDto::filter_user(&user),
    )))
}

#[instrument(skip(app_state, body))]
pub async fn update_user(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<AdminUpdateUserDto>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let user = app_state
        .db_client
        .admin_update_user(user_id, body.role, body.is_active)
        .await?;

    Ok(Json(ApiResponse::ok(
        "User updated successfully",
        FilterUserDto::filter_user(&user),
    )))
}

#[instrument(skip(app_state))]
pub async fn delete_user(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_object_id(&user_id, "user")?;
    app_state.db_client.delete_user_cascade(user_id).await?;

    tracing::info!(user_id = %user_id, "User deleted with owned movies and reviews");
    Ok(Json(ApiResponse::message_only("User deleted successfully")))
}

#[instrument(skip(app_state, params))]
pub async fn get_movies(
    Query(params): Query<MovieQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, 24);

    let query = MovieListQuery {
        search: params.search,
        year: params.year,
        genre: params.genre,
        director: params.director,
        owner: None,
        sort: params.sort,
        order: params.order,
        page,
        limit,
    };

    let (movies, total) = app_state.db_client.get_movies(&query).await?;

    Ok(Json(ApiResponse::ok_paginated(
        "Movies fetched successfully",
        FilterMovieDto::filter_movies(&movies),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip(app_state))]
pub async fn get_movie(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let movie_id = parse_object_id(&movie_id, "movie")?;
    let movie = app_state
        .db_client
        .get_movie(movie_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Movie not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Movie fetched successfully",
        FilterMovieDto::filter_movie(&movie),
    )))
}

#[instrument(skip_all, fields(admin_id = %jwt.user_id, movie_id = %movie_id))]
pub async fn update_movie(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateMovieDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let movie_id = parse_object_id(&movie_id, "movie")?;
    let movie = app_state
        .db_client
        .update_movie(movie_id, body, None, jwt.user_id)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Movie updated successfully",
        FilterMovieDto::filter_movie(&movie),
    )))
}

#[instrument(skip(app_state))]
pub async fn delete_movie(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let movie_id = parse_object_id(&movie_id, "movie")?;
    app_state.db_client.delete_movie(movie_id, None).await?;

    Ok(Json(ApiResponse::message_only("Movie deleted successfully")))
}

/// Per-item concurrent deletes with no batch atomicity: failures leave the
/// remaining items deleted and are reported back individually.
#[instrument(skip(app_state, body))]
pub async fn bulk_delete_movies(
    State(app_state): State<AppState>,
    Json(body): Json<BulkDeleteDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let deletions = body.ids.iter().map(|raw| {
        let db_client = app_state.db_client.clone();
        async move {
            let result = match parse_object_id(raw, "movie") {
                Ok(id) => db_client.delete_movie(id, None).await,
                Err(e) => Err(e),
            };
            (raw.clone(), result)
        }
    });

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (id, result) in join_all(deletions).await {
        match result {
            Ok(()) => deleted.push(id),
            Err(e) => {
                tracing::warn!(movie_id = %id, "bulk delete failed: {}", e);
                failed.push(id);
            }
        }
    }

    Ok(Json(ApiResponse::ok(
        format!("Deleted {} movie(s), {} failed", deleted.len(), failed.len()),
        BulkDeleteResultDto { deleted, failed },
    )))
}

#[instrument(skip(app_state, params))]
pub async fn get_reviews(
    Query(params): Query<AdminReviewQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, 10);

    let (reviews, total) = app_state
        .db_client
        .get_reviews_admin(params.reported.unwrap_or(false), page, limit)
        .await?;

    Ok(Json(ApiResponse::ok_paginated(
        "Reviews fetched successfully",
        FilterReviewDto::filter_reviews(&reviews),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip(app_state))]
pub async fn delete_review(
    Path(review_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let review_id = parse_object_id(&review_id, "review")?;
    app_state.db_client.delete_review(review_id, None).await?;

    Ok(Json(ApiResponse::message_only(
        "Review deleted successfully",
    )))
}

#[instrument(skip(app_state))]
pub async fn get_stats(State(app_state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state.db_client.get_stats().await?;

    Ok(Json(ApiResponse::ok(
        "Statistics fetched successfully",
        stats,
    )))
}
