use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{MovieExt, ReviewExt},
    dtos::{
        ApiResponse, CreateReviewDto, FilterReviewDto, LikeResultDto, PaginationDto,
        ReportReviewDto, ReviewDto, ReviewQueryDto, UpdateReviewDto,
    },
    error::ApiError,
    middleware::{JWTAuthMiddleware, auth},
    utils::query::{clamp_limit, clamp_page, parse_object_id},
};

pub fn review_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/movie/{movie_id}", get(get_movie_reviews))
        .route(
            "/",
            post(create_review)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}",
            put(update_review)
                .delete(delete_review)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}/like",
            post(toggle_like).route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{review_id}/report",
            post(report_review).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

#[instrument(skip(app_state, params))]
pub async fn get_movie_reviews(
    Path(movie_id): Path<String>,
    Query(params): Query<ReviewQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let movie_id = parse_object_id(&movie_id, "movie")?;
    if app_state.db_client.get_movie(movie_id).await?.is_none() {
        return Err(ApiError::NotFound("Movie not found".to_string()));
    }

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, 10);

    let (reviews, total) = app_state
        .db_client
        .get_movie_reviews(
            movie_id,
            page,
            limit,
            params.sort.as_deref(),
            params.order.as_deref(),
        )
        .await?;

    let data: Vec<ReviewDto> = reviews.iter().map(ReviewDto::from_joined).collect();

    Ok(Json(ApiResponse::ok_paginated(
        "Reviews fetched successfully",
        data,
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id))]
pub async fn create_review(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateReviewDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let movie_id = parse_object_id(&body.movie, "movie")?;
    let review = app_state
        .db_client
        .create_review(jwt.user_id, movie_id, body.rating, body.comment)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Review created successfully",
            FilterReviewDto::filter_review(&review),
        )),
    ))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, review_id = %review_id))]
pub async fn update_review(
    Path(review_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateReviewDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let review_id = parse_object_id(&review_id, "review")?;
    let review = app_state
        .db_client
        .update_review(review_id, jwt.user_id, body.rating, body.comment)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Review updated successfully",
        FilterReviewDto::filter_review(&review),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, review_id = %review_id))]
pub async fn delete_review(
    Path(review_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let review_id = parse_object_id(&review_id, "review")?;
    app_state
        .db_client
        .delete_review(review_id, Some(jwt.user_id))
        .await?;

    Ok(Json(ApiResponse::message_only(
        "Review deleted successfully",
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, review_id = %review_id))]
pub async fn toggle_like(
    Path(review_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let review_id = parse_object_id(&review_id, "review")?;
    let (liked, likes_count) = app_state
        .db_client
        .toggle_like(review_id, jwt.user_id)
        .await?;

    let message = if liked { "Review liked" } else { "Review unliked" };
    Ok(Json(ApiResponse::ok(
        message,
        LikeResultDto { liked, likes_count },
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, review_id = %review_id))]
pub async fn report_review(
    Path(review_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<ReportReviewDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let review_id = parse_object_id(&review_id, "review")?;
    app_state
        .db_client
        .report_review(review_id, jwt.user_id, &body.reason)
        .await?;

    Ok(Json(ApiResponse::message_only(
        "Review reported successfully",
    )))
}
