use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

use crate::{
    AppState,
    db::{MovieExt, MovieListQuery},
    dtos::{
        ApiResponse, CreateMovieDto, FilterMovieDto, MovieQueryDto, PaginationDto,
        PopulatedMovieDto, UpdateMovieDto,
    },
    error::ApiError,
    middleware::{JWTAuthMiddleware, OptionalAuth, auth, optional_auth},
    models::UserRole,
    utils::query::{clamp_limit, clamp_page, parse_object_id},
};

const DEFAULT_MOVIE_PAGE_SIZE: i64 = 24;

pub fn movie_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_movies)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), optional_auth)),
        )
        .route(
            "/",
            post(create_movie)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{movie_id}", get(get_movie))
        .route(
            "/{movie_id}",
            axum::routing::put(update_movie)
                .delete(delete_movie)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
        .route("/actor/{actor_id}", get(get_movies_by_actor))
}

#[instrument(skip(app_state, params, identity))]
pub async fn get_movies(
    Query(params): Query<MovieQueryDto>,
    State(app_state): State<AppState>,
    Extension(identity): Extension<OptionalAuth>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, DEFAULT_MOVIE_PAGE_SIZE);

    let owner = if params.mine.unwrap_or(false) {
        let jwt = identity
            .0
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("Log in to list your own movies".to_string()))?;
        Some(jwt.user_id)
    } else {
        None
    };

    let query = MovieListQuery {
        search: params.search,
        year: params.year,
        genre: params.genre,
        director: params.director,
        owner,
        sort: params.sort,
        order: params.order,
        page,
        limit,
    };

    if params.random.unwrap_or(false) {
        // Sampling ignores sort and pagination; it draws at most `limit`
        // movies from the filtered pool.
        let movies = app_state.db_client.sample_movies(&query, limit).await?;
        let data: Vec<PopulatedMovieDto> = movies
            .iter()
            .map(PopulatedMovieDto::from_populated)
            .collect();
        return Ok(Json(ApiResponse::ok("Movies fetched successfully", data)).into_response());
    }

    let (movies, total) = app_state.db_client.get_movies(&query).await?;
    let response = Json(ApiResponse::ok_paginated(
        "Movies fetched successfully",
        FilterMovieDto::filter_movies(&movies),
        PaginationDto::new(page, limit, total),
    ));
    Ok(response.into_response())
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

#[instrument(skip(app_state, params))]
pub async fn get_movies_by_actor(
    Path(actor_id): Path<String>,
    Query(params): Query<MovieQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let actor_id = parse_object_id(&actor_id, "actor")?;
    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, DEFAULT_MOVIE_PAGE_SIZE);

    let (movies, total) = app_state
        .db_client
        .get_movies_by_actor(actor_id, page, limit)
        .await?;

    Ok(Json(ApiResponse::ok_paginated(
        "Movies fetched successfully",
        FilterMovieDto::filter_movies(&movies),
        PaginationDto::new(page, limit, total),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, title = %body.title))]
pub async fn create_movie(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<CreateMovieDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let movie = app_state.db_client.create_movie(body, jwt.user_id).await?;

    tracing::info!(movie_id = %movie.id.map(|id| id.to_hex()).unwrap_or_default(), "Movie created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Movie created successfully",
            FilterMovieDto::filter_movie(&movie),
        )),
    ))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, movie_id = %movie_id))]
pub async fn update_movie(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateMovieDto>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let movie_id = parse_object_id(&movie_id, "movie")?;
    // Admins mutate any movie; everyone else only their own.
    let owner = match jwt.user.role {
        UserRole::Admin => None,
        UserRole::User => Some(jwt.user_id),
    };

    let movie = app_state
        .db_client
        .update_movie(movie_id, body, owner, jwt.user_id)
        .await?;

    Ok(Json(ApiResponse::ok(
        "Movie updated successfully",
        FilterMovieDto::filter_movie(&movie),
    )))
}

#[instrument(skip_all, fields(user_id = %jwt.user_id, movie_id = %movie_id))]
pub async fn delete_movie(
    Path(movie_id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let movie_id = parse_object_id(&movie_id, "movie")?;
    let owner = match jwt.user.role {
        UserRole::Admin => None,
        UserRole::User => Some(jwt.user_id),
    };

    app_state.db_client.delete_movie(movie_id, owner).await?;

    Ok(Json(ApiResponse::message_only("Movie deleted successfully")))
}
