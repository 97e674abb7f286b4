use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use mongodb::bson::oid::ObjectId;
use validator::Validate;

use crate::{
    AppState,
    db::MasterEntity,
    dtos::{ApiResponse, ListQueryDto, PaginationDto},
    error::ApiError,
    middleware::{JWTAuthMiddleware, auth},
    models::{Actor, Director, Genre, Writer},
    utils::query::{clamp_limit, clamp_page, parse_object_id},
};

const DEFAULT_PAGE_SIZE: i64 = 10;

/// `/api/master-data`: owner-scoped CRUD per entity, with public read-only
/// variants under `/public`. The four collections share one set of generic
/// handlers, instantiated here.
pub fn master_data_handler(app_state: AppState) -> Router<AppState> {
    let public = Router::new()
        .nest("/actors", public_entity_routes::<Actor>())
        .nest("/directors", public_entity_routes::<Director>())
        .nest("/writers", public_entity_routes::<Writer>())
        .nest("/genres", public_entity_routes::<Genre>());

    Router::new()
        .nest("/public", public)
        .nest("/actors", scoped_entity_routes::<Actor>(app_state.clone()))
        .nest("/directors", scoped_entity_routes::<Director>(app_state.clone()))
        .nest("/writers", scoped_entity_routes::<Writer>(app_state.clone()))
        .nest("/genres", scoped_entity_routes::<Genre>(app_state))
}

/// Global-scope CRUD mounted under `/api/admin/master-data`; the admin router
/// supplies the auth and role layers.
pub fn admin_master_data_routes() -> Router<AppState> {
    Router::new()
        .nest("/actors", admin_entity_routes::<Actor>())
        .nest("/directors", admin_entity_routes::<Director>())
        .nest("/writers", admin_entity_routes::<Writer>())
        .nest("/genres", admin_entity_routes::<Genre>())
}

fn scoped_entity_routes<T: MasterEntity>(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_owned::<T>).post(create_record::<T>))
        .route(
            "/{id}",
            get(get_owned::<T>)
                .put(update_owned::<T>)
                .delete(delete_owned::<T>),
        )
        .layer(middleware::from_fn_with_state(app_state, auth))
}

fn public_entity_routes<T: MasterEntity>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<T>))
        .route("/{id}", get(get_all::<T>))
}

fn admin_entity_routes<T: MasterEntity>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<T>).post(create_record::<T>))
        .route(
            "/{id}",
            get(get_all::<T>)
                .put(update_admin::<T>)
                .delete(delete_admin::<T>),
        )
}

async fn list_impl<T: MasterEntity>(
    params: ListQueryDto,
    app_state: AppState,
    owner: Option<ObjectId>,
) -> Result<impl IntoResponse, ApiError> {
    params
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let page = clamp_page(params.page);
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE);

    let (items, total) = app_state
        .db_client
        .master::<T>()
        .list(
            params.search.as_deref(),
            params.sort.as_deref(),
            params.order.as_deref(),
            page,
            limit,
            owner,
        )
        .await?;

    let data: Vec<T::Response> = items.iter().map(|item| item.response()).collect();

    Ok(Json(ApiResponse::ok_paginated(
        format!("{}s fetched successfully", T::DISPLAY),
        data,
        PaginationDto::new(page, limit, total),
    )))
}

pub async fn list_owned<T: MasterEntity>(
    Query(params): Query<ListQueryDto>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    list_impl::<T>(params, app_state, Some(jwt.user_id)).await
}

pub async fn list_all<T: MasterEntity>(
    Query(params): Query<ListQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    list_impl::<T>(params, app_state, None).await
}

async fn get_impl<T: MasterEntity>(
    id: String,
    app_state: AppState,
    owner: Option<ObjectId>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_object_id(&id, &T::DISPLAY.to_lowercase())?;
    let item = app_state.db_client.master::<T>().get(id, owner).await?;

    Ok(Json(ApiResponse::ok(
        format!("{} fetched successfully", T::DISPLAY),
        item.response(),
    )))
}

pub async fn get_owned<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    get_impl::<T>(id, app_state, Some(jwt.user_id)).await
}

pub async fn get_all<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    get_impl::<T>(id, app_state, None).await
}

/// Create is shared: records are stamped with the acting user, admin or not.
pub async fn create_record<T: MasterEntity>(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<T::CreateInput>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let item = app_state
        .db_client
        .master::<T>()
        .create(body, jwt.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            format!("{} created successfully", T::DISPLAY),
            item.response(),
        )),
    ))
}

async fn update_impl<T: MasterEntity>(
    id: String,
    body: T::UpdateInput,
    app_state: AppState,
    owner: Option<ObjectId>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let id = parse_object_id(&id, &T::DISPLAY.to_lowercase())?;
    let item = app_state
        .db_client
        .master::<T>()
        .update(id, &body, owner)
        .await?;

    Ok(Json(ApiResponse::ok(
        format!("{} updated successfully", T::DISPLAY),
        item.response(),
    )))
}

pub async fn update_owned<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<T::UpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    update_impl::<T>(id, body, app_state, Some(jwt.user_id)).await
}

pub async fn update_admin<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<T::UpdateInput>,
) -> Result<impl IntoResponse, ApiError> {
    update_impl::<T>(id, body, app_state, None).await
}

pub async fn delete_owned<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_object_id(&id, &T::DISPLAY.to_lowercase())?;
    app_state
        .db_client
        .master::<T>()
        .delete(id, Some(jwt.user_id))
        .await?;

    Ok(Json(ApiResponse::message_only(format!(
        "{} deleted successfully",
        T::DISPLAY
    ))))
}

pub async fn delete_admin<T: MasterEntity>(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_object_id(&id, &T::DISPLAY.to_lowercase())?;
    app_state.db_client.master::<T>().delete(id, None).await?;

    Ok(Json(ApiResponse::message_only(format!(
        "{} deleted successfully",
        T::DISPLAY
    ))))
}
