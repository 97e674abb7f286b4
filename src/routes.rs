use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    dtos::ApiResponse,
    error::ErrorBody,
    handler::{
        admin::admin_handler, auth::auth_handler, master_data::master_data_handler,
        movie::movie_handler, review::review_handler, users::users_handler,
    },
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/movies", movie_handler(app_state.clone()))
        .nest("/master-data", master_data_handler(app_state.clone()))
        .nest("/user", users_handler(app_state.clone()))
        .nest("/reviews", review_handler(app_state.clone()))
        .nest("/admin", admin_handler(app_state.clone()))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route).fallback(not_found)
}

/// Liveness probe; no auth, no database round trip.
async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(
        "Service is healthy",
        json!({ "status": "ok" }),
    ))
}

/// Unmatched routes still answer with the standard envelope.
async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            success: false,
            message: "Route not found".to_string(),
        }),
    )
}
