//! HTTP request handlers.

use super::AppState;
use crate::aggregate::RECENT_TICK_LIMIT;
use crate::db::{DbError, NewTick, NewWebsite, Store};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Status API
// ============================================================================

pub async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.coordinator.snapshot())
}

pub async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.coordinator.refresh_now().await;
    Json(state.coordinator.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct AddTargetRequest {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn handle_add_target(
    State(state): State<AppState>,
    Json(req): Json<AddTargetRequest>,
) -> impl IntoResponse {
    // Reject bad input before touching the datastore.
    if let Err(e) = NewWebsite::parse(&req.url, req.name.as_deref()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "added": false, "error": e.to_string() })),
        )
            .into_response();
    }

    match state.coordinator.try_add_target(&req.url, req.name.as_deref()).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "added": true, "id": id }))).into_response(),
        Err(error) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "added": false, "error": error })),
        )
            .into_response(),
    }
}

// ============================================================================
// Datastore API
// ============================================================================

/// Require `Authorization: Bearer <token>` when a token is configured.
pub async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(expected) = state.config.api_token.as_deref() {
        let provided = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if provided != Some(expected) {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    next.run(req).await
}

fn store(state: &AppState) -> Result<&Arc<Store>, Response> {
    state
        .store
        .as_ref()
        .ok_or_else(|| (StatusCode::SERVICE_UNAVAILABLE, "No local datastore").into_response())
}

fn db_error_response(e: DbError) -> Response {
    let status = match e {
        DbError::NotFound => StatusCode::NOT_FOUND,
        DbError::Duplicate(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string()).into_response()
}

pub async fn handle_get_websites(State(state): State<AppState>) -> impl IntoResponse {
    let store = match store(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.get_websites(RECENT_TICK_LIMIT) {
        Ok(websites) => Json(websites).into_response(),
        Err(e) => db_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWebsiteRequest {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn handle_create_website(
    State(state): State<AppState>,
    Json(req): Json<CreateWebsiteRequest>,
) -> impl IntoResponse {
    let store = match store(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let website = match NewWebsite::parse(&req.url, req.name.as_deref()) {
        Ok(w) => w,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match store.add_website(&website) {
        Ok(created) => {
            tracing::info!("Datastore: created website {} ({})", created.url, created.id);
            Json(json!({ "id": created.id })).into_response()
        }
        Err(e) => db_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct WebsiteQuery {
    #[serde(rename = "websiteId")]
    pub website_id: String,
}

pub async fn handle_get_website_status(
    State(state): State<AppState>,
    Query(query): Query<WebsiteQuery>,
) -> impl IntoResponse {
    let store = match store(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.get_website(&query.website_id, RECENT_TICK_LIMIT) {
        Ok(website) => Json(website).into_response(),
        Err(e) => db_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteWebsiteRequest {
    #[serde(rename = "websiteId")]
    pub website_id: String,
}

pub async fn handle_delete_website(
    State(state): State<AppState>,
    Json(req): Json<DeleteWebsiteRequest>,
) -> impl IntoResponse {
    let store = match store(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.disable_website(&req.website_id) {
        Ok(_) => Json(json!({ "message": "Deleted Website Successfully!" })).into_response(),
        Err(e) => db_error_response(e),
    }
}

pub async fn handle_add_ticks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(ticks): Json<Vec<NewTick>>,
) -> impl IntoResponse {
    let store = match store(&state) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match store.add_ticks(&id, &ticks) {
        Ok(inserted) => Json(json!({ "inserted": inserted })).into_response(),
        Err(e) => db_error_response(e),
    }
}
