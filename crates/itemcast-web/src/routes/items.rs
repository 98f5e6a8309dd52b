//! Item route handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use itemcast_db::ListParams;
use serde::Deserialize;
use serde_json::Value;

use super::{ok, ApiError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub content: Option<String>,
}

pub async fn create_item(
    State(state): State<AppState>,
    req: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = req.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let item = state.service.create(&req.name, &req.content)?;
    Ok((StatusCode::CREATED, ok(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let list = state.service.list(&params)?;
    Ok(ok(list))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = state.service.get(&id)?;
    Ok(ok(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = req.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let item = state
        .service
        .update(&id, req.name.as_deref(), req.content.as_deref())?;
    Ok(ok(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete(&id)?;
    Ok(ok(serde_json::json!({ "id": id })))
}
