//! Settings Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{ApplicationError, ReaderRequest, ReaderSettings};
use crate::infrastructure::http::dto::{ApiResponse, SaveSettingsRequest};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ReaderSettings>>, ApiError> {
    let settings = state
        .settings
        .get_settings()
        .await
        .map_err(ApplicationError::from)?;
    Ok(Json(ApiResponse::success(settings)))
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveSettingsRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let response = state
        .transport
        .dispatch(ReaderRequest::SaveSettings {
            voice: req.voice,
            speed: req.speed,
        })
        .await;

    if !response.is_success() {
        return Err(ApiError::BadRequest(response.error.unwrap_or_default()));
    }
    Ok(Json(ApiResponse::success(
        response.data.unwrap_or(serde_json::Value::Null),
    )))
}
