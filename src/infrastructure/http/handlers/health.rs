//! Health Handler

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::{AccelerationInfo, StorageStats};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// 默认音色已加载时为 "ready"，否则为 "initializing"
    pub tts: &'static str,
    pub default_voice: String,
    pub loaded_voices: Vec<String>,
    pub acceleration: AccelerationInfo,
    /// 统计失败时为空
    pub storage: Option<StorageStats>,
}

/// 服务状态
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let cache = state.cache();
    let default_voice = cache.catalog().get_default().id.clone();

    let tts = if cache.is_loaded(&default_voice) {
        "ready"
    } else {
        "initializing"
    };

    let storage = match state.tts_service.storage_stats().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to collect storage stats");
            None
        }
    };

    Json(ApiResponse::success(HealthResponse {
        status: "healthy",
        tts,
        default_voice,
        loaded_voices: cache.loaded_voices(),
        acceleration: cache.acceleration().clone(),
        storage,
    }))
}
