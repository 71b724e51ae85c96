//! History HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{DeleteConversion, HistoryItemResponse, ListHistory};
use crate::domain::conversion::JobStatus;
use crate::infrastructure::http::dto::{download_url, ApiResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryItemDto {
    pub id: Uuid,
    pub title: Option<String>,
    pub text_preview: String,
    pub voice_id: Option<String>,
    pub status: JobStatus,
    pub file_size: Option<u64>,
    pub download_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl From<HistoryItemResponse> for HistoryItemDto {
    fn from(item: HistoryItemResponse) -> Self {
        let download_url = (item.status == JobStatus::Completed)
            .then(|| download_url(&item.id.to_string()));

        Self {
            id: item.id,
            title: item.title,
            text_preview: item.text_preview,
            voice_id: item.voice_id,
            status: item.status,
            file_size: item.file_size,
            download_url,
            error_message: item.error_message,
            created_at: item.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryListDto {
    pub items: Vec<HistoryItemDto>,
}

#[derive(Debug, Serialize)]
pub struct DeleteHistoryDto {
    pub message: &'static str,
    pub file_deleted: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// 转换历史，按创建时间倒序
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryListDto>>, ApiError> {
    let defaults = ListHistory::default();
    let query = ListHistory {
        limit: params.limit.unwrap_or(defaults.limit),
        offset: params.offset.unwrap_or(defaults.offset),
    };

    let items = state.list_history_handler.handle(query).await?;

    Ok(Json(ApiResponse::success(HistoryListDto {
        items: items.into_iter().map(HistoryItemDto::from).collect(),
    })))
}

/// 删除历史记录及其音频文件
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Path(conversion_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteHistoryDto>>, ApiError> {
    let conversion_id = Uuid::parse_str(&conversion_id)
        .map_err(|_| ApiError::NotFound("Conversion not found".to_string()))?;

    let result = state
        .delete_conversion_handler
        .handle(DeleteConversion { conversion_id })
        .await?;

    Ok(Json(ApiResponse::success(DeleteHistoryDto {
        message: "Conversion deleted successfully",
        file_deleted: result.file_deleted,
    })))
}
