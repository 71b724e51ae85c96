//! Conversion HTTP Handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::application::{ConvertMarkdown, GetArtifact};
use crate::domain::conversion::ArtifactFormat;
use crate::infrastructure::http::dto::{download_url, ApiResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub markdown_text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub conversion_id: String,
    pub status: &'static str,
    pub message: &'static str,
    pub download_url: String,
    pub format: ArtifactFormat,
    pub file_size: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub conversion_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Markdown 转音频
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<ApiResponse<ConvertResponse>>, ApiError> {
    let command = ConvertMarkdown {
        markdown_text: req.markdown_text,
        title: req.title,
        voice_id: req.voice_id,
    };

    let result = state.convert_handler.handle(command).await?;
    let conversion_id = result.conversion_id.to_string();

    let message = if result.fallback {
        "Conversion successful (uncompressed audio)"
    } else {
        "Conversion successful"
    };

    Ok(Json(ApiResponse::success(ConvertResponse {
        download_url: download_url(&conversion_id),
        conversion_id,
        status: "completed",
        message,
        format: result.format,
        file_size: result.byte_size,
    })))
}

/// 查询转换状态（以产物文件是否存在为准）
pub async fn conversion_status(
    State(state): State<Arc<AppState>>,
    Path(conversion_id): Path<String>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    let artifact = state
        .get_artifact_handler
        .handle(GetArtifact {
            conversion_id: conversion_id.clone(),
        })
        .await?;

    let response = match artifact {
        Some(artifact) => StatusResponse {
            download_url: Some(download_url(&conversion_id)),
            conversion_id,
            status: "completed",
            file_size: Some(artifact.byte_size),
            message: None,
        },
        None => StatusResponse {
            conversion_id,
            status: "not_found",
            file_size: None,
            download_url: None,
            message: Some("Conversion not found or expired"),
        },
    };

    Ok(Json(ApiResponse::success(response)))
}

/// 下载音频（流式返回文件内容）
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(conversion_id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact = state
        .get_artifact_handler
        .handle(GetArtifact {
            conversion_id: conversion_id.clone(),
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("Audio file not found".to_string()))?;

    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to open audio file: {}", e)))?;

    let file_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to get file metadata: {}", e)))?
        .len();

    tracing::debug!(
        conversion_id = %conversion_id,
        path = %artifact.path.display(),
        file_size,
        "Serving audio file"
    );

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.format.content_type())
        .header(header::CONTENT_LENGTH, file_size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name()),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}
