//! Voice HTTP Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::application::{GetVoice, ListVoices, VoiceResponse};
use crate::domain::voice::{Gender, VoiceQuality};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VoiceDto {
    pub id: String,
    pub language: String,
    pub language_code: String,
    pub language_name: String,
    pub speaker: String,
    pub quality: VoiceQuality,
    pub gender: Option<Gender>,
    pub description: Option<String>,
    /// 引擎是否已在内存中
    pub loaded: bool,
}

impl From<VoiceResponse> for VoiceDto {
    fn from(response: VoiceResponse) -> Self {
        let voice = response.voice;
        Self {
            id: voice.id,
            language: voice.language,
            language_code: voice.language_code,
            language_name: voice.language_name,
            speaker: voice.speaker,
            quality: voice.quality,
            gender: voice.gender,
            description: voice.description,
            loaded: response.loaded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoiceListDto {
    pub voices: Vec<VoiceDto>,
    pub default_voice: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// 列出所有音色
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<VoiceListDto>>, ApiError> {
    let result = state.list_voices_handler.handle(ListVoices).await?;

    Ok(Json(ApiResponse::success(VoiceListDto {
        voices: result.voices.into_iter().map(VoiceDto::from).collect(),
        default_voice: result.default_voice,
    })))
}

/// 获取音色详情
pub async fn get_voice(
    State(state): State<Arc<AppState>>,
    Path(voice_id): Path<String>,
) -> Result<Json<ApiResponse<VoiceDto>>, ApiError> {
    let result = state.get_voice_handler.handle(GetVoice { voice_id }).await?;
    Ok(Json(ApiResponse::success(result.into())))
}
