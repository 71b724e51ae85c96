//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::queries::{GetVoice, ListVoices};
use crate::application::services::VoiceModelCache;
use crate::domain::voice::VoiceModel;

// ============================================================================
// Response DTOs
// ============================================================================

/// 音色详情
#[derive(Debug, Clone)]
pub struct VoiceResponse {
    pub voice: VoiceModel,
    /// 引擎是否已加载到内存
    pub loaded: bool,
}

/// 音色列表
#[derive(Debug, Clone)]
pub struct VoiceListResponse {
    pub voices: Vec<VoiceResponse>,
    pub default_voice: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetVoice Handler
pub struct GetVoiceHandler {
    cache: VoiceModelCache,
}

impl GetVoiceHandler {
    pub fn new(cache: VoiceModelCache) -> Self {
        Self { cache }
    }

    pub async fn handle(&self, query: GetVoice) -> Result<VoiceResponse, ApplicationError> {
        let voice = self
            .cache
            .catalog()
            .get_by_id(&query.voice_id)
            .map_err(|_| ApplicationError::not_found("Voice", query.voice_id.clone()))?;

        Ok(VoiceResponse {
            voice: voice.clone(),
            loaded: self.cache.is_loaded(&voice.id),
        })
    }
}

/// ListVoices Handler
pub struct ListVoicesHandler {
    cache: VoiceModelCache,
}

impl ListVoicesHandler {
    pub fn new(cache: VoiceModelCache) -> Self {
        Self { cache }
    }

    pub async fn handle(&self, _query: ListVoices) -> Result<VoiceListResponse, ApplicationError> {
        let catalog = self.cache.catalog();

        let voices = catalog
            .list()
            .iter()
            .map(|voice| VoiceResponse {
                voice: voice.clone(),
                loaded: self.cache.is_loaded(&voice.id),
            })
            .collect();

        Ok(VoiceListResponse {
            voices,
            default_voice: catalog.get_default().id.clone(),
        })
    }
}
