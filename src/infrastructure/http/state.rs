//! Application State
//!
//! 启动时构建一次，所有请求共享

use std::sync::Arc;

use crate::application::{
    // Command handlers
    ConvertMarkdownHandler, DeleteConversionHandler,
    // Query handlers
    GetArtifactHandler, GetVoiceHandler, ListHistoryHandler, ListVoicesHandler,
    // Ports / services
    CleanupRequest, CleanupSchedulerPort, HistoryRepositoryPort, TtsService, VoiceModelCache,
};

/// 应用状态
pub struct AppState {
    // ========== Services ==========
    pub tts_service: Arc<TtsService>,

    // ========== Command Handlers ==========
    pub convert_handler: ConvertMarkdownHandler,
    pub delete_conversion_handler: DeleteConversionHandler,

    // ========== Query Handlers ==========
    pub get_artifact_handler: GetArtifactHandler,
    pub list_history_handler: ListHistoryHandler,
    pub get_voice_handler: GetVoiceHandler,
    pub list_voices_handler: ListVoicesHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `cleanup_request` 为 `None` 时转换完成后不提交清理
    pub fn new(
        tts_service: Arc<TtsService>,
        history: Arc<dyn HistoryRepositoryPort>,
        cleanup: Arc<dyn CleanupSchedulerPort>,
        cleanup_request: Option<CleanupRequest>,
    ) -> Self {
        let cache = tts_service.cache().clone();

        Self {
            // Command handlers
            convert_handler: ConvertMarkdownHandler::new(
                tts_service.clone(),
                history.clone(),
                cleanup,
                cleanup_request,
            ),
            delete_conversion_handler: DeleteConversionHandler::new(
                tts_service.clone(),
                history.clone(),
            ),

            // Query handlers
            get_artifact_handler: GetArtifactHandler::new(tts_service.clone()),
            list_history_handler: ListHistoryHandler::new(history),
            get_voice_handler: GetVoiceHandler::new(cache.clone()),
            list_voices_handler: ListVoicesHandler::new(cache),

            tts_service,
        }
    }

    pub fn cache(&self) -> &VoiceModelCache {
        self.tts_service.cache()
    }
}
