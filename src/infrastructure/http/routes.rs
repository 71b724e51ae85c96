//! HTTP Routes
//!
//! API Endpoints:
//! - /api, /api/ping          GET     服务名与版本
//! - /health                  GET     服务状态与硬件加速信息
//! - /voices                  GET     音色目录
//! - /voices/:voice_id        GET     音色详情
//! - /convert                 POST    Markdown 转音频
//! - /download/:conversion_id GET     下载音频
//! - /status/:conversion_id   GET     查询转换状态
//! - /history                 GET     转换历史（limit/offset）
//! - /history/:conversion_id  DELETE  删除历史记录及音频

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health))
        .route("/voices", get(handlers::list_voices))
        .route("/voices/:voice_id", get(handlers::get_voice))
        .route("/convert", post(handlers::convert))
        .route("/download/:conversion_id", get(handlers::download))
        .route("/status/:conversion_id", get(handlers::conversion_status))
        .route("/history", get(handlers::list_history))
        .route("/history/:conversion_id", delete(handlers::delete_history))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ping))
        .route("/ping", get(handlers::ping))
}
