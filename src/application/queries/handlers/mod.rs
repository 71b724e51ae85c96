//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod conversion_handlers;
mod voice_handlers;

pub use conversion_handlers::*;
pub use voice_handlers::*;
