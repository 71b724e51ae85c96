//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod conversion_handlers;

pub use conversion_handlers::*;
