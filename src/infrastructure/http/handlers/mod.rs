//! HTTP Handlers

mod conversion;
mod health;
mod history;
mod ping;
mod voice;

pub use conversion::*;
pub use health::*;
pub use history::*;
pub use ping::*;
pub use voice::*;
