//! Model Store Adapter - 音色模型下载

mod http_model_store;

pub use http_model_store::{HttpModelStore, HttpModelStoreConfig};
