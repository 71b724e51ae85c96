//! TTS Adapter - 语音合成引擎实现
//!
//! - piper: ONNX Runtime 进程内推理，espeak-ng 音素化
//! - fake: 正弦音测试引擎
//! - device: CUDA 检测

mod device;
mod fake_tts_client;
mod piper_engine;

pub use device::{acceleration_info, CudaPreference};
pub use fake_tts_client::{FakeEngineLoader, FakeModelStore, FakeSpeechEngine, FakeTtsConfig};
pub use piper_engine::{PiperConfig, PiperEngine, PiperEngineLoader};
