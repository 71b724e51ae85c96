//! Piper Engine - 进程内 ONNX 推理
//!
//! 加载时构建 `ort::Session` 并解析 `.onnx.json` 元数据，权重损坏在加载阶段即失败。
//! 合成时经 espeak-ng 取 IPA 音素，按 `phoneme_id_map` 转成 id 后逐句推理。

use async_trait::async_trait;
use ndarray::Array2;
use ort::ep::{CPU as CPUExecutionProvider, CUDA as CUDAExecutionProvider};
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use crate::application::ports::{EngineLoader, ModelFiles, SpeechEngine, SynthesizedAudio, TtsError};
use crate::domain::voice::VoiceModel;

const PAD: char = '_';
const BOS: char = '^';
const EOS: char = '$';

/// 句间静音（秒）
const SENTENCE_SILENCE_SECS: f32 = 0.2;

/// Piper 配置
#[derive(Debug, Clone)]
pub struct PiperConfig {
    /// espeak-ng 可执行文件，用于音素化
    pub espeak_program: String,
    /// ONNX Runtime 线程数，0 表示使用默认值
    pub num_threads: usize,
    /// 优先注册 CUDA execution provider，不可用时退回 CPU
    pub use_cuda: bool,
}

impl Default for PiperConfig {
    fn default() -> Self {
        Self {
            espeak_program: "espeak-ng".to_string(),
            num_threads: 0,
            use_cuda: false,
        }
    }
}

/// 模型元数据中用到的字段
#[derive(Debug, Deserialize)]
struct PiperMetadata {
    audio: PiperAudio,
    #[serde(default)]
    espeak: Option<PiperEspeak>,
    #[serde(default)]
    inference: PiperInference,
    #[serde(default = "default_num_speakers")]
    num_speakers: u32,
    #[serde(default)]
    speaker_id_map: HashMap<String, i64>,
    phoneme_id_map: HashMap<String, Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct PiperAudio {
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct PiperEspeak {
    voice: String,
}

#[derive(Debug, Deserialize)]
struct PiperInference {
    #[serde(default = "default_noise_scale")]
    noise_scale: f32,
    #[serde(default = "default_length_scale")]
    length_scale: f32,
    #[serde(default = "default_noise_w")]
    noise_w: f32,
}

impl Default for PiperInference {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

fn default_num_speakers() -> u32 {
    1
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

/// 音素表：单字符音素 → id 序列
#[derive(Debug, Clone)]
struct PhonemeTable {
    ids: HashMap<char, Vec<i64>>,
    pad: Vec<i64>,
    bos: Vec<i64>,
    eos: Vec<i64>,
}

impl PhonemeTable {
    fn from_map(map: HashMap<String, Vec<i64>>) -> Result<Self, TtsError> {
        // 多码点的键无法与 espeak 的逐字符输出对应，直接忽略
        let ids: HashMap<char, Vec<i64>> = map
            .into_iter()
            .filter_map(|(key, ids)| {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, ids)),
                    _ => None,
                }
            })
            .collect();

        let special = |c: char| {
            ids.get(&c)
                .cloned()
                .ok_or_else(|| TtsError::InvalidModel(format!("phoneme_id_map lacks '{}'", c)))
        };

        Ok(Self {
            pad: special(PAD)?,
            bos: special(BOS)?,
            eos: special(EOS)?,
            ids,
        })
    }

    /// `^ _ p1 _ p2 _ ... $`，表外字符丢弃
    fn encode(&self, phonemes: &str) -> Vec<i64> {
        let mut out = self.bos.clone();
        out.extend_from_slice(&self.pad);
        for c in phonemes.chars() {
            if c == PAD {
                continue;
            }
            if let Some(ids) = self.ids.get(&c) {
                out.extend_from_slice(ids);
                out.extend_from_slice(&self.pad);
            }
        }
        out.extend_from_slice(&self.eos);
        out
    }
}

/// 已加载的模型，推理需要独占 Session
struct PiperModel {
    session: Mutex<Session>,
    phonemes: PhonemeTable,
    espeak_voice: String,
    /// [noise_scale, length_scale, noise_w]
    scales: [f32; 3],
    /// 多说话人模型才有
    speaker_id: Option<i64>,
    sample_rate: u32,
}

impl PiperModel {
    fn synthesize(&self, espeak_program: &str, text: &str) -> Result<Vec<i16>, TtsError> {
        let sentences = phonemize(espeak_program, &self.espeak_voice, text)?;
        let silence = (self.sample_rate as f32 * SENTENCE_SILENCE_SECS) as usize;

        let mut audio: Vec<f32> = Vec::new();
        for sentence in &sentences {
            let ids = self.phonemes.encode(sentence);
            let chunk = self.infer(ids)?;
            if chunk.is_empty() {
                continue;
            }
            if !audio.is_empty() {
                audio.extend(std::iter::repeat(0.0).take(silence));
            }
            audio.extend(chunk);
        }

        Ok(float_to_pcm(&audio))
    }

    fn infer(&self, ids: Vec<i64>) -> Result<Vec<f32>, TtsError> {
        let len = ids.len();
        let input = Array2::from_shape_vec((1, len), ids)
            .map_err(|e| TtsError::InvalidOutput(e.to_string()))?;
        let input_lengths = ndarray::arr1(&[len as i64]);
        let scales = ndarray::arr1(&self.scales);

        let mut session = self
            .session
            .lock()
            .map_err(|_| TtsError::EngineUnavailable("session lock poisoned".to_string()))?;

        let sid = ndarray::arr1(&[self.speaker_id.unwrap_or(0)]);

        let run = |session: &mut Session| -> Result<Vec<f32>, ort::Error> {
            let outputs = if self.speaker_id.is_some() {
                session.run(inputs![
                    "input" => TensorRef::from_array_view(input.view())?,
                    "input_lengths" => TensorRef::from_array_view(input_lengths.view())?,
                    "scales" => TensorRef::from_array_view(scales.view())?,
                    "sid" => TensorRef::from_array_view(sid.view())?,
                ])?
            } else {
                session.run(inputs![
                    "input" => TensorRef::from_array_view(input.view())?,
                    "input_lengths" => TensorRef::from_array_view(input_lengths.view())?,
                    "scales" => TensorRef::from_array_view(scales.view())?,
                ])?
            };

            let first = outputs
                .iter()
                .next()
                .ok_or_else(|| ort::Error::new("model produced no output"))?;
            let waveform = first.1.try_extract_array::<f32>()?;
            Ok(waveform.iter().copied().collect())
        };

        run(&mut *session).map_err(|e| TtsError::ProcessFailed(format!("inference failed: {}", e)))
    }
}

/// Piper 引擎，对应一个已加载的音色模型
pub struct PiperEngine {
    voice_id: String,
    espeak_program: String,
    model: Arc<PiperModel>,
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, TtsError> {
        let model = self.model.clone();
        let program = self.espeak_program.clone();
        let input = text.to_string();

        let samples = tokio::task::spawn_blocking(move || model.synthesize(&program, &input))
            .await
            .map_err(|e| TtsError::IoError(e.to_string()))??;

        if samples.is_empty() {
            return Err(TtsError::InvalidOutput("piper produced no audio".to_string()));
        }

        tracing::debug!(
            voice_id = %self.voice_id,
            samples = samples.len(),
            "Piper synthesis completed"
        );

        Ok(SynthesizedAudio {
            samples,
            sample_rate: self.model.sample_rate,
        })
    }

    fn sample_rate(&self) -> u32 {
        self.model.sample_rate
    }
}

/// 调用 espeak-ng 取 IPA，每个非空行对应一句
fn phonemize(program: &str, voice: &str, text: &str) -> Result<Vec<String>, TtsError> {
    let mut child = Command::new(program)
        .args(["--ipa", "--stdin", "-q", "-v", voice])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TtsError::EngineUnavailable(format!("{} not found", program))
            } else {
                TtsError::IoError(e.to_string())
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // 最后一行没有换行时 espeak-ng 会吞掉末尾的词
        let mut payload = text.to_string();
        if !payload.ends_with('\n') {
            payload.push('\n');
        }
        stdin
            .write_all(payload.as_bytes())
            .map_err(|e| TtsError::IoError(e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| TtsError::IoError(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TtsError::ProcessFailed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(sentence_lines(&String::from_utf8_lossy(&output.stdout)))
}

fn sentence_lines(ipa: &str) -> Vec<String> {
    ipa.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按峰值归一化到 16 位 PCM，峰值下限 0.01 避免放大静音
fn float_to_pcm(samples: &[f32]) -> Vec<i16> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs())).max(0.01);
    let scale = i16::MAX as f32 / peak;
    samples
        .iter()
        .map(|s| (s * scale).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

fn build_session(model_path: &Path, config: &PiperConfig) -> Result<Session, ort::Error> {
    let mut providers = Vec::new();
    if config.use_cuda {
        providers.push(CUDAExecutionProvider::default().build());
    }
    providers.push(CPUExecutionProvider::default().build());

    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?;
    if config.num_threads > 0 {
        builder = builder.with_intra_threads(config.num_threads)?;
    }
    builder.commit_from_file(model_path)
}

fn load_model(
    voice: &VoiceModel,
    files: &ModelFiles,
    config: &PiperConfig,
) -> Result<PiperModel, TtsError> {
    let raw = std::fs::read(&files.config_path).map_err(|e| {
        TtsError::InvalidModel(format!("{}: {}", files.config_path.display(), e))
    })?;
    let metadata: PiperMetadata = serde_json::from_slice(&raw).map_err(|e| {
        TtsError::InvalidModel(format!("{}: {}", files.config_path.display(), e))
    })?;

    if metadata.audio.sample_rate == 0 {
        return Err(TtsError::InvalidModel("sample_rate is 0".to_string()));
    }

    let phonemes = PhonemeTable::from_map(metadata.phoneme_id_map)?;

    let model_len = std::fs::metadata(&files.model_path)
        .map(|m| m.len())
        .map_err(|e| TtsError::InvalidModel(format!("{}: {}", files.model_path.display(), e)))?;
    if model_len == 0 {
        return Err(TtsError::InvalidModel(format!(
            "{} is empty",
            files.model_path.display()
        )));
    }

    let session = build_session(&files.model_path, config).map_err(|e| {
        TtsError::InvalidModel(format!("{}: {}", files.model_path.display(), e))
    })?;

    let speaker_id = (metadata.num_speakers > 1).then(|| {
        metadata
            .speaker_id_map
            .get(&voice.speaker)
            .copied()
            .unwrap_or(0)
    });

    // 元数据缺少 espeak 段时按语言代码推断，如 en_US → en-us
    let espeak_voice = metadata
        .espeak
        .map(|e| e.voice)
        .unwrap_or_else(|| voice.language_code.replace('_', "-").to_lowercase());

    Ok(PiperModel {
        session: Mutex::new(session),
        phonemes,
        espeak_voice,
        scales: [
            metadata.inference.noise_scale,
            metadata.inference.length_scale,
            metadata.inference.noise_w,
        ],
        speaker_id,
        sample_rate: metadata.audio.sample_rate,
    })
}

/// Piper 引擎加载器
pub struct PiperEngineLoader {
    config: PiperConfig,
}

impl PiperEngineLoader {
    pub fn new(config: PiperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for PiperEngineLoader {
    async fn load(
        &self,
        voice: &VoiceModel,
        files: &ModelFiles,
    ) -> Result<Arc<dyn SpeechEngine>, TtsError> {
        let config = self.config.clone();
        let target = voice.clone();
        let paths = files.clone();

        // 构建 Session 会做图优化，放到阻塞线程
        let model = tokio::task::spawn_blocking(move || load_model(&target, &paths, &config))
            .await
            .map_err(|e| TtsError::IoError(e.to_string()))??;

        tracing::info!(
            voice_id = %voice.id,
            sample_rate = model.sample_rate,
            espeak_voice = %model.espeak_voice,
            multi_speaker = model.speaker_id.is_some(),
            cuda = self.config.use_cuda,
            "Piper engine loaded"
        );

        Ok(Arc::new(PiperEngine {
            voice_id: voice.id.clone(),
            espeak_program: self.config.espeak_program.clone(),
            model: Arc::new(model),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::voice::VoiceCatalog;
    use tempfile::{tempdir, TempDir};

    const METADATA: &str = r#"{
        "audio": {"sample_rate": 22050},
        "espeak": {"voice": "en-us"},
        "inference": {"noise_scale": 0.667, "length_scale": 1, "noise_w": 0.8},
        "num_speakers": 1,
        "phoneme_id_map": {"_": [0], "^": [1], "$": [2], " ": [3], "h": [20], "ə": [59]}
    }"#;

    fn model_files(dir: &TempDir, weights: &[u8], metadata: &str) -> ModelFiles {
        let files = ModelFiles {
            model_path: dir.path().join("voice.onnx"),
            config_path: dir.path().join("voice.onnx.json"),
        };
        std::fs::write(&files.model_path, weights).unwrap();
        std::fs::write(&files.config_path, metadata).unwrap();
        files
    }

    fn voice() -> VoiceModel {
        VoiceCatalog::default().get_default().clone()
    }

    async fn load_err(files: &ModelFiles) -> TtsError {
        PiperEngineLoader::new(PiperConfig::default())
            .load(&voice(), files)
            .await
            .err()
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_rejects_non_onnx_weights() {
        let dir = tempdir().unwrap();
        let files = model_files(&dir, b"<html>404 not an onnx model</html>", METADATA);

        let err = load_err(&files).await;
        assert!(matches!(err, TtsError::InvalidModel(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_load_rejects_bad_metadata() {
        let dir = tempdir().unwrap();
        let files = model_files(&dir, b"weights", "not json");

        assert!(matches!(load_err(&files).await, TtsError::InvalidModel(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_empty_model() {
        let dir = tempdir().unwrap();
        let files = model_files(&dir, b"", METADATA);

        assert!(matches!(load_err(&files).await, TtsError::InvalidModel(_)));
    }

    #[tokio::test]
    async fn test_load_rejects_missing_special_phonemes() {
        let dir = tempdir().unwrap();
        let metadata = r#"{"audio": {"sample_rate": 16000}, "phoneme_id_map": {"a": [5]}}"#;
        let files = model_files(&dir, b"weights", metadata);

        match load_err(&files).await {
            TtsError::InvalidModel(msg) => assert!(msg.contains("phoneme_id_map")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_phoneme_encoding() {
        let metadata: PiperMetadata = serde_json::from_str(METADATA).unwrap();
        let table = PhonemeTable::from_map(metadata.phoneme_id_map).unwrap();

        // 表外字符 x 与 espeak 的 '_' 都被丢弃
        assert_eq!(table.encode("hə x_"), vec![1, 0, 20, 0, 59, 0, 3, 0, 3, 0, 2]);
        assert_eq!(table.encode(""), vec![1, 0, 2]);
    }

    #[test]
    fn test_multi_codepoint_keys_ignored() {
        let mut map = HashMap::new();
        map.insert("_".to_string(), vec![0]);
        map.insert("^".to_string(), vec![1]);
        map.insert("$".to_string(), vec![2]);
        map.insert("ab".to_string(), vec![9]);

        let table = PhonemeTable::from_map(map).unwrap();
        assert_eq!(table.encode("ab"), vec![1, 0, 2]);
    }

    #[test]
    fn test_sentence_lines() {
        assert_eq!(
            sentence_lines(" həlˈoʊ\n\n  wˈɜːld \n"),
            vec!["həlˈoʊ".to_string(), "wˈɜːld".to_string()]
        );
    }

    #[test]
    fn test_float_to_pcm_normalizes_peak() {
        let pcm = float_to_pcm(&[0.0, 0.5, -0.25]);
        assert_eq!(pcm, vec![0, i16::MAX, -(i16::MAX / 2)]);

        // 近乎静音时不放大
        let quiet = float_to_pcm(&[0.001]);
        assert_eq!(quiet, vec![(0.001 * i16::MAX as f32 / 0.01) as i16]);
    }

    #[test]
    fn test_missing_espeak_is_unavailable() {
        let err = phonemize("definitely-not-installed-espeak", "en-us", "hello").unwrap_err();
        assert!(matches!(err, TtsError::EngineUnavailable(_)));
    }
}
