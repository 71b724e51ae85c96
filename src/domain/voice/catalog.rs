//! Voice Catalog - 内置音色目录
//!
//! 启动时构建一次，之后只通过只读访问器暴露，可在多线程下无锁并发读取。
//! 目录条目跨版本只追加，不复用已有 id。

use std::collections::HashMap;

use super::{Gender, VoiceError, VoiceModel, VoiceQuality};

/// 默认音色
pub const DEFAULT_VOICE_ID: &str = "en_US-lessac-medium";

/// Piper 官方音色仓库
pub const DEFAULT_MIRROR_URL: &str = "https://huggingface.co/rhasspy/piper-voices/resolve/v1.0.0";

struct BuiltinVoice {
    family: &'static str,
    language_code: &'static str,
    language: &'static str,
    language_name: &'static str,
    speaker: &'static str,
    quality: VoiceQuality,
    gender: Gender,
    description: &'static str,
}

const BUILTIN_VOICES: &[BuiltinVoice] = &[
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "lessac",
        quality: VoiceQuality::Medium,
        gender: Gender::Female,
        description: "High quality female American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "lessac",
        quality: VoiceQuality::High,
        gender: Gender::Female,
        description: "Very high quality female American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "ryan",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "High quality male American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "ryan",
        quality: VoiceQuality::High,
        gender: Gender::Male,
        description: "Very high quality male American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "amy",
        quality: VoiceQuality::Medium,
        gender: Gender::Female,
        description: "Natural female American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_US",
        language: "English (US)",
        language_name: "English",
        speaker: "joe",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "Clear male American English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_GB",
        language: "English (UK)",
        language_name: "English",
        speaker: "alan",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "British male English voice",
    },
    BuiltinVoice {
        family: "en",
        language_code: "en_GB",
        language: "English (UK)",
        language_name: "English",
        speaker: "cori",
        quality: VoiceQuality::High,
        gender: Gender::Female,
        description: "High quality British female voice",
    },
    BuiltinVoice {
        family: "de",
        language_code: "de_DE",
        language: "German",
        language_name: "Deutsch",
        speaker: "thorsten",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "German male voice",
    },
    BuiltinVoice {
        family: "de",
        language_code: "de_DE",
        language: "German",
        language_name: "Deutsch",
        speaker: "thorsten",
        quality: VoiceQuality::High,
        gender: Gender::Male,
        description: "High quality German male voice",
    },
    BuiltinVoice {
        family: "fr",
        language_code: "fr_FR",
        language: "French",
        language_name: "Français",
        speaker: "siwis",
        quality: VoiceQuality::Medium,
        gender: Gender::Female,
        description: "French female voice",
    },
    BuiltinVoice {
        family: "fr",
        language_code: "fr_FR",
        language: "French",
        language_name: "Français",
        speaker: "tom",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "French male voice",
    },
    BuiltinVoice {
        family: "es",
        language_code: "es_ES",
        language: "Spanish (Spain)",
        language_name: "Español",
        speaker: "davefx",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "Spanish male voice",
    },
    BuiltinVoice {
        family: "es",
        language_code: "es_MX",
        language: "Spanish (Mexico)",
        language_name: "Español",
        speaker: "claude",
        quality: VoiceQuality::High,
        gender: Gender::Male,
        description: "Mexican Spanish male voice",
    },
    BuiltinVoice {
        family: "it",
        language_code: "it_IT",
        language: "Italian",
        language_name: "Italiano",
        speaker: "paola",
        quality: VoiceQuality::Medium,
        gender: Gender::Female,
        description: "Italian female voice",
    },
    BuiltinVoice {
        family: "pt",
        language_code: "pt_BR",
        language: "Portuguese (Brazil)",
        language_name: "Português",
        speaker: "faber",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "Brazilian Portuguese male voice",
    },
    BuiltinVoice {
        family: "ru",
        language_code: "ru_RU",
        language: "Russian",
        language_name: "Русский",
        speaker: "denis",
        quality: VoiceQuality::Medium,
        gender: Gender::Male,
        description: "Russian male voice",
    },
];

impl BuiltinVoice {
    fn to_model(&self, mirror_url: &str) -> VoiceModel {
        let id = format!("{}-{}-{}", self.language_code, self.speaker, self.quality);
        // 仓库目录结构: <family>/<code>/<speaker>/<quality>/<id>.onnx
        let base = format!(
            "{}/{}/{}/{}/{}/{}",
            mirror_url.trim_end_matches('/'),
            self.family,
            self.language_code,
            self.speaker,
            self.quality,
            id
        );

        VoiceModel {
            model_url: format!("{}.onnx", base),
            config_url: format!("{}.onnx.json", base),
            id,
            language: self.language.to_string(),
            language_code: self.language_code.to_string(),
            language_name: self.language_name.to_string(),
            speaker: self.speaker.to_string(),
            quality: self.quality,
            gender: Some(self.gender),
            description: Some(self.description.to_string()),
        }
    }
}

/// 音色目录
///
/// 构建后不可变，只暴露只读访问器
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<VoiceModel>,
    index: HashMap<String, usize>,
    default_index: usize,
}

impl VoiceCatalog {
    /// 使用内置音色表构建目录
    ///
    /// `mirror_url` 为模型仓库根地址，默认 [`DEFAULT_MIRROR_URL`]
    pub fn builtin(mirror_url: &str) -> Self {
        let voices: Vec<VoiceModel> = BUILTIN_VOICES
            .iter()
            .map(|v| v.to_model(mirror_url))
            .collect();
        let index = voices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.id.clone(), i))
            .collect::<HashMap<_, _>>();
        let default_index = index.get(DEFAULT_VOICE_ID).copied().unwrap_or(0);

        Self {
            voices,
            index,
            default_index,
        }
    }

    /// 使用自定义音色列表构建目录
    pub fn new(voices: Vec<VoiceModel>, default_id: &str) -> Result<Self, VoiceError> {
        if voices.is_empty() {
            return Err(VoiceError::EmptyCatalog);
        }

        let mut index = HashMap::with_capacity(voices.len());
        for (i, voice) in voices.iter().enumerate() {
            if index.insert(voice.id.clone(), i).is_some() {
                return Err(VoiceError::AlreadyExists(voice.id.clone()));
            }
        }

        let default_index = *index
            .get(default_id)
            .ok_or_else(|| VoiceError::NotFound(default_id.to_string()))?;

        Ok(Self {
            voices,
            index,
            default_index,
        })
    }

    /// 更换默认音色，音色必须在目录中
    pub fn with_default(mut self, default_id: &str) -> Result<Self, VoiceError> {
        self.default_index = *self
            .index
            .get(default_id)
            .ok_or_else(|| VoiceError::NotFound(default_id.to_string()))?;
        Ok(self)
    }

    /// 按目录顺序列出全部音色
    pub fn list(&self) -> &[VoiceModel] {
        &self.voices
    }

    pub fn get_by_id(&self, id: &str) -> Result<&VoiceModel, VoiceError> {
        self.index
            .get(id)
            .map(|&i| &self.voices[i])
            .ok_or_else(|| VoiceError::NotFound(id.to_string()))
    }

    pub fn get_default(&self) -> &VoiceModel {
        &self.voices[self.default_index]
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::builtin(DEFAULT_MIRROR_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = VoiceCatalog::default();
        assert_eq!(catalog.list().len(), BUILTIN_VOICES.len());
        assert_eq!(catalog.get_default().id, DEFAULT_VOICE_ID);
        assert_eq!(catalog.list()[0].id, DEFAULT_VOICE_ID);
    }

    #[test]
    fn test_builtin_urls() {
        let catalog = VoiceCatalog::default();
        let voice = catalog.get_by_id("de_DE-thorsten-high").unwrap();
        assert_eq!(
            voice.model_url,
            "https://huggingface.co/rhasspy/piper-voices/resolve/v1.0.0/de/de_DE/thorsten/high/de_DE-thorsten-high.onnx"
        );
        assert_eq!(voice.config_url, format!("{}.json", voice.model_url));
    }

    #[test]
    fn test_mirror_url_trailing_slash() {
        let catalog = VoiceCatalog::builtin("http://mirror.local/voices/");
        let voice = catalog.get_default();
        assert_eq!(
            voice.model_url,
            "http://mirror.local/voices/en/en_US/lessac/medium/en_US-lessac-medium.onnx"
        );
    }

    #[test]
    fn test_ids_unique_and_well_formed() {
        let catalog = VoiceCatalog::default();
        for voice in catalog.list() {
            let parts: Vec<&str> = voice.id.split('-').collect();
            assert_eq!(parts.len(), 3, "bad id {}", voice.id);
            assert_eq!(parts[0], voice.language_code);
            assert_eq!(parts[1], voice.speaker);
            assert_eq!(parts[2], voice.quality.as_str());
        }
    }

    #[test]
    fn test_unknown_voice() {
        let catalog = VoiceCatalog::default();
        assert!(matches!(
            catalog.get_by_id("does-not-exist"),
            Err(VoiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_custom_catalog_rejects_duplicates() {
        let catalog = VoiceCatalog::default();
        let voice = catalog.get_default().clone();
        let result = VoiceCatalog::new(vec![voice.clone(), voice], DEFAULT_VOICE_ID);
        assert!(matches!(result, Err(VoiceError::AlreadyExists(_))));
    }

    #[test]
    fn test_with_default() {
        let catalog = VoiceCatalog::default()
            .with_default("de_DE-thorsten-high")
            .unwrap();
        assert_eq!(catalog.get_default().id, "de_DE-thorsten-high");

        assert!(VoiceCatalog::default().with_default("xx_XX-nobody-low").is_err());
    }

    #[test]
    fn test_custom_catalog_requires_default() {
        let catalog = VoiceCatalog::default();
        let voice = catalog.get_default().clone();
        assert!(VoiceCatalog::new(vec![voice], "missing").is_err());
        assert!(matches!(
            VoiceCatalog::new(Vec::new(), DEFAULT_VOICE_ID),
            Err(VoiceError::EmptyCatalog)
        ));
    }
}
