//! FFmpeg Transcoder - WAV → MP3
//!
//! `ffmpeg -i <wav> -acodec mp3 -ab <bitrate> -y <mp3>`，退出码 0 视为成功。
//! 失败时删除可能残留的输出文件。

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{AudioTranscoderPort, TranscodeConfig, TranscodeError};

/// stderr 最多保留的字符数
const STDERR_TAIL_CHARS: usize = 500;

/// FFmpeg 转码器
pub struct FfmpegTranscoder {
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let child = Command::new(&self.config.program)
            .arg("-i")
            .arg(input)
            .args(["-acodec", "mp3", "-ab", &self.config.bitrate, "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::Unavailable(format!("{} not found", self.config.program))
                } else {
                    TranscodeError::IoError(e.to_string())
                }
            })?;

        let result = if self.config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| TranscodeError::Timeout(self.config.timeout_secs))?
        } else {
            child.wait_with_output().await
        };
        let result = result.map_err(|e| TranscodeError::IoError(e.to_string()))?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AudioTranscoderPort for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            bitrate = %self.config.bitrate,
            "Transcoding audio"
        );

        let result = self.run(input, output).await;

        if let Err(e) = &result {
            tracing::warn!(input = %input.display(), error = %e, "Transcode failed");
            if let Err(rm) = tokio::fs::remove_file(output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(output = %output.display(), error = %rm, "Failed to remove partial output");
                }
            }
        }

        result
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
