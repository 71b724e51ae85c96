//! Acceleration Probe - GPU 检测
//!
//! 通过 `nvidia-smi` 检测 CUDA 设备，结果进程内缓存，只探测一次

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::application::ports::AccelerationInfo;

static ACCELERATION: OnceLock<AccelerationInfo> = OnceLock::new();

static CUDA_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CUDA Version:\s*([0-9]+(?:\.[0-9]+)*)").unwrap());

static GPU_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^GPU\s+\d+:\s*(.+?)(?:\s+\(UUID:.*\))?$").unwrap());

/// CUDA 使用策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CudaPreference {
    /// 检测到设备时启用
    Auto,
    On,
    Off,
}

impl Default for CudaPreference {
    fn default() -> Self {
        CudaPreference::Auto
    }
}

impl std::str::FromStr for CudaPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(CudaPreference::Auto),
            "on" | "true" | "cuda" => Ok(CudaPreference::On),
            "off" | "false" | "cpu" => Ok(CudaPreference::Off),
            _ => Err(format!("Unknown CUDA preference: {}", s)),
        }
    }
}

impl CudaPreference {
    pub fn resolve(&self, info: &AccelerationInfo) -> bool {
        match self {
            CudaPreference::Auto => info.cuda_available,
            CudaPreference::On => true,
            CudaPreference::Off => false,
        }
    }
}

/// 加速信息（首次调用时探测，之后返回缓存）
///
/// 会同步执行外部命令，异步上下文中应放到 `spawn_blocking`
pub fn acceleration_info() -> AccelerationInfo {
    ACCELERATION.get_or_init(|| probe("nvidia-smi")).clone()
}

fn probe(program: &str) -> AccelerationInfo {
    let Some(listing) = run(program, &["-L"]) else {
        tracing::debug!(program, "CUDA probe unavailable, using CPU");
        return AccelerationInfo::default();
    };

    let mut info = parse_device_list(&listing);
    if info.cuda_available {
        info.cuda_version = run(program, &[]).and_then(|out| parse_cuda_version(&out));
    }

    tracing::info!(
        cuda_available = info.cuda_available,
        cuda_version = ?info.cuda_version,
        device_count = info.device_count,
        device_name = ?info.device_name,
        "Acceleration probe finished"
    );
    info
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_device_list(listing: &str) -> AccelerationInfo {
    let names: Vec<String> = listing
        .lines()
        .filter_map(|line| GPU_LINE_RE.captures(line.trim()))
        .map(|caps| caps[1].trim().to_string())
        .collect();

    AccelerationInfo {
        cuda_available: !names.is_empty(),
        cuda_version: None,
        device_count: names.len(),
        device_name: names.into_iter().next(),
    }
}

fn parse_cuda_version(summary: &str) -> Option<String> {
    CUDA_VERSION_RE
        .captures(summary)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let listing = "GPU 0: NVIDIA GeForce RTX 3080 (UUID: GPU-1234)\nGPU 1: Tesla T4 (UUID: GPU-5678)\n";
        let info = parse_device_list(listing);

        assert!(info.cuda_available);
        assert_eq!(info.device_count, 2);
        assert_eq!(info.device_name.as_deref(), Some("NVIDIA GeForce RTX 3080"));
    }

    #[test]
    fn test_parse_empty_listing() {
        let info = parse_device_list("No devices were found\n");
        assert!(!info.cuda_available);
        assert_eq!(info.device_count, 0);
        assert!(info.device_name.is_none());
    }

    #[test]
    fn test_parse_cuda_version() {
        let summary = "| NVIDIA-SMI 535.104.05   Driver Version: 535.104.05   CUDA Version: 12.2     |";
        assert_eq!(parse_cuda_version(summary).as_deref(), Some("12.2"));
        assert_eq!(parse_cuda_version("no gpu"), None);
    }

    #[test]
    fn test_missing_probe_binary() {
        let info = probe("definitely-not-a-real-nvidia-smi");
        assert!(!info.cuda_available);
    }

    #[test]
    fn test_preference() {
        let gpu = AccelerationInfo {
            cuda_available: true,
            ..Default::default()
        };
        assert!(CudaPreference::Auto.resolve(&gpu));
        assert!(!CudaPreference::Auto.resolve(&AccelerationInfo::default()));
        assert!(!CudaPreference::Off.resolve(&gpu));
        assert_eq!("ON".parse::<CudaPreference>(), Ok(CudaPreference::On));
        assert!("maybe".parse::<CudaPreference>().is_err());
    }
}
