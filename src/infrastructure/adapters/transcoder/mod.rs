//! Transcoder Adapter - 外部编码器

mod ffmpeg_transcoder;

pub use ffmpeg_transcoder::FfmpegTranscoder;
