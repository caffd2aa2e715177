//! Video transcoding through an ffmpeg child process

pub mod transcoder;

pub use transcoder::{VideoTranscoder, VideoTranscoderConfig};
