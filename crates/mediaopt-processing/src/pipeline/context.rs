use crate::traits::Optimizer;
use mediaopt_core::{Config, MediaKind};
use mediaopt_db::RecordStore;
use mediaopt_storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-process settings the pipeline reads on every invocation.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub intake_prefix: String,
    pub temp_root: PathBuf,
    pub optimizer_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            intake_prefix: config.intake_prefix().to_string(),
            temp_root: config.temp_dir().to_path_buf(),
            optimizer_timeout: config.optimizer_timeout(),
        }
    }
}

/// Everything an invocation needs, built once at process start.
#[derive(Clone)]
pub struct PipelineContext {
    pub storage: Arc<dyn Storage>,
    pub records: Arc<dyn RecordStore>,
    pub image_optimizer: Arc<dyn Optimizer>,
    pub video_optimizer: Arc<dyn Optimizer>,
    pub settings: PipelineSettings,
}

impl PipelineContext {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordStore>,
        image_optimizer: Arc<dyn Optimizer>,
        video_optimizer: Arc<dyn Optimizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            records,
            image_optimizer,
            video_optimizer,
            settings,
        }
    }

    /// Build the production optimizers from configuration.
    #[cfg(all(feature = "image", feature = "video"))]
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        use crate::image::ImageOptimizer;
        use crate::video::{VideoTranscoder, VideoTranscoderConfig};

        let image_optimizer = ImageOptimizer::new(
            config.image_max_dimension(),
            config.image_jpeg_quality(),
        );
        let video_optimizer = VideoTranscoder::new(VideoTranscoderConfig {
            ffmpeg_path: config.ffmpeg_path().to_string(),
            max_width: config.video_max_width(),
            max_height: config.video_max_height(),
            crf: config.video_crf(),
            preset: config.video_preset().to_string(),
            audio_bitrate: config.audio_bitrate().to_string(),
        });

        Self::new(
            storage,
            records,
            Arc::new(image_optimizer),
            Arc::new(video_optimizer),
            PipelineSettings::from_config(config),
        )
    }

    pub fn optimizer_for(&self, kind: MediaKind) -> &Arc<dyn Optimizer> {
        match kind {
            MediaKind::Image => &self.image_optimizer,
            MediaKind::Video => &self.video_optimizer,
        }
    }
}
