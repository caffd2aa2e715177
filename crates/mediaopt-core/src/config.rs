//! Configuration module
//!
//! Configuration is loaded once at process start and handed to the bootstrap code,
//! which builds the store clients and the pipeline context from it. Deployment
//! limits (CPU, memory, region, invocation timeout) are owned by the platform and
//! only read here.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_INTAKE_PREFIX;
use crate::storage_types::StorageBackend;

// Common constants
const DB_MAX_CONNECTIONS: u32 = 5;
const INVOCATION_TIMEOUT_SECS: u64 = 300;
const OPTIMIZER_TIMEOUT_SECS: u64 = 240;
const IMAGE_MAX_DIMENSION: u32 = 1280;
const IMAGE_JPEG_QUALITY: u8 = 75;
const VIDEO_MAX_WIDTH: u32 = 1280;
const VIDEO_MAX_HEIGHT: u32 = 720;
const VIDEO_CRF: u8 = 24;

/// Log output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Platform-owned resource limits, read from `FUNCTION_*` variables.
#[derive(Clone, Debug, Deserialize)]
pub struct DeploymentLimits {
    #[serde(default = "default_cpu")]
    pub cpu: u32,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_cpu() -> u32 {
    1
}

fn default_memory() -> String {
    "1GiB".to_string()
}

fn default_region() -> String {
    "us-central1".to_string()
}

impl Default for DeploymentLimits {
    fn default() -> Self {
        Self {
            cpu: default_cpu(),
            memory: default_memory(),
            region: default_region(),
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub environment: String,
    pub log_format: LogFormat,
    // Object store
    pub storage_backend: Option<StorageBackend>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, GCS interop, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    // Record store
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Pipeline
    pub intake_prefix: String,
    pub temp_dir: PathBuf,
    pub invocation_timeout_secs: u64,
    pub optimizer_timeout_secs: u64,
    // Image optimizer
    pub image_max_dimension: u32,
    pub image_jpeg_quality: u8,
    // Video transcoder
    pub ffmpeg_path: String,
    pub video_max_width: u32,
    pub video_max_height: u32,
    pub video_crf: u8,
    pub video_preset: String,
    pub audio_bitrate: String,
    // Deployment
    pub limits: DeploymentLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            environment: "development".to_string(),
            log_format: LogFormat::default(),
            storage_backend: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            intake_prefix: DEFAULT_INTAKE_PREFIX.to_string(),
            temp_dir: env::temp_dir(),
            invocation_timeout_secs: INVOCATION_TIMEOUT_SECS,
            optimizer_timeout_secs: OPTIMIZER_TIMEOUT_SECS,
            image_max_dimension: IMAGE_MAX_DIMENSION,
            image_jpeg_quality: IMAGE_JPEG_QUALITY,
            ffmpeg_path: "ffmpeg".to_string(),
            video_max_width: VIDEO_MAX_WIDTH,
            video_max_height: VIDEO_MAX_HEIGHT,
            video_crf: VIDEO_CRF,
            video_preset: "fast".to_string(),
            audio_bitrate: "128k".to_string(),
            limits: DeploymentLimits::default(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn as_pipeline(&self) -> &PipelineConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PipelineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_pipeline().validate()
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.as_pipeline().environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_pipeline().log_format
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_pipeline().storage_backend
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_pipeline().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_pipeline().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_pipeline().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_pipeline().local_storage_path.as_deref()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_pipeline().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_pipeline().db_max_connections
    }

    pub fn intake_prefix(&self) -> &str {
        &self.as_pipeline().intake_prefix
    }

    pub fn temp_dir(&self) -> &std::path::Path {
        &self.as_pipeline().temp_dir
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.as_pipeline().invocation_timeout_secs)
    }

    pub fn optimizer_timeout(&self) -> Duration {
        Duration::from_secs(self.as_pipeline().optimizer_timeout_secs)
    }

    pub fn image_max_dimension(&self) -> u32 {
        self.as_pipeline().image_max_dimension
    }

    pub fn image_jpeg_quality(&self) -> u8 {
        self.as_pipeline().image_jpeg_quality
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.as_pipeline().ffmpeg_path
    }

    pub fn video_max_width(&self) -> u32 {
        self.as_pipeline().video_max_width
    }

    pub fn video_max_height(&self) -> u32 {
        self.as_pipeline().video_max_height
    }

    pub fn video_crf(&self) -> u8 {
        self.as_pipeline().video_crf
    }

    pub fn video_preset(&self) -> &str {
        &self.as_pipeline().video_preset
    }

    pub fn audio_bitrate(&self) -> &str {
        &self.as_pipeline().audio_bitrate
    }

    pub fn limits(&self) -> &DeploymentLimits {
        &self.as_pipeline().limits
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let log_format = env::var("LOG_FORMAT")
            .ok()
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?;

        let intake_prefix =
            env::var("INTAKE_PREFIX").unwrap_or_else(|_| DEFAULT_INTAKE_PREFIX.to_string());

        let temp_dir = env::var("MEDIAOPT_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());

        let limits = envy::prefixed("FUNCTION_")
            .from_env::<DeploymentLimits>()
            .map_err(|e| anyhow::anyhow!("Invalid deployment limits: {}", e))?;

        Ok(PipelineConfig {
            environment,
            log_format,
            storage_backend,
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            intake_prefix,
            temp_dir,
            invocation_timeout_secs: env_parse("INVOCATION_TIMEOUT_SECS", INVOCATION_TIMEOUT_SECS),
            optimizer_timeout_secs: env_parse("OPTIMIZER_TIMEOUT_SECS", OPTIMIZER_TIMEOUT_SECS),
            image_max_dimension: env_parse("IMAGE_MAX_DIMENSION", IMAGE_MAX_DIMENSION),
            image_jpeg_quality: env_parse("IMAGE_JPEG_QUALITY", IMAGE_JPEG_QUALITY),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            video_max_width: env_parse("VIDEO_MAX_WIDTH", VIDEO_MAX_WIDTH),
            video_max_height: env_parse("VIDEO_MAX_HEIGHT", VIDEO_MAX_HEIGHT),
            video_crf: env_parse("VIDEO_CRF", VIDEO_CRF),
            video_preset: env::var("VIDEO_PRESET").unwrap_or_else(|_| "fast".to_string()),
            audio_bitrate: env::var("AUDIO_BITRATE").unwrap_or_else(|_| "128k".to_string()),
            limits,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.intake_prefix.is_empty() {
            return Err(anyhow::anyhow!("INTAKE_PREFIX must not be empty"));
        }

        if self.optimizer_timeout_secs == 0
            || self.optimizer_timeout_secs >= self.invocation_timeout_secs
        {
            return Err(anyhow::anyhow!(
                "OPTIMIZER_TIMEOUT_SECS ({}) must be positive and below INVOCATION_TIMEOUT_SECS ({})",
                self.optimizer_timeout_secs,
                self.invocation_timeout_secs
            ));
        }

        if self.image_max_dimension == 0 || self.video_max_width == 0 || self.video_max_height == 0
        {
            return Err(anyhow::anyhow!("Maximum output dimensions must be positive"));
        }

        if !(1..=100).contains(&self.image_jpeg_quality) {
            return Err(anyhow::anyhow!(
                "IMAGE_JPEG_QUALITY must be between 1 and 100"
            ));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        // Validate storage backend configuration
        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}
