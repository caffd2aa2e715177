//! Test helpers: in-memory stores, fake optimizers and a pipeline context wired to
//! them.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use mediaopt_core::{MediaKind, OptimizedArtifact, UploadEvent};
use mediaopt_db::InMemoryRecordStore;
use mediaopt_processing::{OptimizeError, Optimizer, PipelineContext, PipelineSettings};
use mediaopt_storage::InMemoryStorage;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BUCKET: &str = "media-bucket";

/// How a [`FakeOptimizer`] behaves when called.
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Write these bytes to the output path.
    Succeed(Vec<u8>),
    /// Report an encoder failure with this diagnostic.
    Fail(String),
    /// Panic, as a crashing encoder binding would.
    Panic,
}

pub struct FakeOptimizer {
    kind: MediaKind,
    content_type: &'static str,
    behavior: FakeBehavior,
    calls: AtomicUsize,
}

impl FakeOptimizer {
    pub fn new(kind: MediaKind, behavior: FakeBehavior) -> Self {
        let content_type = match kind {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        };
        Self {
            kind,
            content_type,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Optimizer for FakeOptimizer {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn optimize(
        &self,
        input: &Path,
        output: &Path,
        _deadline: Duration,
    ) -> Result<OptimizedArtifact, OptimizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(input.exists(), "input copy must exist before optimizing");
        match &self.behavior {
            FakeBehavior::Succeed(bytes) => {
                tokio::fs::write(output, bytes).await?;
                Ok(OptimizedArtifact {
                    path: output.to_path_buf(),
                    content_type: self.content_type.to_string(),
                })
            }
            FakeBehavior::Fail(message) => Err(OptimizeError::Process {
                status: "exit status: 1".to_string(),
                diagnostic: message.clone(),
            }),
            FakeBehavior::Panic => panic!("encoder crashed"),
        }
    }
}

/// Pipeline context plus handles on everything it talks to.
pub struct TestHarness {
    pub ctx: PipelineContext,
    pub storage: Arc<InMemoryStorage>,
    pub records: Arc<InMemoryRecordStore>,
    pub temp_root: TempDir,
}

impl TestHarness {
    pub fn new(image: Arc<dyn Optimizer>, video: Arc<dyn Optimizer>) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let records = Arc::new(InMemoryRecordStore::new());
        let temp_root = tempfile::tempdir().expect("Failed to create temp directory");

        let settings = PipelineSettings {
            intake_prefix: "uploads/".to_string(),
            temp_root: temp_root.path().to_path_buf(),
            optimizer_timeout: Duration::from_secs(60),
        };
        let ctx = PipelineContext::new(
            storage.clone(),
            records.clone(),
            image,
            video,
            settings,
        );

        Self {
            ctx,
            storage,
            records,
            temp_root,
        }
    }

    /// Harness whose optimizers always succeed.
    pub fn with_fakes() -> Self {
        Self::new(
            Arc::new(FakeOptimizer::new(
                MediaKind::Image,
                FakeBehavior::Succeed(b"optimized image".to_vec()),
            )),
            Arc::new(FakeOptimizer::new(
                MediaKind::Video,
                FakeBehavior::Succeed(b"optimized video".to_vec()),
            )),
        )
    }

    /// Seed an object and return the event the object store would emit for it.
    pub fn upload(
        &self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> UploadEvent {
        let size = data.len() as u64;
        self.storage
            .insert(BUCKET, path, data, content_type, metadata.clone());
        event(path, content_type, size, metadata)
    }

    /// Entries left under the temporary root.
    pub fn temp_entries(&self) -> usize {
        std::fs::read_dir(self.temp_root.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn event(
    path: &str,
    content_type: &str,
    size: u64,
    metadata: HashMap<String, String>,
) -> UploadEvent {
    UploadEvent {
        bucket: BUCKET.to_string(),
        path: Some(path.to_string()),
        content_type: Some(content_type.to_string()),
        size,
        metadata,
    }
}

pub fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Encoded test image of the given size.
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format)
        .expect("Failed to encode test image");
    buffer.into_inner()
}
