use crate::traits::{OptimizeError, Optimizer};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use mediaopt_core::constants::OPTIMIZED_IMAGE_CONTENT_TYPE;
use mediaopt_core::{MediaKind, OptimizedArtifact};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Downscales images to fit a square bound and re-encodes them as JPEG with mozjpeg.
#[derive(Debug, Clone)]
pub struct ImageOptimizer {
    max_dimension: u32,
    quality: u8,
}

impl ImageOptimizer {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Dimensions that fit within `max` x `max` keeping the aspect ratio. Images that
    /// already fit are returned unchanged.
    pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
        if width <= max && height <= max {
            return (width, height);
        }
        let scale = f64::min(max as f64 / width as f64, max as f64 / height as f64);
        let w = ((width as f64 * scale).round() as u32).clamp(1, max);
        let h = ((height as f64 * scale).round() as u32).clamp(1, max);
        (w, h)
    }

    fn resize(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        let (w, h) = Self::fit_within(width, height, self.max_dimension);
        if (w, h) == (width, height) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
    }

    /// Compress to JPEG using mozjpeg
    fn encode_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>, OptimizeError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(self.quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| OptimizeError::Encode(e.to_string()))?;
        comp.write_scanlines(&rgb_img)
            .map_err(|e| OptimizeError::Encode(e.to_string()))?;
        comp.finish().map_err(|e| OptimizeError::Encode(e.to_string()))
    }

    /// Decode, resize, encode and write. Runs on a blocking thread.
    ///
    /// A blocking task cannot be cancelled once the caller stops waiting, so the
    /// deadline is checked between phases and the output is never written late.
    fn optimize_blocking(
        &self,
        input: &Path,
        output: &Path,
        expires_at: Instant,
        deadline: Duration,
    ) -> Result<(u32, u32), OptimizeError> {
        let check_deadline = || {
            if Instant::now() >= expires_at {
                Err(OptimizeError::DeadlineExceeded(deadline))
            } else {
                Ok(())
            }
        };

        check_deadline()?;
        let img = ImageReader::open(input)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| OptimizeError::Decode(e.to_string()))?;

        check_deadline()?;
        let img = self.resize(img);
        let dimensions = img.dimensions();

        check_deadline()?;
        let jpeg = self.encode_jpeg(&img)?;

        check_deadline()?;
        std::fs::write(output, jpeg)?;
        Ok(dimensions)
    }
}

impl Default for ImageOptimizer {
    fn default() -> Self {
        Self::new(1280, 75)
    }
}

#[async_trait]
impl Optimizer for ImageOptimizer {
    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    #[tracing::instrument(skip(self), fields(max_dimension = self.max_dimension, quality = self.quality))]
    async fn optimize(
        &self,
        input: &Path,
        output: &Path,
        deadline: Duration,
    ) -> Result<OptimizedArtifact, OptimizeError> {
        let start = Instant::now();
        let expires_at = start + deadline;
        let optimizer = self.clone();
        let input_path: PathBuf = input.to_path_buf();
        let output_path: PathBuf = output.to_path_buf();

        let task = tokio::task::spawn_blocking(move || {
            optimizer.optimize_blocking(&input_path, &output_path, expires_at, deadline)
        });

        let (width, height) = match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => return Err(OptimizeError::Task(join_error.to_string())),
            Err(_) => return Err(OptimizeError::DeadlineExceeded(deadline)),
        };

        tracing::info!(
            width = width,
            height = height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image optimized"
        );

        Ok(OptimizedArtifact {
            path: output.to_path_buf(),
            content_type: OPTIMIZED_IMAGE_CONTENT_TYPE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn read_back(path: &Path) -> DynamicImage {
        ImageReader::open(path)
            .unwrap()
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap()
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 128]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(ImageOptimizer::fit_within(640, 480, 1280), (640, 480));
        assert_eq!(ImageOptimizer::fit_within(1280, 1280, 1280), (1280, 1280));
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        assert_eq!(ImageOptimizer::fit_within(2560, 1440, 1280), (1280, 720));
        assert_eq!(ImageOptimizer::fit_within(1000, 4000, 1280), (320, 1280));
        assert_eq!(ImageOptimizer::fit_within(5000, 1, 1280), (1280, 1));
    }

    #[tokio::test]
    async fn test_optimize_writes_bounded_jpeg() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.png");
        let output = dir.path().join("opt_a.png");
        write_png(&input, 2000, 1000);

        let artifact = ImageOptimizer::default()
            .optimize(&input, &output, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(artifact.content_type, "image/jpeg");
        assert_eq!(artifact.path, output);
        assert_eq!(read_back(&output).dimensions(), (1280, 640));
        assert_eq!(
            image::guess_format(&std::fs::read(&output).unwrap()).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn test_optimize_small_image_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("small.png");
        let output = dir.path().join("opt_small.png");
        write_png(&input, 300, 200);

        ImageOptimizer::default()
            .optimize(&input, &output, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(read_back(&output).dimensions(), (300, 200));
    }

    #[tokio::test]
    async fn test_optimize_rejects_garbage() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("opt_broken.jpg");
        std::fs::write(&input, b"definitely not an image").unwrap();

        let result = ImageOptimizer::default()
            .optimize(&input, &output, Duration::from_secs(60))
            .await;

        assert!(matches!(result, Err(OptimizeError::Decode(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_expired_deadline_stops_before_writing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("late.png");
        let output = dir.path().join("opt_late.png");
        write_png(&input, 64, 64);

        let deadline = Duration::from_secs(1);
        let result = ImageOptimizer::default().optimize_blocking(
            &input,
            &output,
            Instant::now(),
            deadline,
        );

        assert!(matches!(result, Err(OptimizeError::DeadlineExceeded(d)) if d == deadline));
        assert!(!output.exists());
    }
}
