//! Image optimization: bounded downscale and JPEG re-encode

pub mod optimizer;

pub use optimizer::ImageOptimizer;
