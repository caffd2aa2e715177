//! Mediaopt Processing Library
//!
//! This crate implements the upload optimization pipeline: the guard filter, the
//! validator and classifier, the image and video optimizers, the storage replacer,
//! quarantine and the per-invocation workspace that is always cleaned up.
//!
//! The entry point is [`process_uploaded_media`], which takes an explicit
//! [`PipelineContext`] holding the object store, the record store and the optimizers.

pub mod classifier;
pub mod guard;
#[cfg(feature = "image")]
pub mod image;
pub mod pipeline;
pub mod traits;
pub mod validator;
#[cfg(feature = "video")]
pub mod video;
pub mod workspace;

// Re-export commonly used types
pub use classifier::classify;
pub use guard::{evaluate, GuardDecision, SkipReason};
#[cfg(feature = "image")]
pub use image::ImageOptimizer;
pub use pipeline::{
    process_uploaded_media, quarantine, replace_object, InvocationOutcome, PipelineContext,
    PipelineSettings, QuarantineReport,
};
pub use traits::{OptimizeError, Optimizer};
pub use validator::MediaValidator;
#[cfg(feature = "video")]
pub use video::VideoTranscoder;
pub use workspace::{CleanupReport, InvocationWorkspace};
