//! Optimizer contract
//!
//! Both media strategies turn a local input file into a local output file and report
//! the content type of what they wrote. The pipeline waits for the result; there is no
//! partial output.

use async_trait::async_trait;
use mediaopt_core::{MediaKind, OptimizedArtifact};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode input: {0}")]
    Decode(String),

    #[error("Failed to encode output: {0}")]
    Encode(String),

    #[error("Failed to start encoder '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Encoder exited with {status}: {diagnostic}")]
    Process { status: String, diagnostic: String },

    #[error("Encoder did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Optimizer task failed: {0}")]
    Task(String),
}

/// Format-specific optimization strategy.
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Media kind this strategy handles.
    fn kind(&self) -> MediaKind;

    /// Read `input`, write the optimized result to `output`.
    ///
    /// Implementations must give up once `deadline` has elapsed and must not leave a
    /// running child process behind when they do.
    async fn optimize(
        &self,
        input: &Path,
        output: &Path,
        deadline: Duration,
    ) -> Result<OptimizedArtifact, OptimizeError>;
}
