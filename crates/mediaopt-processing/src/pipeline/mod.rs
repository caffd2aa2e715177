//! Upload optimization pipeline
//!
//! Guard → validate → classify → download → optimize → replace on success; any
//! failure after the guard goes to quarantine; the workspace is cleaned up last on
//! every path.

pub mod context;
pub mod quarantine;
pub mod replacer;
pub mod runner;

pub use context::{PipelineContext, PipelineSettings};
pub use quarantine::{quarantine, QuarantineReport};
pub use replacer::replace_object;
pub use runner::{process_uploaded_media, InvocationOutcome};
