//! Guard filter
//!
//! Cheap checks on the raw event that decide whether the pipeline runs at all. A skip
//! is not an error: nothing is downloaded, written, deleted or logged to the audit
//! trail.

use mediaopt_core::{MediaObject, UploadEvent};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingPath,
    MissingContentType,
    AlreadyOptimized,
    OutsideIntakePrefix,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingPath => "event has no object path",
            SkipReason::MissingContentType => "event has no content type",
            SkipReason::AlreadyOptimized => "object is already optimized",
            SkipReason::OutsideIntakePrefix => "object is outside the intake prefix",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed(MediaObject),
    Skip(SkipReason),
}

/// Decide whether an event should be processed.
///
/// Checks run in a fixed order: missing path or content type, processed marker,
/// intake prefix. The prefix is only checked here; downstream stages trust it.
pub fn evaluate(event: &UploadEvent, intake_prefix: &str) -> GuardDecision {
    let path = match event.path.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return GuardDecision::Skip(SkipReason::MissingPath),
    };
    let content_type = match event.content_type.as_deref() {
        Some(c) if !c.is_empty() => c,
        _ => return GuardDecision::Skip(SkipReason::MissingContentType),
    };

    if event.is_marked_processed() {
        return GuardDecision::Skip(SkipReason::AlreadyOptimized);
    }

    if !path.starts_with(intake_prefix) {
        return GuardDecision::Skip(SkipReason::OutsideIntakePrefix);
    }

    GuardDecision::Proceed(MediaObject {
        bucket: event.bucket.clone(),
        path: path.to_string(),
        content_type: content_type.to_string(),
        size: event.size,
        metadata: event.metadata.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn event(path: Option<&str>, content_type: Option<&str>) -> UploadEvent {
        UploadEvent {
            bucket: "media".to_string(),
            path: path.map(String::from),
            content_type: content_type.map(String::from),
            size: 100,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_missing_fields_skip() {
        assert_eq!(
            evaluate(&event(None, Some("image/jpeg")), "uploads/"),
            GuardDecision::Skip(SkipReason::MissingPath)
        );
        assert_eq!(
            evaluate(&event(Some("uploads/a.jpg"), None), "uploads/"),
            GuardDecision::Skip(SkipReason::MissingContentType)
        );
        assert_eq!(
            evaluate(&event(Some("uploads/a.jpg"), Some("")), "uploads/"),
            GuardDecision::Skip(SkipReason::MissingContentType)
        );
    }

    #[test]
    fn test_marker_skips() {
        let mut e = event(Some("uploads/a.jpg"), Some("image/jpeg"));
        e.metadata
            .insert("optimized".to_string(), "true".to_string());
        assert_eq!(
            evaluate(&e, "uploads/"),
            GuardDecision::Skip(SkipReason::AlreadyOptimized)
        );
    }

    #[test]
    fn test_prefix_is_enforced() {
        for path in ["avatars/a.jpg", "a.jpg", "Uploads/a.jpg", "x/uploads/a.jpg"] {
            assert_eq!(
                evaluate(&event(Some(path), Some("image/jpeg")), "uploads/"),
                GuardDecision::Skip(SkipReason::OutsideIntakePrefix),
                "{path}"
            );
        }
    }

    #[test]
    fn test_proceed_carries_event_fields() {
        let mut e = event(Some("uploads/a.jpg"), Some("image/jpeg"));
        e.metadata
            .insert("owner".to_string(), "user-1".to_string());
        match evaluate(&e, "uploads/") {
            GuardDecision::Proceed(media) => {
                assert_eq!(media.bucket, "media");
                assert_eq!(media.path, "uploads/a.jpg");
                assert_eq!(media.size, 100);
                assert_eq!(media.metadata.get("owner").map(String::as_str), Some("user-1"));
            }
            other => panic!("expected proceed, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_size_is_not_a_guard_concern() {
        let mut e = event(Some("uploads/b.mp4"), Some("video/mp4"));
        e.size = 0;
        assert!(matches!(evaluate(&e, "uploads/"), GuardDecision::Proceed(_)));
    }
}
