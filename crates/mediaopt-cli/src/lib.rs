//! MediaOpt CLI helpers: event construction and outcome reporting for the
//! `mediaopt` binary.

use anyhow::Context;
use mediaopt_core::UploadEvent;
use mediaopt_processing::InvocationOutcome;
use mediaopt_storage::Storage;
use serde_json::json;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Parse a `key=value` metadata argument.
pub fn parse_metadata_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty metadata key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Read an object-finalized event as JSON from a file, or from stdin when the
/// source is `-`.
pub fn read_event(source: &str) -> anyhow::Result<UploadEvent> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("Failed to read event file {}", source))?
    };
    serde_json::from_str(&raw).context("Failed to parse event JSON")
}

/// Object named on the command line, with whatever attributes were given.
#[derive(Debug, Clone, Default)]
pub struct ObjectArgs {
    pub bucket: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub metadata: Vec<(String, String)>,
}

/// Build an event for an existing object.
///
/// Attributes missing from the arguments are read from the store with a `head`
/// call. Metadata given on the command line replaces the stored metadata.
pub async fn event_from_object(storage: &dyn Storage, args: ObjectArgs) -> anyhow::Result<UploadEvent> {
    let explicit_metadata: HashMap<String, String> = args.metadata.into_iter().collect();

    let (content_type, size, metadata) = match (args.content_type, args.size) {
        (Some(content_type), Some(size)) => (Some(content_type), size, explicit_metadata),
        (content_type, size) => {
            let info = storage
                .head(&args.bucket, &args.path)
                .await
                .with_context(|| format!("Failed to read attributes of {}/{}", args.bucket, args.path))?;
            let metadata = if explicit_metadata.is_empty() {
                info.metadata
            } else {
                explicit_metadata
            };
            (
                content_type.or(info.content_type),
                size.unwrap_or(info.size),
                metadata,
            )
        }
    };

    Ok(UploadEvent {
        bucket: args.bucket,
        path: Some(args.path),
        content_type,
        size,
        metadata,
    })
}

/// Machine-readable summary printed after an invocation.
pub fn outcome_summary(outcome: &InvocationOutcome) -> serde_json::Value {
    match outcome {
        InvocationOutcome::Skipped(reason) => json!({
            "outcome": "skipped",
            "reason": reason.to_string(),
        }),
        InvocationOutcome::Optimized { path, content_type } => json!({
            "outcome": "optimized",
            "path": path,
            "contentType": content_type,
        }),
        InvocationOutcome::Quarantined { error, report } => json!({
            "outcome": "quarantined",
            "path": error.path(),
            "errorKind": error.kind().as_str(),
            "reason": error.reason(),
            "deletedFromStorage": report.deleted_from_storage,
            "postDeleted": report.post_deleted,
            "auditAppended": report.audit_appended,
        }),
        InvocationOutcome::Aborted { reason } => json!({
            "outcome": "aborted",
            "reason": reason,
        }),
    }
}

/// Process exit code for an outcome. Quarantine is a handled result.
pub fn exit_code(outcome: &InvocationOutcome) -> i32 {
    match outcome {
        InvocationOutcome::Aborted { .. } => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaopt_processing::SkipReason;
    use mediaopt_storage::InMemoryStorage;
    use std::io::Write;

    #[test]
    fn test_parse_metadata_pair() {
        assert_eq!(
            parse_metadata_pair("owner=user-1").unwrap(),
            ("owner".to_string(), "user-1".to_string())
        );
        assert_eq!(
            parse_metadata_pair("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_metadata_pair("novalue").is_err());
        assert!(parse_metadata_pair("=x").is_err());
    }

    #[test]
    fn test_read_event_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bucket":"media","name":"uploads/a.jpg","contentType":"image/jpeg","size":"42"}}"#
        )
        .unwrap();

        let event = read_event(file.path().to_str().unwrap()).unwrap();
        assert_eq!(event.bucket, "media");
        assert_eq!(event.path.as_deref(), Some("uploads/a.jpg"));
        assert_eq!(event.size, 42);
    }

    #[test]
    fn test_read_event_missing_file() {
        assert!(read_event("/nonexistent/event.json").is_err());
    }

    #[tokio::test]
    async fn test_event_from_object_fills_gaps_from_head() {
        let storage = InMemoryStorage::new();
        let mut stored = HashMap::new();
        stored.insert("owner".to_string(), "user-1".to_string());
        storage.insert("media", "uploads/a.jpg", vec![1, 2, 3], "image/jpeg", stored);

        let event = event_from_object(
            &storage,
            ObjectArgs {
                bucket: "media".to_string(),
                path: "uploads/a.jpg".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(event.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(event.size, 3);
        assert_eq!(event.metadata.get("owner").map(String::as_str), Some("user-1"));
    }

    #[tokio::test]
    async fn test_event_from_object_without_head_when_complete() {
        let storage = InMemoryStorage::new();

        let event = event_from_object(
            &storage,
            ObjectArgs {
                bucket: "media".to_string(),
                path: "uploads/b.mp4".to_string(),
                content_type: Some("video/mp4".to_string()),
                size: Some(0),
                metadata: vec![("optimized".to_string(), "true".to_string())],
            },
        )
        .await
        .unwrap();

        assert_eq!(event.size, 0);
        assert!(event.is_marked_processed());
    }

    #[tokio::test]
    async fn test_event_from_object_missing_object() {
        let storage = InMemoryStorage::new();
        let result = event_from_object(
            &storage,
            ObjectArgs {
                bucket: "media".to_string(),
                path: "uploads/gone.jpg".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_exit_code_and_summary() {
        let skipped = InvocationOutcome::Skipped(SkipReason::AlreadyOptimized);
        assert_eq!(exit_code(&skipped), 0);
        assert_eq!(outcome_summary(&skipped)["outcome"], "skipped");

        let aborted = InvocationOutcome::Aborted {
            reason: "boom".to_string(),
        };
        assert_eq!(exit_code(&aborted), 1);
        assert_eq!(outcome_summary(&aborted)["reason"], "boom");
    }
}
