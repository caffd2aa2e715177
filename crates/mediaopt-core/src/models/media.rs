use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{PROCESSED_MARKER_KEY, PROCESSED_MARKER_VALUE};

/// Raw object-finalized event, one per invocation.
///
/// Path and content type are optional because the event source may omit them; the
/// guard filter turns a missing value into a skip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvent {
    pub bucket: String,
    #[serde(default, alias = "name")]
    pub path: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "size_from_number_or_string")]
    pub size: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: HashMap<String, String>,
}

impl UploadEvent {
    pub fn is_marked_processed(&self) -> bool {
        is_marked_processed(&self.metadata)
    }
}

/// Object stores report the size either as a JSON number or as a decimal string.
fn size_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Number(u64),
        Text(String),
        Null(()),
    }

    match RawSize::deserialize(deserializer)? {
        RawSize::Number(n) => Ok(n),
        RawSize::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid size '{}': {}", s, e))),
        RawSize::Null(()) => Ok(0),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// An object under the intake prefix that passed the guard filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    pub bucket: String,
    pub path: String,
    pub content_type: String,
    pub size: u64,
    pub metadata: HashMap<String, String>,
}

impl MediaObject {
    /// Last path segment, e.g. `a.jpg` for `uploads/a.jpg`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lowercased extension with its leading dot (`.png`), or `None` when the file
    /// name has no extension.
    pub fn extension(&self) -> Option<String> {
        Path::new(self.file_name())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
    }

    pub fn is_marked_processed(&self) -> bool {
        is_marked_processed(&self.metadata)
    }

    /// Metadata for the replacement object: every declared key kept, marker set.
    pub fn processed_metadata(&self) -> HashMap<String, String> {
        let mut metadata = self.metadata.clone();
        metadata.insert(
            PROCESSED_MARKER_KEY.to_string(),
            PROCESSED_MARKER_VALUE.to_string(),
        );
        metadata
    }
}

pub fn is_marked_processed(metadata: &HashMap<String, String>) -> bool {
    metadata
        .get(PROCESSED_MARKER_KEY)
        .is_some_and(|v| v == PROCESSED_MARKER_VALUE)
}

/// Processing branch selected from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let normalized = content_type.trim().to_lowercase();
        if normalized.starts_with("image/") {
            Some(MediaKind::Image)
        } else if normalized.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Local output of one optimizer run, consumed once by the storage replacer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedArtifact {
    pub path: PathBuf,
    pub content_type: String,
}
