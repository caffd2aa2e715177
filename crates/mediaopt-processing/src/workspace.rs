//! Per-invocation temporary workspace
//!
//! Each invocation gets its own directory `<root>/mediaopt-<uuid>/` holding the
//! downloaded input (`<basename>`) and the optimizer output (`opt_<basename>`).
//! [`InvocationWorkspace::cleanup`] removes both files and the directory, ignoring
//! anything that was never created. If a workspace is dropped without cleanup the
//! directory is removed synchronously.

use mediaopt_core::constants::OPTIMIZED_FILE_PREFIX;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct InvocationWorkspace {
    dir: PathBuf,
    input: PathBuf,
    output: PathBuf,
    cleaned: bool,
}

/// What cleanup removed and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// File name safe to join onto the workspace directory.
fn local_file_name(object_file_name: &str) -> &str {
    match object_file_name {
        "" | "." | ".." => "input",
        name if name.contains(['/', '\\']) => "input",
        name => name,
    }
}

impl InvocationWorkspace {
    /// Create a fresh workspace under `root` for an object whose last path segment
    /// is `file_name`.
    pub async fn create(root: &Path, file_name: &str) -> io::Result<Self> {
        let dir = root.join(format!("mediaopt-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await?;

        let name = local_file_name(file_name);
        let input = dir.join(name);
        let output = dir.join(format!("{}{}", OPTIMIZED_FILE_PREFIX, name));

        tracing::debug!(dir = %dir.display(), "Workspace created");
        Ok(Self {
            dir,
            input,
            output,
            cleaned: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Local copy of the downloaded object.
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    /// Where the optimizer writes its artifact.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Remove the input copy, the output copy and the directory. Never fails.
    pub async fn cleanup(mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        let (input, output) = tokio::join!(
            remove_file_quietly(&self.input),
            remove_file_quietly(&self.output)
        );
        for (path, result) in [(&self.input, input), (&self.output, output)] {
            match result {
                Ok(true) => report.removed.push(path.clone()),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
                    report.failed.push(path.clone());
                }
            }
        }

        // Anything else an encoder may have left behind goes with the directory.
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to remove workspace directory");
                report.failed.push(self.dir.clone());
            }
        }

        self.cleaned = true;
        tracing::debug!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Workspace cleaned up"
        );
        report
    }
}

/// `Ok(false)` when the file did not exist.
async fn remove_file_quietly(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

impl Drop for InvocationWorkspace {
    fn drop(&mut self) {
        if !self.cleaned {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "Workspace dropped without cleanup and could not be removed");
                }
            }
        }
    }
}
