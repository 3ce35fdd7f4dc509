//! Turns a validated source into a concrete file on disk.
//!
//! Paths are expanded and canonicalized into the resource key used for
//! locking. Inline content is written to a uniquely named file in the
//! scratch directory; the returned [`ResolvedTarget`] deletes that file when
//! dropped, whatever happened in between.

use crate::error::{OperationError, Result};
use crate::validator::Source;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// A file an operation works on
#[derive(Debug)]
pub struct ResolvedTarget {
    resource_key: PathBuf,
    is_ephemeral: bool,
    owns_cleanup: bool,
}

impl ResolvedTarget {
    /// Canonical absolute path; also the lock key
    pub fn resource_key(&self) -> &Path {
        &self.resource_key
    }

    pub fn is_ephemeral(&self) -> bool {
        self.is_ephemeral
    }

    /// Directory tools are started in
    pub fn working_dir(&self) -> Option<&Path> {
        self.resource_key.parent()
    }
}

impl Drop for ResolvedTarget {
    fn drop(&mut self) {
        if !self.owns_cleanup {
            return;
        }
        match std::fs::remove_file(&self.resource_key) {
            Ok(()) => tracing::debug!(
                resource_key = %self.resource_key.display(),
                "Removed temporary content file"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                resource_key = %self.resource_key.display(),
                error = %e,
                "Failed to remove temporary content file"
            ),
        }
    }
}

/// Resolves paths and writes inline content into the scratch directory
#[derive(Debug, Clone)]
pub struct Materializer {
    scratch_dir: PathBuf,
}

impl Materializer {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// `extension` names the temp file suffix when the source is content
    pub async fn materialize(&self, source: &Source, extension: &str) -> Result<ResolvedTarget> {
        match source {
            Source::Path(path) => resolve_path(path).await,
            Source::Content(content) => self.write_content(content, extension).await,
        }
    }

    async fn write_content(&self, content: &str, extension: &str) -> Result<ResolvedTarget> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| scratch_error(&self.scratch_dir, e))?;
        let scratch_dir = tokio::fs::canonicalize(&self.scratch_dir)
            .await
            .map_err(|e| scratch_error(&self.scratch_dir, e))?;

        let file_name = format!("codeops-{}.{}", Uuid::new_v4(), extension);
        let resource_key = scratch_dir.join(file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resource_key)
            .await
            .map_err(|e| {
                OperationError::ExecutionError(format!(
                    "Failed to create temporary file {}: {}",
                    resource_key.display(),
                    e
                ))
            })?;

        // From here on the guard owns the file, including on write failure
        let target = ResolvedTarget {
            resource_key,
            is_ephemeral: true,
            owns_cleanup: true,
        };

        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tracing::debug!(
            resource_key = %target.resource_key.display(),
            bytes = content.len(),
            "Materialized inline content"
        );
        Ok(target)
    }
}

async fn resolve_path(raw: &str) -> Result<ResolvedTarget> {
    let expanded = expand_home(raw)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };

    let canonical = tokio::fs::canonicalize(&absolute).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OperationError::FileNotFound(format!("File not found: {}", raw))
        } else {
            OperationError::FileNotFound(format!("Cannot access {}: {}", raw, e))
        }
    })?;

    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(|e| OperationError::FileNotFound(format!("Cannot access {}: {}", raw, e)))?;
    if !metadata.is_file() {
        return Err(OperationError::FileNotFound(format!(
            "Not a regular file: {}",
            raw
        )));
    }

    Ok(ResolvedTarget {
        resource_key: canonical,
        is_ephemeral: false,
        owns_cleanup: false,
    })
}

/// Expand a leading `~` or `~/` to the home directory
fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return Ok(PathBuf::from(path)),
    };
    let home = dirs::home_dir().ok_or_else(|| {
        OperationError::FileNotFound(format!(
            "Cannot expand {}: home directory is unknown",
            path
        ))
    })?;
    Ok(home.join(rest))
}

fn scratch_error(dir: &Path, err: std::io::Error) -> OperationError {
    OperationError::ExecutionError(format!(
        "Failed to prepare scratch directory {}: {}",
        dir.display(),
        err
    ))
}
