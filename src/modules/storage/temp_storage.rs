use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};

/// A file materialized on local disk for re-upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFile {
    path: PathBuf,
    dir: PathBuf,
}

impl TempFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Local scratch directory for uploaded bytes.
///
/// Every saved file gets its own UUID-named subdirectory so that concurrent
/// requests using the same file name never touch each other's files, while
/// the file keeps its original name (the remote side shows it as the
/// filename).
#[derive(Debug, Clone)]
pub struct TempFileStore {
    root: PathBuf,
}

impl TempFileStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<TempFile> {
        let file_name = sanitize_file_name(file_name)?;

        let dir = self.root.join(Uuid::now_v7().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(file_name);
        if let Err(e) = tokio::fs::write(&path, data).await {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(e.into());
        }

        debug!("Saved {} bytes to {}", data.len(), path.display());
        Ok(TempFile { path, dir })
    }

    /// Delete a saved file. Failures are logged, never returned.
    pub async fn remove(&self, file: &TempFile) {
        match tokio::fs::remove_dir_all(&file.dir).await {
            Ok(()) => debug!("Removed {}", file.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temp file {}: {}", file.path.display(), e),
        }
    }

    pub async fn remove_all(&self, files: &[TempFile]) {
        for file in files {
            self.remove(file).await;
        }
    }
}

/// Reduce a client-supplied name to a bare file name
fn sanitize_file_name(raw: &str) -> Result<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::ValidationFailed(format!(
            "Invalid file name: '{}'",
            raw
        )));
    }

    Ok(name.to_string())
}
