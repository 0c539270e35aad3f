//! Directory listing and file reads confined to one root
//!
//! Relative paths are checked lexically (no absolute paths, no `..`) and then
//! again after symlink resolution, so nothing outside the root is ever read.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FilesystemError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path escapes the filesystem root: {0}")]
    PathTraversal(String),

    #[error("Not a regular file: {0}")]
    NotAFile(String),

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone)]
pub struct FilesystemService {
    root: PathBuf,
}

impl FilesystemService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Immediate entries of the root, sorted by name
    pub async fn list(&self) -> Result<Vec<FileEntry>, FilesystemError> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|source| self.io_error(&self.root, source))?;

        let mut files = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|source| self.io_error(&self.root, source))?
        {
            // Follows symlinks, like a plain stat would.
            let is_dir = tokio::fs::metadata(entry.path())
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Reads a UTF-8 file below the root
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - File content, possibly empty
    /// * `Err(FilesystemError::NotFound)` - No such file
    /// * `Err(FilesystemError::PathTraversal)` - Path leaves the root
    /// * `Err(FilesystemError::NotAFile)` - Path names a directory
    pub async fn read(&self, relative: &str) -> Result<String, FilesystemError> {
        let target = self.resolve(relative).await?;

        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|source| self.classify(relative, &target, source))?;
        if !metadata.is_file() {
            return Err(FilesystemError::NotAFile(relative.to_string()));
        }

        tokio::fs::read_to_string(&target)
            .await
            .map_err(|source| self.classify(relative, &target, source))
    }

    async fn resolve(&self, relative: &str) -> Result<PathBuf, FilesystemError> {
        let requested = Path::new(relative);
        let escapes = requested
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            tracing::warn!(path = %relative, "Rejected path outside filesystem root");
            return Err(FilesystemError::PathTraversal(relative.to_string()));
        }

        let target = self.root.join(requested);
        let canonical_root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|source| self.io_error(&self.root, source))?;
        let canonical_target = tokio::fs::canonicalize(&target)
            .await
            .map_err(|source| self.classify(relative, &target, source))?;

        if !canonical_target.starts_with(&canonical_root) {
            tracing::warn!(path = %relative, "Rejected symlink outside filesystem root");
            return Err(FilesystemError::PathTraversal(relative.to_string()));
        }
        Ok(canonical_target)
    }

    fn classify(&self, relative: &str, path: &Path, source: std::io::Error) -> FilesystemError {
        if source.kind() == std::io::ErrorKind::NotFound {
            FilesystemError::NotFound(relative.to_string())
        } else {
            self.io_error(path, source)
        }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> FilesystemError {
        FilesystemError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
