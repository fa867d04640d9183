//! File store operations over jailed paths.
//!
//! All operations take a [`ResolvedPath`], so the only way in is through
//! [`crate::path::PathJail`]. There is no locking: concurrent writers to the
//! same file race at the OS level.

use crate::error::StoreError;
use crate::path::ResolvedPath;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;
use tokio::fs;

/// Kind of a listing entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
}

/// One row of a directory listing.
///
/// Recomputed from filesystem metadata on every request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub name: String,
    /// Size in bytes; always 0 for directories
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: EntryType,
    /// Modification time, milliseconds since the Unix epoch
    pub date: u64,
}

impl ListingEntry {
    fn from_metadata(name: String, meta: &Metadata) -> Self {
        let is_dir = meta.is_dir();
        let date = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            name,
            size: if is_dir { 0 } else { meta.len() },
            kind: if is_dir { EntryType::Dir } else { EntryType::File },
            date,
        }
    }
}

/// Read/write/delete/list operations on the served tree.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
    protected: HashSet<String>,
}

impl FileStore {
    /// Create a store that refuses to delete any file whose base name is in `protected`.
    pub fn new<I, S>(protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected: protected.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` names a protected file.
    pub fn is_protected(&self, path: &ResolvedPath) -> bool {
        path.file_name()
            .map(|name| self.protected.contains(name))
            .unwrap_or(false)
    }

    /// Read a whole file. Directories are reported as `NotFound`.
    pub async fn read_file(&self, path: &ResolvedPath) -> Result<Vec<u8>, StoreError> {
        self.require_file(path).await?;
        fs::read(path)
            .await
            .map_err(|e| StoreError::from_io(e, path.relative()))
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub async fn write_file(&self, path: &ResolvedPath, data: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        tracing::debug!("Wrote {} bytes to {}", data.len(), path);
        Ok(())
    }

    /// Replace the content of an existing file.
    pub async fn update_file(&self, path: &ResolvedPath, data: &[u8]) -> Result<(), StoreError> {
        self.require_file(path).await?;
        fs::write(path, data).await?;
        tracing::debug!("Updated {} ({} bytes)", path, data.len());
        Ok(())
    }

    /// Delete a file, refusing protected names.
    pub async fn delete_file(&self, path: &ResolvedPath) -> Result<(), StoreError> {
        if self.is_protected(path) {
            return Err(StoreError::Forbidden(path.relative().to_string()));
        }
        self.require_file(path).await?;
        fs::remove_file(path)
            .await
            .map_err(|e| StoreError::from_io(e, path.relative()))?;
        tracing::info!("Deleted {}", path);
        Ok(())
    }

    /// List a directory.
    ///
    /// Entry metadata follows symlinks; a dangling link is reported with its
    /// own metadata. Entries are sorted by name.
    pub async fn list_directory(
        &self,
        path: &ResolvedPath,
    ) -> Result<Vec<ListingEntry>, StoreError> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| StoreError::from_io(e, path.relative()))?;
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory(path.relative().to_string()));
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(_) => match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(e) => {
                        tracing::warn!("Skipping {} in {}: {}", name, path, e);
                        continue;
                    }
                },
            };
            entries.push(ListingEntry::from_metadata(name, &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn require_file(&self, path: &ResolvedPath) -> Result<(), StoreError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(StoreError::NotFound(path.relative().to_string())),
            Err(e) => Err(StoreError::from_io(e, path.relative())),
        }
    }
}
