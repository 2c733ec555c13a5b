use crate::error::{Error, Result};
use crate::types::{DocFormat, DocsMetadata};
use anyhow::Context;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Name of the provenance file at the root of the docs bundle
pub const METADATA_FILE: &str = ".metadata.json";

/// Read-only access to the bundled documentation tree
#[async_trait::async_trait]
pub trait DocStore: Send + Sync {
    /// Read a documentation file by its path relative to the docs root
    async fn read(&self, relative_path: &str) -> Result<String>;

    /// Check if a documentation file exists
    async fn exists(&self, relative_path: &str) -> bool;

    /// List documentation files below a directory, relative to the docs root
    async fn list(&self, relative_dir: &str) -> Result<Vec<String>>;

    /// Provenance of the whole bundle
    fn metadata(&self) -> &DocsMetadata;
}

/// Documentation bundle extracted into a local directory
#[derive(Debug, Clone)]
pub struct FilesystemDocStore {
    root: PathBuf,
    metadata: DocsMetadata,
}

impl FilesystemDocStore {
    pub fn new(root: PathBuf) -> anyhow::Result<Self> {
        if !root.is_dir() {
            anyhow::bail!(
                "Documentation not found at {}. Download the docs bundle first.",
                root.display()
            );
        }
        let root = root
            .canonicalize()
            .context("Failed to resolve documentation directory")?;
        let metadata = load_metadata(&root.join(METADATA_FILE));

        tracing::info!(
            "Documentation bundle at {} (commit {})",
            root.display(),
            metadata.short_sha()
        );

        Ok(Self { root, metadata })
    }

    /// Join a caller-supplied path onto the root, refusing anything that walks out of it
    ///
    /// Existing paths are canonicalized so symlinks pointing outside the root
    /// are refused too.
    async fn file_path(&self, relative_path: &str) -> Option<PathBuf> {
        let relative = Path::new(relative_path);
        let is_contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !is_contained {
            return None;
        }

        let path = self.root.join(relative);
        match tokio::fs::canonicalize(&path).await {
            Ok(resolved) if resolved.starts_with(&self.root) => Some(resolved),
            Ok(resolved) => {
                tracing::warn!(
                    "Refusing documentation path {} resolving to {}",
                    relative_path,
                    resolved.display()
                );
                None
            }
            Err(_) => Some(path),
        }
    }
}

fn load_metadata(path: &Path) -> DocsMetadata {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return DocsMetadata::default(),
    };
    match serde_json::from_str(&content) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!("Ignoring unreadable docs metadata {}: {}", path.display(), e);
            DocsMetadata::default()
        }
    }
}

#[async_trait::async_trait]
impl DocStore for FilesystemDocStore {
    async fn read(&self, relative_path: &str) -> Result<String> {
        let path = self
            .file_path(relative_path)
            .await
            .ok_or_else(|| Error::DocNotFound(relative_path.to_string()))?;

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::DocNotFound(relative_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, relative_path: &str) -> bool {
        match self.file_path(relative_path).await {
            Some(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    async fn list(&self, relative_dir: &str) -> Result<Vec<String>> {
        let dir = self
            .file_path(relative_dir.trim_matches('/'))
            .await
            .ok_or_else(|| Error::DocNotFound(relative_dir.to_string()))?;
        if !dir.is_dir() {
            return Err(Error::DocNotFound(relative_dir.to_string()));
        }

        let root = self.root.clone();
        let files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for entry in walkdir::WalkDir::new(&dir).follow_links(false) {
                let Ok(entry) = entry else { continue };
                if !entry.file_type().is_file() || DocFormat::from_path(entry.path()).is_none() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    let parts: Vec<_> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
            files.sort();
            files
        })
        .await
        .map_err(std::io::Error::other)?;

        Ok(files)
    }

    fn metadata(&self) -> &DocsMetadata {
        &self.metadata
    }
}
