use crate::error::{Error, Result};
use anyhow::Context;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Read-only access to raw OCSF schema documents
#[async_trait::async_trait]
pub trait SchemaSource: Send + Sync {
    /// All versions with stored data, in no particular order
    async fn list_versions(&self) -> Result<Vec<String>>;

    /// Raw JSON text of one version
    async fn load(&self, version: &str) -> Result<String>;
}

/// Schema documents stored as `<dir>/<version>.json`
#[derive(Debug, Clone)]
pub struct FilesystemSchemaSource {
    base_path: PathBuf,
}

impl FilesystemSchemaSource {
    pub fn new(base_path: PathBuf) -> anyhow::Result<Self> {
        if !base_path.is_dir() {
            anyhow::bail!("OCSF schema directory not found: {}", base_path.display());
        }
        let base_path = base_path
            .canonicalize()
            .context("Failed to resolve OCSF schema directory")?;
        Ok(Self { base_path })
    }

    fn schema_path(&self, version: &str) -> Option<PathBuf> {
        // Versions are plain file stems; anything that could escape the directory is unknown
        if version.is_empty() || version.contains(['/', '\\']) || version.starts_with('.') {
            return None;
        }
        Some(self.base_path.join(format!("{}.json", version)))
    }
}

#[async_trait::async_trait]
impl SchemaSource for FilesystemSchemaSource {
    async fn list_versions(&self) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(version) = name.strip_suffix(".json") {
                if !version.is_empty() && entry.file_type().await?.is_file() {
                    versions.push(version.to_string());
                }
            }
        }
        Ok(versions)
    }

    async fn load(&self, version: &str) -> Result<String> {
        let path = self
            .schema_path(version)
            .ok_or_else(|| Error::VersionNotFound(version.to_string()))?;

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::VersionNotFound(version.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(Error::MalformedSchema {
                version: version.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
