use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timeout applied when a caller does not ask for one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single pipeline run against the external runtime
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub pipeline: String,
    pub input: Option<Bytes>,
    pub timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            input: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_input(mut self, input: impl Into<Bytes>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub elapsed: Duration,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            output: output.into(),
            elapsed,
        }
    }

    pub fn failure(output: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            output: output.into(),
            elapsed,
        }
    }
}

/// The two entity namespaces of an OCSF schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Classes,
    Objects,
}

impl Namespace {
    /// Top-level key of the namespace in the schema JSON
    pub fn key(&self) -> &'static str {
        match self {
            Self::Classes => "classes",
            Self::Objects => "objects",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classes => write!(f, "Class"),
            Self::Objects => write!(f, "Object"),
        }
    }
}

/// A class or object definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub description: Option<String>,
    pub data: serde_json::Value,
}

impl EntityRecord {
    /// Case-insensitive match against the identifier or the display name
    pub fn matches(&self, name_or_id: &str) -> bool {
        let needle = name_or_id.to_lowercase();
        self.name.to_lowercase() == needle || self.id.to_lowercase() == needle
    }
}

/// Markup dialects present in the documentation bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    Markdown,
    Mdx,
    Markdoc,
}

impl DocFormat {
    /// Probe order used when a caller omits the extension
    pub const ALL: [DocFormat; 3] = [DocFormat::Markdown, DocFormat::Mdx, DocFormat::Markdoc];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Mdx => "mdx",
            Self::Markdoc => "mdoc",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// One documentation page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationEntry {
    pub path: String,
    pub format: DocFormat,
    pub content: String,
}

/// Provenance of the documentation bundle as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsMetadata {
    #[serde(default = "default_commit_sha")]
    pub commit_sha: String,
    #[serde(default = "default_repository")]
    pub repository: String,
    #[serde(default)]
    pub download_timestamp: Option<DateTime<Utc>>,
}

fn default_commit_sha() -> String {
    "unknown".to_string()
}

fn default_repository() -> String {
    "https://github.com/tenzir/docs".to_string()
}

impl Default for DocsMetadata {
    fn default() -> Self {
        Self {
            commit_sha: default_commit_sha(),
            repository: default_repository(),
            download_timestamp: None,
        }
    }
}

impl DocsMetadata {
    pub fn short_sha(&self) -> &str {
        self.commit_sha.get(..8).unwrap_or(&self.commit_sha)
    }
}
