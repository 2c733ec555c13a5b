// Mapping of caller-supplied doc paths onto files in the bundle

use crate::docs::store::DocStore;
use crate::error::Result;
use crate::types::{DocFormat, DocumentationEntry};
use std::sync::Arc;

/// Directory inside the docs bundle that holds the pages
pub const DEFAULT_DOCS_PREFIX: &str = "src/content/docs";

/// Strip surrounding slashes and one recognised extension
fn logical_path(path: &str) -> &str {
    let trimmed = path.trim_matches('/');
    DocFormat::ALL
        .iter()
        .find_map(|format| {
            trimmed
                .strip_suffix(format.extension())
                .and_then(|rest| rest.strip_suffix('.'))
        })
        .unwrap_or(trimmed)
}

/// Files to probe, in order, for a logical doc path
pub fn candidate_paths(prefix: &str, path: &str) -> Vec<(DocFormat, String)> {
    let logical = logical_path(path);
    let prefix = prefix.trim_matches('/');
    DocFormat::ALL
        .into_iter()
        .map(|format| {
            let file = if prefix.is_empty() {
                format!("{}.{}", logical, format.extension())
            } else {
                format!("{}/{}.{}", prefix, logical, format.extension())
            };
            (format, file)
        })
        .collect()
}

/// Return the first existing candidate for `path`, or `None` when no page matches
pub async fn resolve_doc(
    store: &dyn DocStore,
    prefix: &str,
    path: &str,
) -> Result<Option<DocumentationEntry>> {
    for (format, candidate) in candidate_paths(prefix, path) {
        if store.exists(&candidate).await {
            let content = store.read(&candidate).await?;
            return Ok(Some(DocumentationEntry {
                path: candidate,
                format,
                content,
            }));
        }
    }
    tracing::debug!("No documentation page for {}", path);
    Ok(None)
}

/// A doc store paired with the prefix its pages live under
#[derive(Clone)]
pub struct DocResolver {
    store: Arc<dyn DocStore>,
    prefix: String,
}

impl DocResolver {
    pub fn new(store: Arc<dyn DocStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocStore> {
        &self.store
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub async fn resolve(&self, path: &str) -> Result<Option<DocumentationEntry>> {
        resolve_doc(self.store.as_ref(), &self.prefix, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::store::FilesystemDocStore;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn resolver(root: &Path) -> DocResolver {
        let store = FilesystemDocStore::new(root.to_path_buf()).unwrap();
        DocResolver::new(Arc::new(store), DEFAULT_DOCS_PREFIX)
    }

    #[test]
    fn test_candidate_paths() {
        let candidates = candidate_paths("src/content/docs", "/reference/functions/abs.md/");
        let files: Vec<_> = candidates.iter().map(|(_, f)| f.as_str()).collect();
        assert_eq!(
            files,
            vec![
                "src/content/docs/reference/functions/abs.md",
                "src/content/docs/reference/functions/abs.mdx",
                "src/content/docs/reference/functions/abs.mdoc",
            ]
        );

        let candidates = candidate_paths("", "explanations/index.mdoc");
        assert_eq!(candidates[0].1, "explanations/index.md");
    }

    #[test]
    fn test_only_one_extension_is_stripped() {
        assert_eq!(logical_path("a/b.md.md"), "a/b.md");
        assert_eq!(logical_path("a/b.txt"), "a/b.txt");
        assert_eq!(logical_path("a/cmd"), "a/cmd");
    }

    #[tokio::test]
    async fn test_resolves_mdx_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "src/content/docs/a/b.mdx", "mdx content");

        let entry = resolver(temp_dir.path()).resolve("a/b").await.unwrap().unwrap();
        assert_eq!(entry.content, "mdx content");
        assert_eq!(entry.format, DocFormat::Mdx);
        assert_eq!(entry.path, "src/content/docs/a/b.mdx");
    }

    #[tokio::test]
    async fn test_markdown_wins_probe_order() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "src/content/docs/page.md", "md");
        write(temp_dir.path(), "src/content/docs/page.mdoc", "mdoc");

        let entry = resolver(temp_dir.path()).resolve("page.mdoc").await.unwrap().unwrap();
        assert_eq!(entry.content, "md");
    }

    #[tokio::test]
    async fn test_absent_page_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let resolved = resolver(temp_dir.path()).resolve("nonexistent/path").await.unwrap();
        assert!(resolved.is_none());
    }
}
