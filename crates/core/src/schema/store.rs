// Versioned OCSF schema lookups with a process-wide load-once cache

use crate::error::{Error, Result};
use crate::schema::document::SchemaDocument;
use crate::schema::source::SchemaSource;
use crate::schema::version::latest_stable;
use crate::types::{EntityRecord, Namespace};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type CacheSlot = Arc<OnceCell<Arc<SchemaDocument>>>;

/// Schema catalog keyed by version string
///
/// Documents are loaded lazily on first access and kept for the lifetime of
/// the store. Concurrent first accesses to the same version share one load.
pub struct SchemaStore {
    source: Arc<dyn SchemaSource>,
    cache: Mutex<HashMap<String, CacheSlot>>,
}

impl SchemaStore {
    pub fn new(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All available versions in ascending string order
    pub async fn list_versions(&self) -> Result<Vec<String>> {
        let mut versions = self.source.list_versions().await?;
        versions.sort();
        Ok(versions)
    }

    /// Newest version that is not a dev, alpha, beta or rc build
    pub async fn default_version(&self) -> Result<String> {
        let versions = self.list_versions().await?;
        match latest_stable(&versions) {
            Some(version) => Ok(version.to_string()),
            None => {
                tracing::warn!("No stable OCSF versions among {} candidates", versions.len());
                Err(Error::NoStableVersion)
            }
        }
    }

    /// Load (or fetch from cache) the document for a version
    pub async fn load_version(&self, version: &str) -> Result<Arc<SchemaDocument>> {
        let slot = {
            let mut cache = self.cache.lock().await;
            cache.entry(version.to_string()).or_default().clone()
        };

        let loaded = slot
            .get_or_try_init(|| async {
                tracing::debug!("Loading OCSF schema version {}", version);
                let text = self.source.load(version).await?;
                let document = SchemaDocument::parse(version, &text)?;
                tracing::info!(
                    "Loaded OCSF schema {} ({} classes, {} objects)",
                    version,
                    document.entities(Namespace::Classes).len(),
                    document.entities(Namespace::Objects).len()
                );
                Ok::<_, Error>(Arc::new(document))
            })
            .await;

        match loaded {
            Ok(document) => Ok(document.clone()),
            Err(e) => {
                // Drop the empty slot so unknown versions do not accumulate
                let mut cache = self.cache.lock().await;
                let is_empty_slot = cache
                    .get(version)
                    .is_some_and(|s| Arc::ptr_eq(s, &slot) && !s.initialized());
                if is_empty_slot {
                    cache.remove(version);
                }
                Err(e)
            }
        }
    }

    /// Find an event class by identifier or display name, ignoring case
    pub async fn find_class(&self, version: &str, name_or_id: &str) -> Result<EntityRecord> {
        self.find(Namespace::Classes, version, name_or_id).await
    }

    /// Find an object by identifier or display name, ignoring case
    pub async fn find_object(&self, version: &str, name_or_id: &str) -> Result<EntityRecord> {
        self.find(Namespace::Objects, version, name_or_id).await
    }

    /// Event class names with their descriptions
    pub async fn event_classes(&self, version: &str) -> Result<BTreeMap<String, String>> {
        let document = self.load_version(version).await?;
        Ok(document.class_descriptions())
    }

    async fn find(
        &self,
        namespace: Namespace,
        version: &str,
        name_or_id: &str,
    ) -> Result<EntityRecord> {
        let document = self.load_version(version).await?;
        document
            .find(namespace, name_or_id)
            .cloned()
            .ok_or_else(|| Error::EntityNotFound {
                kind: namespace,
                name: name_or_id.to_string(),
                version: version.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SCHEMA: &str = r#"{
        "classes": {
            "security_finding": {"name": "security_finding", "description": "Security findings"},
            "network_activity": {"name": "Network Activity", "description": "Network traffic"}
        },
        "objects": {
            "email": {"name": "email", "description": "An email"},
            "device": {"description": "A device"}
        }
    }"#;

    /// In-memory source that counts how often each document is read
    struct CountingSource {
        documents: HashMap<String, String>,
        loads: AtomicUsize,
    }

    impl CountingSource {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                documents: entries
                    .iter()
                    .map(|(v, t)| (v.to_string(), t.to_string()))
                    .collect(),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl SchemaSource for CountingSource {
        async fn list_versions(&self) -> Result<Vec<String>> {
            Ok(self.documents.keys().cloned().collect())
        }

        async fn load(&self, version: &str) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            // Give racing callers a chance to pile up on the same slot
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.documents
                .get(version)
                .cloned()
                .ok_or_else(|| Error::VersionNotFound(version.to_string()))
        }
    }

    fn store_with(entries: &[(&str, &str)]) -> (Arc<CountingSource>, SchemaStore) {
        let source = Arc::new(CountingSource::new(entries));
        let store = SchemaStore::new(source.clone());
        (source, store)
    }

    #[tokio::test]
    async fn test_list_versions_sorted() {
        let (_, store) = store_with(&[("1.3.0", SCHEMA), ("1.0.0", SCHEMA), ("1.10.0", SCHEMA)]);
        let versions = store.list_versions().await.unwrap();
        assert_eq!(versions, vec!["1.0.0", "1.10.0", "1.3.0"]);
    }

    #[tokio::test]
    async fn test_default_version_skips_prereleases() {
        let (_, store) = store_with(&[
            ("1.0.0", SCHEMA),
            ("1.1.0", SCHEMA),
            ("1.2.0-dev", SCHEMA),
            ("1.2.0-rc.1", SCHEMA),
        ]);
        assert_eq!(store.default_version().await.unwrap(), "1.1.0");

        let (_, store) = store_with(&[("1.0.0-beta", SCHEMA), ("1.1.0-Alpha", SCHEMA)]);
        assert!(matches!(
            store.default_version().await.unwrap_err(),
            Error::NoStableVersion
        ));
    }

    #[tokio::test]
    async fn test_load_version_is_cached() {
        let (source, store) = store_with(&[("1.1.0", SCHEMA)]);

        let first = store.load_version("1.1.0").await.unwrap();
        let second = store.load_version("1.1.0").await.unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_share_one_read() {
        let (source, store) = store_with(&[("1.1.0", SCHEMA)]);

        let (a, b, c) = tokio::join!(
            store.load_version("1.1.0"),
            store.load_version("1.1.0"),
            store.find_class("1.1.0", "security_finding"),
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let (source, store) = store_with(&[("1.1.0", SCHEMA)]);

        assert!(store.load_version("9.9.9").await.unwrap_err().is_not_found());
        assert!(store.load_version("9.9.9").await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_versions_leave_no_cache_entries() {
        let (_, store) = store_with(&[("1.1.0", SCHEMA)]);

        for version in ["9.9.9", "invalid-version", "0.0.1"] {
            assert!(store.load_version(version).await.is_err());
        }
        assert!(store.cache.lock().await.is_empty());

        store.load_version("1.1.0").await.unwrap();
        assert_eq!(store.cache.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_class_and_object() {
        let (_, store) = store_with(&[("1.1.0", SCHEMA)]);

        let class = store.find_class("1.1.0", "NETWORK ACTIVITY").await.unwrap();
        assert_eq!(class.id, "network_activity");

        let class = store.find_class("1.1.0", "Security_Finding").await.unwrap();
        assert_eq!(class.name, "security_finding");

        let object = store.find_object("1.1.0", "DEVICE").await.unwrap();
        assert_eq!(object.name, "device");

        let err = store.find_object("1.1.0", "nonexistent_object").await.unwrap_err();
        assert!(matches!(err, Error::EntityNotFound { kind: Namespace::Objects, .. }));
        assert!(err.to_string().contains("nonexistent_object"));
        assert!(err.to_string().contains("1.1.0"));
    }

    #[tokio::test]
    async fn test_unknown_version_lookups() {
        let (_, store) = store_with(&[("1.1.0", SCHEMA)]);

        let err = store.find_class("invalid-version", "security_finding").await.unwrap_err();
        assert!(matches!(err, Error::VersionNotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_malformed_version_is_distinguished() {
        let (_, store) = store_with(&[("1.1.0", "{broken")]);

        let err = store.event_classes("1.1.0").await.unwrap_err();
        assert!(matches!(err, Error::MalformedSchema { .. }));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_event_classes() {
        let (_, store) = store_with(&[("1.1.0", SCHEMA)]);
        let classes = store.event_classes("1.1.0").await.unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes["Network Activity"], "Network traffic");
    }
}
