use crate::common::MEMORY_SCHEME;
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::store::{DocumentStore, MemoryStore};
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

static MEMORY_STORES: LazyLock<DashMap<String, MemoryStore>> = LazyLock::new(DashMap::new);

/// A shared handle to a document store.
///
/// `StoreClient` wraps the store behind an `Arc`, so clones are cheap and
/// share the same connection. It is immutable once built.
///
/// ```rust,ignore
/// // process-wide named in-memory store
/// let client = StoreClient::connect("memory://shop")?;
///
/// // any other driver
/// let client = StoreClient::new("mongodb://db:27017", Arc::new(driver));
/// ```
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<StoreClientInner>,
}

struct StoreClientInner {
    endpoint: String,
    store: Arc<dyn DocumentStore>,
}

impl StoreClient {
    pub fn new(endpoint: &str, store: Arc<dyn DocumentStore>) -> StoreClient {
        StoreClient {
            inner: Arc::new(StoreClientInner {
                endpoint: endpoint.to_string(),
                store,
            }),
        }
    }

    /// Resolves `memory://<name>` to the in-memory store registered under
    /// `name`, creating it on first use. No network driver ships with this
    /// crate; plug one in with [StoreClient::new].
    pub fn connect(endpoint: &str) -> RepoResult<StoreClient> {
        let store = Self::memory_store(endpoint)?;
        log::info!("Connected to {}", endpoint);
        Ok(StoreClient::new(endpoint, Arc::new(store)))
    }

    /// The in-memory store behind a `memory://<name>` endpoint.
    pub fn memory_store(endpoint: &str) -> RepoResult<MemoryStore> {
        let name = match endpoint.strip_prefix(MEMORY_SCHEME) {
            Some(name) if !name.is_empty() => name,
            _ => {
                log::error!("Unsupported store endpoint {}", endpoint);
                return Err(RepoError::new(
                    &format!("unsupported store endpoint '{}', expected {}<name>", endpoint, MEMORY_SCHEME),
                    ErrorKind::StoreFailure,
                ));
            }
        };

        let store = MEMORY_STORES
            .entry(name.to_string())
            .or_insert_with(MemoryStore::new)
            .value()
            .clone();
        Ok(store)
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }
}

impl Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("endpoint", &self.inner.endpoint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Document;
    use crate::query::WriteConcern;
    use crate::store::Namespace;

    #[test]
    fn test_connect_rejects_other_schemes() {
        let err = StoreClient::connect("mongodb://localhost:27017").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreFailure);

        let err = StoreClient::connect("memory://").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::StoreFailure);
    }

    #[tokio::test]
    async fn test_memory_endpoints_are_shared_by_name() {
        let first = StoreClient::connect("memory://client-test-shared").unwrap();
        let second = StoreClient::connect("memory://client-test-shared").unwrap();
        let other = StoreClient::connect("memory://client-test-other").unwrap();
        let ns = Namespace::new("db", "c");

        first
            .store()
            .insert_one(&ns, Document::new(), WriteConcern::W1)
            .await
            .unwrap();

        let store = StoreClient::memory_store("memory://client-test-shared").unwrap();
        assert_eq!(store.document_count(&ns), 1);
        assert_eq!(second.endpoint(), "memory://client-test-shared");

        let other_store = StoreClient::memory_store(other.endpoint()).unwrap();
        assert_eq!(other_store.document_count(&ns), 0);
    }
}
