//! Object store backends
//!
//! Objects live in named containers and are addressed by a flat key. The
//! service only asks two things of a backend: does an object exist, and
//! what public URL refers to it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::StoreError;

/// Read capability over the object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `key` exists in `container`
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError>;

    /// Stable public reference to an object. Never carries access tokens.
    fn public_url(&self, container: &str, key: &str) -> Result<String, StoreError>;
}

/// Object store backend configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ObjectStoreBackend {
    /// Blob service reachable over HTTP(S), probed with HEAD requests
    Http {
        endpoint: String,
        #[serde(default)]
        sas_token: Option<String>,
    },

    /// Directory on local disk, one subdirectory per container
    Local {
        root: PathBuf,
        public_base_url: String,
    },

    /// Process-local set of keys (development and testing)
    #[default]
    Memory,
}

/// Create the object store described by the configuration
pub fn create_object_store(
    backend: &ObjectStoreBackend,
    timeout: Duration,
) -> Result<Arc<dyn ObjectStore>, StoreError> {
    match backend {
        ObjectStoreBackend::Http {
            endpoint,
            sas_token,
        } => {
            info!("Using HTTP object store at {}", endpoint);
            Ok(Arc::new(HttpObjectStore::new(
                endpoint,
                sas_token.clone(),
                timeout,
            )?))
        }
        ObjectStoreBackend::Local {
            root,
            public_base_url,
        } => {
            info!("Using local object store at {}", root.display());
            Ok(Arc::new(LocalObjectStore::new(root.clone(), public_base_url)?))
        }
        ObjectStoreBackend::Memory => {
            warn!("Using in-memory object store; every photo lookup will miss");
            Ok(Arc::new(MemoryObjectStore::new()))
        }
    }
}

/// Append container and key as escaped path segments
fn object_url(base: &Url, container: &str, key: &str) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push(container)
        .push(key);
    Ok(url)
}

/// Blob service over HTTP
///
/// Existence is a HEAD on `{endpoint}/{container}/{key}` with the shared
/// access token appended as the query string. Public URLs omit the token.
pub struct HttpObjectStore {
    client: Client,
    endpoint: Url,
    sas_token: Option<String>,
}

impl HttpObjectStore {
    /// Create a store for `endpoint`. A query string on the endpoint is
    /// treated as the access token when none is given explicitly.
    pub fn new(
        endpoint: &str,
        sas_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut endpoint =
            Url::parse(endpoint).map_err(|_| StoreError::InvalidUrl(endpoint.to_string()))?;
        let sas_token = sas_token
            .or_else(|| endpoint.query().map(str::to_string))
            .map(|t| t.trim_start_matches('?').to_string())
            .filter(|t| !t.is_empty());
        endpoint.set_query(None);

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            sas_token,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        let mut url = object_url(&self.endpoint, container, key)?;
        url.set_query(self.sas_token.as_deref());

        let response = self.client.head(url).send().await?;
        debug!("HEAD {}/{} -> {}", container, key, response.status());

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(StoreError::UnexpectedStatus {
                status: s.as_u16(),
                key: format!("{}/{}", container, key),
            }),
        }
    }

    fn public_url(&self, container: &str, key: &str) -> Result<String, StoreError> {
        Ok(object_url(&self.endpoint, container, key)?.to_string())
    }
}

/// A key is safe when it names exactly one entry inside its directory
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Objects stored as files under `{root}/{container}/{key}`
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: Url,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base_url: &str) -> Result<Self, StoreError> {
        let public_base = Url::parse(public_base_url)
            .map_err(|_| StoreError::InvalidUrl(public_base_url.to_string()))?;
        Ok(Self { root, public_base })
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        if !is_plain_name(container) || !is_plain_name(key) {
            debug!("Rejected unsafe object key {:?}/{:?}", container, key);
            return Ok(false);
        }

        match tokio::fs::metadata(self.root.join(container).join(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, container: &str, key: &str) -> Result<String, StoreError> {
        Ok(object_url(&self.public_base, container, key)?.to_string())
    }
}

/// Base for public URLs handed out by the in-memory store
const MEMORY_BASE_URL: &str = "memory://objects/";

/// In-memory object store
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashSet<(String, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object
    pub fn insert(&self, container: &str, key: &str) {
        self.objects
            .write()
            .insert((container.to_string(), key.to_string()));
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .objects
            .read()
            .contains(&(container.to_string(), key.to_string())))
    }

    fn public_url(&self, container: &str, key: &str) -> Result<String, StoreError> {
        let base = Url::parse(MEMORY_BASE_URL)
            .map_err(|_| StoreError::InvalidUrl(MEMORY_BASE_URL.to_string()))?;
        Ok(object_url(&base, container, key)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_public_url_strips_token() {
        let store = HttpObjectStore::new(
            "https://acct.blob.example.net?sv=2024&sig=secret",
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(store.sas_token.as_deref(), Some("sv=2024&sig=secret"));
        let url = store.public_url("media-dev", "janedoe.jpg").unwrap();
        assert_eq!(url, "https://acct.blob.example.net/media-dev/janedoe.jpg");
    }

    #[test]
    fn test_http_explicit_token_wins() {
        let store = HttpObjectStore::new(
            "https://acct.blob.example.net/?old=1",
            Some("?sig=new".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(store.sas_token.as_deref(), Some("sig=new"));
    }

    #[test]
    fn test_object_url_escapes_key() {
        let base = Url::parse("https://cdn.example.com/assets/").unwrap();
        let url = object_url(&base, "media-dev", "a/b?c.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/assets/media-dev/a%2Fb%3Fc.jpg"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = HttpObjectStore::new("not a url", None, Duration::from_secs(5));
        assert!(matches!(result, Err(StoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("janedoe.jpg"));
        assert!(is_plain_name("..jpg"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../secret.jpg"));
        assert!(!is_plain_name("a\\b.png"));
        assert!(!is_plain_name(""));
    }

    #[tokio::test]
    async fn test_local_store_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("media-dev")).unwrap();
        std::fs::write(dir.path().join("media-dev/janedoe.png"), b"png").unwrap();
        std::fs::create_dir(dir.path().join("media-dev/folder.jpg")).unwrap();

        let store =
            LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost/media").unwrap();

        assert!(store.exists("media-dev", "janedoe.png").await.unwrap());
        assert!(!store.exists("media-dev", "janedoe.jpg").await.unwrap());
        assert!(!store.exists("media-dev", "folder.jpg").await.unwrap());
        assert!(!store.exists("media-dev", "../media-dev/janedoe.png").await.unwrap());
        assert!(!store.exists("missing", "janedoe.png").await.unwrap());

        assert_eq!(
            store.public_url("media-dev", "janedoe.png").unwrap(),
            "http://localhost/media/media-dev/janedoe.png"
        );
    }

    #[tokio::test]
    async fn test_memory_store_scoped_by_container() {
        let store = MemoryObjectStore::new();
        store.insert("media-dev", "janedoe.png");

        assert!(!store.exists("media-dev", "janedoe.jpg").await.unwrap());
        assert!(store.exists("media-dev", "janedoe.png").await.unwrap());
        assert!(!store.exists("other", "janedoe.png").await.unwrap());
        assert_eq!(
            store.public_url("media-dev", "janedoe.png").unwrap(),
            "memory://objects/media-dev/janedoe.png"
        );
        assert_eq!(
            store.public_url("media-dev", "o?neil#1.jpg").unwrap(),
            "memory://objects/media-dev/o%3Fneil%231.jpg"
        );
    }

    #[test]
    fn test_backend_config_tags() {
        let backend: ObjectStoreBackend = serde_json::from_str(
            r#"{"backend":"http","endpoint":"https://acct.blob.example.net"}"#,
        )
        .unwrap();
        assert_eq!(
            backend,
            ObjectStoreBackend::Http {
                endpoint: "https://acct.blob.example.net".to_string(),
                sas_token: None,
            }
        );

        let backend: ObjectStoreBackend =
            serde_json::from_str(r#"{"backend":"memory"}"#).unwrap();
        assert_eq!(backend, ObjectStoreBackend::Memory);
    }
}
