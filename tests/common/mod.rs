//! Common test utilities - CareershotTest harness for end-to-end testing

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use careershot::auth::{hash_token, AuthConfig};
use careershot::storage::ObjectStoreBackend;
use careershot::{Config, Server};
use reqwest::Client;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Bearer token accepted by every test server
pub const TEST_TOKEN: &str = "test-token";

/// Public base URL of the local object store
pub const MEDIA_BASE: &str = "https://media.example.com";

/// Container the resolver reads from
pub const CONTAINER: &str = "media-dev";

/// Test harness that runs a real careershot server on a random port
pub struct CareershotTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
    /// Holds the database file and object store root (cleaned up on drop)
    temp_dir: TempDir,
}

impl CareershotTest {
    /// Start a new test server instance
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Start a test server after adjusting its configuration
    pub async fn start_with(configure: impl FnOnce(&mut Config)) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let objects_root = temp_dir.path().join("objects");
        std::fs::create_dir_all(objects_root.join(CONTAINER))?;

        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let mut config = Config {
            bind_addr: addr,
            database: Some(temp_dir.path().join("profiles.db").display().to_string()),
            object_store: ObjectStoreBackend::Local {
                root: objects_root,
                public_base_url: MEDIA_BASE.to_string(),
            },
            auth: AuthConfig {
                token_sha256: vec![hash_token(TEST_TOKEN)],
                ..AuthConfig::default()
            },
            ..Config::default()
        };
        configure(&mut config);

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
            temp_dir,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make an unauthenticated GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a GET request with the test bearer token
    pub async fn get_auth(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .bearer_auth(TEST_TOKEN)
            .send()
            .await?)
    }

    /// Look up a name through the API
    pub async fn lookup(&self, name: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}/api/user", self.base_url()))
            .query(&[("name", name)])
            .bearer_auth(TEST_TOKEN)
            .send()
            .await?)
    }

    /// Seed a profile record the way the out-of-band loader writes them
    pub async fn create_profile(&self, name: &str, skills: &str) -> Result<()> {
        let row_key = careershot::resolver::normalize(name);
        let partition_key = careershot::resolver::partition_key(name)
            .ok_or_else(|| anyhow::anyhow!("empty profile name"))?;

        sqlx::query(
            "INSERT INTO profiles (partition_key, row_key, name, description, linkedin, github, skills)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&partition_key)
        .bind(&row_key)
        .bind(name)
        .bind(format!("{} builds things", name))
        .bind(format!("https://linkedin.com/in/{}", row_key))
        .bind(format!("https://github.com/{}", row_key))
        .bind(skills)
        .execute(self.server.db().pool())
        .await?;
        Ok(())
    }

    /// Place an object in the media container
    pub fn create_object(&self, key: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("objects").join(CONTAINER).join(key);
        std::fs::write(&path, b"object")?;
        Ok(path)
    }

    /// Shutdown the server gracefully
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

impl Drop for CareershotTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
