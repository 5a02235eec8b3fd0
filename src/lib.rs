//! careershot - profile lookup service
//!
//! Resolves a person's name to a stored profile plus the public URLs of
//! their photo and resume, reading from a partitioned record store and a
//! blob store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod resolver;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

pub use config::Config;
use db::Database;
use resolver::Resolver;
use storage::{create_object_store, SqliteRecordStore};

/// The careershot server instance
pub struct Server {
    config: Config,
    db: Arc<Database>,
    resolver: Arc<Resolver>,
    gate: Arc<auth::AccessGate>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a new server instance, connecting both backing stores
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(Database::new(config.database.as_deref()).await?);
        let records = Arc::new(SqliteRecordStore::new(db.pool().clone()));
        let objects = create_object_store(&config.object_store, config.request_timeout())?;
        let resolver = Resolver::new(records, objects, config.resolver.clone());

        let gate = auth::AccessGate::new(&config.auth);
        if !gate.is_enabled() {
            tracing::warn!("Bearer token gate is disabled; lookups are open to everyone");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            db,
            resolver: Arc::new(resolver),
            gate: Arc::new(gate),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the database handle
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Build the router
    fn router(&self) -> Router {
        api::router(api::AppState {
            db: self.db.clone(),
            resolver: self.resolver.clone(),
            gate: self.gate.clone(),
            https_redirect: self.config.https_redirect,
            request_timeout: self.config.request_timeout(),
        })
    }

    /// Run the server until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("careershot listening on {}", local_addr);

        let router = self.router();
        let mut shutdown_rx = self.shutdown_rx.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
            })
            .await?;

        info!("careershot shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
