//! HTTP transport for probes and downstream content requests
//!
//! A single `reqwest::Client` is built per [`ClientFactory`] and cloned into
//! every consumer, so probes, rounds and the content client share one
//! connection pool.

use crate::{
    catalog::EndpointCatalog,
    error::{AppError, Result},
    models::{Endpoint, ProbeConfig},
    selector::BaseEndpointSink,
    types::{EndpointId, DEFAULT_ENDPOINT_ID},
};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// Transport used by a probe to fetch its test object
///
/// The probe enforces its own deadline, so implementations do not need a
/// request timeout.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// GET `url` and read the whole body, returning its length in bytes
    ///
    /// Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<usize>;
}

/// reqwest-backed client shared by probes and content requests
#[derive(Debug, Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    /// Create a new network client from configuration
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.probe_timeout())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Access the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return the body
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::network(status_reason(&e)))?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ProbeTransport for NetworkClient {
    async fn fetch(&self, url: &str) -> Result<usize> {
        Ok(self.get_bytes(url).await?.len())
    }
}

fn status_reason(error: &reqwest::Error) -> String {
    match error.status() {
        Some(status) => format!("HTTP {}", status),
        None => error.to_string(),
    }
}

/// Factory building clients that share one connection pool
pub struct ClientFactory {
    client: NetworkClient,
}

impl ClientFactory {
    /// Create a new client factory
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        Ok(Self { client: NetworkClient::new(config)? })
    }

    /// Create a network client for probing
    pub fn create_network_client(&self) -> NetworkClient {
        self.client.clone()
    }

    /// Create a content client routed through `catalog`
    pub fn create_content_client(&self, catalog: Arc<EndpointCatalog>) -> ContentClient {
        ContentClient::new(self.client.clone(), catalog)
    }
}

/// Downstream client that prefixes every request with the active base URL
///
/// Registered with the endpoint selector as its [`BaseEndpointSink`]; the
/// active id switches atomically, so requests already in flight keep the
/// URL they were built with.
#[derive(Debug)]
pub struct ContentClient {
    client: NetworkClient,
    catalog: Arc<EndpointCatalog>,
    base: AtomicU32,
}

impl ContentClient {
    pub fn new(client: NetworkClient, catalog: Arc<EndpointCatalog>) -> Self {
        Self {
            client,
            catalog,
            base: AtomicU32::new(DEFAULT_ENDPOINT_ID),
        }
    }

    /// Endpoint currently used as the base for content requests
    pub fn base_endpoint(&self) -> &Endpoint {
        let id = self.base.load(Ordering::Acquire);
        self.catalog
            .get(id)
            .unwrap_or_else(|_| self.catalog.default_endpoint())
    }

    /// Full URL of `path` under the active base
    pub fn url_for(&self, path: &str) -> Result<String> {
        self.base_endpoint().url_for(path)
    }

    /// Fetch `path` from the active base
    pub async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path)?;
        self.client.get_bytes(&url).await
    }
}

impl BaseEndpointSink for ContentClient {
    fn set_base_endpoint(&self, id: EndpointId) {
        let id = if self.catalog.contains(id) { id } else { DEFAULT_ENDPOINT_ID };
        self.base.store(id, Ordering::Release);
    }
}
