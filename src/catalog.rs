//! Candidate endpoint catalog
//!
//! The built-in catalog lists the three mirrors that host the launcher
//! metadata. Hosts embedding the probe against other mirrors can build their
//! own catalog with [`EndpointCatalog::new`].

use crate::error::{AppError, Result};
use crate::models::Endpoint;
use crate::types::{EndpointId, DEFAULT_ENDPOINT_ID};
use std::collections::HashSet;

/// Fixed, ordered set of candidate endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCatalog {
    endpoints: Vec<Endpoint>,
}

impl EndpointCatalog {
    /// Create a catalog from a list of endpoints
    ///
    /// Ids must be unique, id `0` must be present and every URL must be an
    /// absolute http(s) URL.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(AppError::validation("Endpoint catalog cannot be empty"));
        }

        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.id) {
                return Err(AppError::validation(format!("Duplicate endpoint id: {}", endpoint.id)));
            }
            endpoint.validate()?;
        }

        if !seen.contains(&DEFAULT_ENDPOINT_ID) {
            return Err(AppError::validation("Endpoint catalog must contain the default endpoint (id 0)"));
        }

        Ok(Self { endpoints })
    }

    /// The production mirrors: CloudFlare (default), GitHub and jsDelivr
    pub fn builtin() -> Self {
        let endpoints = vec![
            Endpoint::new(
                0,
                "cf",
                "CloudFlare",
                "https://starward.scighost.com/metadata/test/test_10kb",
                "https://starward.scighost.com/metadata/",
            ),
            Endpoint::new(
                1,
                "gh",
                "GitHub",
                "https://raw.githubusercontent.com/Scighost/Starward/metadata/test/test_10kb",
                "https://raw.githubusercontent.com/Scighost/Starward/metadata/",
            ),
            Endpoint::new(
                2,
                "jd",
                "jsDelivr",
                "https://cdn.jsdelivr.net/gh/Scighost/Starward@metadata/test/test_10kb",
                "https://cdn.jsdelivr.net/gh/Scighost/Starward@metadata/",
            ),
        ];
        Self { endpoints }
    }

    /// Look up an endpoint by id
    pub fn get(&self, id: EndpointId) -> Result<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::unknown_endpoint(id))
    }

    /// Check whether an id is known
    pub fn contains(&self, id: EndpointId) -> bool {
        self.endpoints.iter().any(|e| e.id == id)
    }

    /// The default endpoint (id 0)
    pub fn default_endpoint(&self) -> &Endpoint {
        // `new` and `builtin` both guarantee id 0 exists
        self.endpoints
            .iter()
            .find(|e| e.id == DEFAULT_ENDPOINT_ID)
            .unwrap_or(&self.endpoints[0])
    }

    /// Map a short tag to an id; unknown tags map to the default endpoint
    pub fn id_for_tag(&self, tag: &str) -> EndpointId {
        self.endpoints
            .iter()
            .find(|e| e.tag.eq_ignore_ascii_case(tag))
            .map(|e| e.id)
            .unwrap_or(DEFAULT_ENDPOINT_ID)
    }

    /// Endpoints in catalog order
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for EndpointCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
