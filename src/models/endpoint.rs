//! Content-delivery endpoint model

use crate::error::{AppError, Result};
use crate::types::EndpointId;
use serde::{Deserialize, Serialize};
use url::Url;

/// A named network location serving the same content as its siblings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Catalog id; `0` is the default endpoint
    pub id: EndpointId,
    /// Short tag persisted by older settings pages (`cf`, `gh`, `jd`)
    pub tag: String,
    /// Human-readable name
    pub name: String,
    /// URL of the small test object fetched by a probe
    pub probe_url: String,
    /// Prefix for every content request routed through this endpoint
    pub base_url: String,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new<S: Into<String>>(id: EndpointId, tag: S, name: S, probe_url: S, base_url: S) -> Self {
        Self {
            id,
            tag: tag.into(),
            name: name.into(),
            probe_url: probe_url.into(),
            base_url: base_url.into(),
        }
    }

    /// Create an endpoint whose probe object lives under its base URL
    pub fn with_base<S: Into<String>>(id: EndpointId, tag: S, name: S, base_url: S) -> Result<Self> {
        let base_url = base_url.into();
        let probe_url = join_url(&base_url, crate::defaults::PROBE_OBJECT_PATH)?;
        Ok(Self {
            id,
            tag: tag.into(),
            name: name.into(),
            probe_url,
            base_url,
        })
    }

    /// Build the full URL for a content path relative to this endpoint
    pub fn url_for(&self, path: &str) -> Result<String> {
        join_url(&self.base_url, path)
    }

    /// Check both URLs are absolute http(s) URLs with a host
    pub fn validate(&self) -> Result<()> {
        for (label, raw) in [("probe URL", &self.probe_url), ("base URL", &self.base_url)] {
            let parsed = Url::parse(raw)
                .map_err(|e| AppError::validation(format!("Endpoint {} has invalid {} '{}': {}", self.id, label, raw, e)))?;
            match parsed.scheme() {
                "http" | "https" => {}
                scheme => {
                    return Err(AppError::validation(format!(
                        "Endpoint {} {} uses unsupported scheme: {}", self.id, label, scheme
                    )))
                }
            }
            if parsed.host_str().is_none() {
                return Err(AppError::validation(format!("Endpoint {} {} must have a host", self.id, label)));
            }
        }
        Ok(())
    }

    /// Get the host name of the base URL for display
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
    }
}

/// Append a relative path to a base URL, keeping the base's last segment
fn join_url(base: &str, path: &str) -> Result<String> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?.to_string())
}
