//! Upstream endpoint resolution.

use std::env;

use url::Url;

use crate::error::ProxyError;

/// Read the upstream URL from `var`.
///
/// Called on every request so a fixed environment takes effect without a
/// restart. Unset, empty and non-UTF-8 values all count as not configured.
pub fn resolve_endpoint(var: &str) -> Result<Url, ProxyError> {
    let raw = match env::var(var) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Err(ProxyError::EndpointNotConfigured(var.to_string())),
    };

    Url::parse(raw.trim()).map_err(|source| ProxyError::InvalidEndpoint {
        var: var.to_string(),
        source,
    })
}
