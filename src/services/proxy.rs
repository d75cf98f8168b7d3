//! Proxy Configuration & HTTP Client Factory
//!
//! Proxy types are defined in `sentry-dingtalk-core::proxy`; this module
//! re-exports them and builds the `reqwest::Client` used for webhook delivery.

use std::time::Duration;

pub use sentry_dingtalk_core::proxy::*;

use crate::services::webhook::types::WebhookError;

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> route all requests through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Duration,
) -> Result<reqwest::Client, WebhookError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    match proxy {
        Some(cfg) => {
            let mut p = reqwest::Proxy::all(cfg.url()).map_err(|e| {
                WebhookError::InvalidConfig(format!("invalid proxy {}: {}", cfg.url(), e))
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    Ok(builder.build()?)
}
