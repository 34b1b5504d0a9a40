use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use url::Url;

use crate::error::ProbeError;
use crate::ProbeConfig;

pub const DEFAULT_USER_AGENT: &str = concat!("verbprobe/", env!("CARGO_PKG_VERSION"));

/// Builds the client shared by discovery and dispatch. No network I/O happens here.
pub fn build_client(config: &ProbeConfig) -> Result<Client, ProbeError> {
    let mut builder = ClientBuilder::new()
        .timeout(config.effective_timeout())
        .danger_accept_invalid_certs(config.insecure)
        .user_agent(config.user_agent_ref().unwrap_or(DEFAULT_USER_AGENT));

    if !config.follow_redirects {
        builder = builder.redirect(Policy::none());
    }

    match config.proxy_ref() {
        Some(proxy_url) => {
            let parsed = Url::parse(proxy_url).map_err(|e| ProbeError::InvalidProxyUrl {
                url: proxy_url.to_string(),
                reason: e.to_string(),
            })?;
            let proxy = Proxy::all(parsed.as_str()).map_err(|e| ProbeError::InvalidProxyUrl {
                url: proxy_url.to_string(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        // Ignore HTTP_PROXY and friends so an unset proxy really means direct.
        None => builder = builder.no_proxy(),
    }

    builder.build().map_err(ProbeError::ClientBuild)
}
