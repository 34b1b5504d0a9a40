pub mod core;
pub mod error;
pub mod http;
pub mod runner;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use crate::core::catalog::{build_catalog, MethodCatalog, MethodDiscovery, OptionsDiscovery, DEFAULT_METHODS};
pub use crate::core::engine::{ProbeEngine, MAX_BODY_BYTES};
pub use crate::core::result_aggregator::{ProbeResult, ResultAggregate};
pub use crate::core::safe_mode::{apply_safe_mode, is_dangerous, DANGEROUS_METHODS};
pub use crate::error::{ConnectError, DiscoveryError, ProbeError};
pub use crate::http::{build_client, parse_cookies, parse_headers, ConnectTransport, RequestExtras};
pub use crate::runner::{probe_target, run};
pub use crate::utils::read_lines;

/// Timeout applied when none (or zero) is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Per-run probe configuration shared by the CLI and library callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeConfig {
    pub url: String,
    pub input_file: Option<PathBuf>,
    pub concurrency: usize,
    pub timeout: u64,
    pub insecure: bool,
    pub follow_redirects: bool,
    pub proxy: Option<String>,
    pub headers: Vec<String>,
    pub cookies: Option<String>,
    pub user_agent: Option<String>,
    pub safe_only: bool,
    pub wordlist: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            input_file: None,
            concurrency: 5,
            timeout: DEFAULT_TIMEOUT_SECS,
            insecure: false,
            follow_redirects: false,
            proxy: None,
            headers: Vec::new(),
            cookies: None,
            user_agent: None,
            safe_only: false,
            wordlist: None,
            output: None,
            verbose: false,
            quiet: false,
        }
    }
}

impl ProbeConfig {
    /// Returns a config targeting `url` with every other option at its default.
    pub fn for_target(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Target URL with `https://` prepended when no scheme is present.
    pub fn target_url(&self) -> String {
        let url = self.url.trim();
        if !url.is_empty() && !url.contains("://") {
            format!("https://{}", url)
        } else {
            url.to_string()
        }
    }

    pub fn effective_timeout(&self) -> Duration {
        if self.timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout)
        }
    }

    /// Admission gate size. A zero-sized gate would never admit a request.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn proxy_ref(&self) -> Option<&str> {
        self.proxy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn user_agent_ref(&self) -> Option<&str> {
        self.user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_adds_https_prefix() {
        let config = ProbeConfig::for_target("example.com:8443/admin");
        assert_eq!(config.target_url(), "https://example.com:8443/admin");
    }

    #[test]
    fn test_target_url_keeps_existing_scheme() {
        let config = ProbeConfig::for_target("http://example.com");
        assert_eq!(config.target_url(), "http://example.com");
        assert_eq!(ProbeConfig::default().target_url(), "");
    }

    #[test]
    fn test_effective_timeout_defaults_when_unset() {
        let mut config = ProbeConfig::default();
        config.timeout = 0;
        assert_eq!(config.effective_timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        config.timeout = 3;
        assert_eq!(config.effective_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_effective_concurrency_never_zero() {
        let mut config = ProbeConfig::default();
        config.concurrency = 0;
        assert_eq!(config.effective_concurrency(), 1);
        config.concurrency = 12;
        assert_eq!(config.effective_concurrency(), 12);
    }

    #[test]
    fn test_blank_proxy_is_direct() {
        let mut config = ProbeConfig::default();
        config.proxy = Some("   ".to_string());
        assert!(config.proxy_ref().is_none());
        config.proxy = Some("http://127.0.0.1:8080".to_string());
        assert_eq!(config.proxy_ref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"url":"http://t.local","safeOnly":true}"#).unwrap();
        assert_eq!(config.url, "http://t.local");
        assert!(config.safe_only);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
    }
}
