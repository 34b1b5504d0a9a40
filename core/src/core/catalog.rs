use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::ALLOW;
use reqwest::{Client, Method, StatusCode};

use crate::error::{DiscoveryError, ProbeError};
use crate::utils::read_lines;
use crate::ProbeConfig;

/// Built-in method list: standard verbs, WebDAV and version-control verbs,
/// plus bogus tokens that expose servers reflecting unknown methods.
pub const DEFAULT_METHODS: &[&str] = &[
    "CHECKIN", "CHECKOUT", "CONNECT", "COPY", "DELETE", "GET", "HEAD", "INDEX",
    "LINK", "LOCK", "MKCOL", "MOVE", "NOEXISTE", "OPTIONS", "ORDERPATCH",
    "PATCH", "POST", "PROPFIND", "PROPPATCH", "PUT", "REPORT", "SEARCH",
    "SHOWMETHOD", "SPACEJUMP", "TEXTSEARCH", "TRACE", "TRACK", "UNCHECKOUT",
    "UNLINK", "UNLOCK", "VERSION-CONTROL", "BAMBOOZLE",
];

/// Sorted, deduplicated set of uppercase method names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodCatalog {
    methods: Vec<String>,
}

impl MethodCatalog {
    /// Normalizes (trim + uppercase), drops empties, dedups and sorts.
    pub fn from_candidates<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods: BTreeSet<String> = candidates
            .into_iter()
            .map(|m| m.as_ref().trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self {
            methods: methods.into_iter().collect(),
        }
    }

    pub fn defaults() -> Self {
        Self::from_candidates(DEFAULT_METHODS)
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.methods.iter()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods
            .binary_search_by(|m| m.as_str().cmp(method))
            .is_ok()
    }

    /// Keeps the methods for which `keep` returns true; order is preserved.
    pub fn filter(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            methods: self.methods.iter().filter(|m| keep(m.as_str())).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MethodCatalog {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.methods.iter()
    }
}

/// Best-effort source of methods the target announces for itself.
#[async_trait]
pub trait MethodDiscovery: Send + Sync {
    async fn discover(&self, target: &str) -> Result<Vec<String>, DiscoveryError>;
}

/// Discovers methods from the `Allow` header of a live `OPTIONS` response.
pub struct OptionsDiscovery {
    client: Client,
}

impl OptionsDiscovery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MethodDiscovery for OptionsDiscovery {
    async fn discover(&self, target: &str) -> Result<Vec<String>, DiscoveryError> {
        if target.is_empty() {
            return Err(DiscoveryError::MissingUrl);
        }

        let response = self.client.request(Method::OPTIONS, target).send().await?;

        if response.status() != StatusCode::OK {
            return Err(DiscoveryError::UnexpectedStatus(response.status()));
        }

        let allow = response
            .headers()
            .get_all(ALLOW)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        if allow.trim().is_empty() {
            return Err(DiscoveryError::MissingAllowHeader);
        }

        info!("Server supports the following methods: {}", allow);
        Ok(allow
            .split(',')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect())
    }
}

/// Builds the catalog from the defaults, the configured wordlist and
/// whatever the target announces via `discovery`.
///
/// Only an unreadable wordlist is fatal; a failed discovery is logged and skipped.
pub async fn build_catalog(
    config: &ProbeConfig,
    discovery: &dyn MethodDiscovery,
) -> Result<MethodCatalog, ProbeError> {
    let mut candidates: Vec<String> = DEFAULT_METHODS.iter().map(|m| m.to_string()).collect();
    debug!("Using {} default HTTP methods", DEFAULT_METHODS.len());

    if let Some(path) = config.wordlist.as_deref() {
        let words = read_wordlist(path)?;
        info!("Added {} methods from wordlist: {}", words.len(), path.display());
        candidates.extend(words);
    }

    debug!("Sending OPTIONS request to discover supported methods");
    match discovery.discover(&config.target_url()).await {
        Ok(found) if !found.is_empty() => {
            info!("Added {} methods from OPTIONS response", found.len());
            candidates.extend(found);
        }
        Ok(_) => debug!("OPTIONS response announced no methods"),
        Err(e) => warn!("Failed to get methods from OPTIONS request: {}", e),
    }

    Ok(MethodCatalog::from_candidates(candidates))
}

fn read_wordlist(path: &Path) -> Result<Vec<String>, ProbeError> {
    read_lines(path).map_err(|source| ProbeError::WordlistUnreadable {
        path: path.to_path_buf(),
        source,
    })
}
