use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that abort a probe run for one target.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid proxy URL '{url}': {reason}")]
    InvalidProxyUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to read wordlist '{}': {source}", .path.display())]
    WordlistUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read URLs from file '{}': {source}", .path.display())]
    InputFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read headers from file '{}': {source}", .path.display())]
    HeaderFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read cookies from file '{}': {source}", .path.display())]
    CookieFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to export results to '{}': {reason}", .path.display())]
    Export { path: PathBuf, reason: String },
}

/// Why OPTIONS discovery produced nothing. Never fatal.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("no URL provided for OPTIONS request")]
    MissingUrl,

    #[error("OPTIONS request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OPTIONS request returned status {0}")]
    UnexpectedStatus(StatusCode),

    #[error("OPTIONS response carried no Allow header")]
    MissingAllowHeader,
}

/// Failures of the dedicated CONNECT exchange; recorded as a status-0 result.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("connection failed: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}
