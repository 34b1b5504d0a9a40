pub mod client;
pub mod connect;
pub mod parse;

pub use client::{build_client, DEFAULT_USER_AGENT};
pub use connect::ConnectTransport;
pub use parse::{parse_cookies, parse_headers};

use std::collections::BTreeMap;

use hyper::ext::ReasonPhrase;
use hyper::http::Extensions;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{RequestBuilder, StatusCode};

/// Headers and cookies attached to every probe request.
#[derive(Debug, Clone, Default)]
pub struct RequestExtras {
    pub headers: HeaderMap,
    pub cookies: BTreeMap<String, String>,
}

impl RequestExtras {
    pub fn new(headers: HeaderMap, cookies: BTreeMap<String, String>) -> Self {
        Self { headers, cookies }
    }

    /// Renders the cookie set as a single `Cookie` header value.
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        if self.cookies.is_empty() {
            return None;
        }
        let joined = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&joined) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Dropping cookies that cannot be sent as a header: {}", e);
                None
            }
        }
    }

    /// Every header value (repeated names included) plus the `Cookie` header.
    pub fn header_map(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        if let Some(cookie) = self.cookie_header() {
            headers.append(COOKIE, cookie);
        }
        headers
    }

    pub fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        for (name, value) in self.header_map().iter() {
            builder = builder.header(name, value);
        }
        builder
    }
}

/// `"<code> <reason>"` using the phrase the server actually sent, then the
/// canonical phrase, then the bare code.
pub(crate) fn status_line(status: StatusCode, extensions: &Extensions) -> String {
    let custom = extensions
        .get::<ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).trim().to_string())
        .filter(|reason| !reason.is_empty());

    match custom.as_deref().or_else(|| status.canonical_reason()) {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderName;
    use reqwest::{Client, Method};

    #[test]
    fn test_cookie_header_is_ordered_by_name() {
        let mut cookies = BTreeMap::new();
        cookies.insert("token".to_string(), "abc123".to_string());
        cookies.insert("session".to_string(), "xyz".to_string());
        let extras = RequestExtras::new(HeaderMap::new(), cookies);

        let header = extras.cookie_header().unwrap();
        assert_eq!(header.to_str().unwrap(), "session=xyz; token=abc123");
    }

    #[test]
    fn test_no_cookie_header_without_cookies() {
        assert!(RequestExtras::default().cookie_header().is_none());
        assert!(RequestExtras::default().header_map().is_empty());
    }

    #[test]
    fn test_apply_keeps_repeated_header_values() {
        let mut headers = HeaderMap::new();
        let name = HeaderName::from_static("x-probe");
        headers.append(name.clone(), HeaderValue::from_static("one"));
        headers.append(name.clone(), HeaderValue::from_static("two"));
        let mut cookies = BTreeMap::new();
        cookies.insert("a".to_string(), "1".to_string());
        let extras = RequestExtras::new(headers, cookies);

        let client = Client::new();
        let request = extras
            .apply(client.request(Method::GET, "http://example.com/"))
            .build()
            .unwrap();

        let values: Vec<_> = request
            .headers()
            .get_all(&name)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["one", "two"]);
        assert_eq!(request.headers().get(COOKIE).unwrap(), "a=1");
    }

    #[test]
    fn test_status_line_prefers_server_phrase() {
        let mut extensions = Extensions::new();
        extensions.insert(ReasonPhrase::from_static(b"Custom Gateway Thing"));
        let status = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_line(status, &extensions), "599 Custom Gateway Thing");
    }

    #[test]
    fn test_status_line_falls_back_to_canonical_then_code() {
        let extensions = Extensions::new();
        assert_eq!(status_line(StatusCode::METHOD_NOT_ALLOWED, &extensions), "405 Method Not Allowed");
        assert_eq!(status_line(StatusCode::from_u16(599).unwrap(), &extensions), "599");
    }
}
