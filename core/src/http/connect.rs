//! CONNECT probes over a dedicated connection.
//!
//! The pooled client always rewrites CONNECT into authority-form
//! (`CONNECT host:port`), which turns a verb probe into a tunnel request.
//! Here the request line stays origin-form (`CONNECT /path HTTP/1.1`), so the
//! target answers it like any other method.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hyper::body::HttpBody;
use hyper::client::conn;
use hyper::{Body, Method, Request, Response};
use log::debug;
use reqwest::header::{HeaderValue, HOST, USER_AGENT};
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, OwnedTrustAnchor, RootCertStore, ServerName};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tokio_rustls::TlsConnector;
use url::{Host, Position, Url};

use crate::core::engine::MAX_BODY_BYTES;
use crate::core::result_aggregator::ProbeResult;
use crate::error::ConnectError;
use crate::http::{status_line, RequestExtras, DEFAULT_USER_AGENT};
use crate::ProbeConfig;

pub struct ConnectTransport {
    timeout: Duration,
    user_agent: HeaderValue,
    tls: TlsConnector,
}

impl Default for ConnectTransport {
    fn default() -> Self {
        Self::new(&ProbeConfig::default())
    }
}

impl ConnectTransport {
    /// Mirrors the client settings: timeout, user agent and certificate checks.
    pub fn new(config: &ProbeConfig) -> Self {
        let user_agent = config
            .user_agent_ref()
            .and_then(|ua| HeaderValue::from_str(ua).ok())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT));

        Self {
            timeout: config.effective_timeout(),
            user_agent,
            tls: tls_connector(config.insecure),
        }
    }

    /// `None` when a proxy is configured; CONNECT then goes through the proxied client.
    pub fn for_config(config: &ProbeConfig) -> Option<Self> {
        match config.proxy_ref() {
            Some(_) => None,
            None => Some(Self::new(config)),
        }
    }

    /// Same contract as the client path: `None` when the request cannot be
    /// built, a status-0 result when the exchange fails.
    pub async fn probe(&self, target: &str, extras: &RequestExtras) -> Option<ProbeResult> {
        let prepared = Url::parse(target)
            .map_err(|e| ConnectError::InvalidTarget {
                url: target.to_string(),
                reason: e.to_string(),
            })
            .and_then(|url| self.build_request(&url, extras).map(|request| (url, request)));

        let (url, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!("Failed to create request for method CONNECT: {}", e);
                return None;
            }
        };

        match self.send(&url, request).await {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("Request failed for method CONNECT: {}", e);
                Some(ProbeResult::transport_failure(e.to_string()))
            }
        }
    }

    async fn send(&self, url: &Url, request: Request<Body>) -> Result<ProbeResult, ConnectError> {
        let deadline = Instant::now() + self.timeout;

        let response = timeout_at(deadline, self.exchange(url, request))
            .await
            .map_err(|_| ConnectError::Timeout(self.timeout))??;

        let status = response.status();
        let reason = status_line(status, response.extensions());
        let length = read_capped_body(response.into_body(), deadline).await;
        Ok(ProbeResult::response(status.as_u16(), length, reason))
    }

    fn build_request(&self, url: &Url, extras: &RequestExtras) -> Result<Request<Body>, ConnectError> {
        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let headers = extras.header_map();
        let mut builder = Request::builder().method(Method::CONNECT).uri(path);
        if !headers.contains_key(HOST) {
            builder = builder.header(HOST, &url[Position::BeforeHost..Position::AfterPort]);
        }
        if !headers.contains_key(USER_AGENT) {
            builder = builder.header(USER_AGENT, self.user_agent.clone());
        }
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        Ok(builder.body(Body::empty())?)
    }

    async fn exchange(&self, url: &Url, request: Request<Body>) -> Result<Response<Body>, ConnectError> {
        let (host, server_name) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), ServerName::try_from(domain).ok()),
            Some(Host::Ipv4(ip)) => (ip.to_string(), Some(ServerName::IpAddress(ip.into()))),
            Some(Host::Ipv6(ip)) => (ip.to_string(), Some(ServerName::IpAddress(ip.into()))),
            None => {
                return Err(ConnectError::InvalidTarget {
                    url: url.to_string(),
                    reason: "missing host".to_string(),
                })
            }
        };
        let port = url.port_or_known_default().unwrap_or(80);

        match url.scheme() {
            "http" => {
                let stream = TcpStream::connect((host.as_str(), port)).await?;
                send_over(stream, request).await
            }
            "https" => {
                let server_name = server_name.ok_or_else(|| ConnectError::InvalidTarget {
                    url: url.to_string(),
                    reason: "host is not a valid TLS server name".to_string(),
                })?;
                let stream = TcpStream::connect((host.as_str(), port)).await?;
                let stream = self.tls.connect(server_name, stream).await?;
                send_over(stream, request).await
            }
            other => Err(ConnectError::UnsupportedScheme(other.to_string())),
        }
    }
}

async fn send_over<S>(stream: S, request: Request<Body>) -> Result<Response<Body>, ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = conn::handshake(stream).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("CONNECT connection closed with error: {}", e);
        }
    });
    Ok(sender.send_request(request).await?)
}

async fn read_capped_body(mut body: Body, deadline: Instant) -> usize {
    let mut read = 0usize;
    while read < MAX_BODY_BYTES {
        match timeout_at(deadline, body.data()).await {
            Ok(Some(Ok(chunk))) => read += chunk.len().min(MAX_BODY_BYTES - read),
            Ok(Some(Err(e))) => {
                debug!("Failed to read response body for method CONNECT: {}", e);
                break;
            }
            Ok(None) => break,
            Err(_) => {
                debug!("Timed out reading response body for method CONNECT");
                break;
            }
        }
    }
    read
}

fn tls_connector(insecure: bool) -> TlsConnector {
    let builder = ClientConfig::builder().with_safe_defaults();
    let config = if insecure {
        builder
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate))
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(ta.subject, ta.spki, ta.name_constraints)
        }));
        builder.with_root_certificates(roots).with_no_client_auth()
    };
    TlsConnector::from(Arc::new(config))
}

/// Used only with `--insecure`.
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}
