use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use reqwest::{Client, Method, Response};
use tokio::sync::{Mutex, Semaphore};

use crate::core::catalog::MethodCatalog;
use crate::core::result_aggregator::{ProbeResult, ResultAggregate};
use crate::http::{status_line, ConnectTransport, RequestExtras};

/// Upper bound on response bytes read per probe.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

type SharedResults = Arc<Mutex<BTreeMap<String, ProbeResult>>>;

/// Sends one request per catalog method with at most `concurrency_limit`
/// requests in flight.
///
/// Every method gets its own task up front; each task waits on the admission
/// gate before sending and releases its permit when it finishes (or unwinds).
/// Results are collected in a single map behind one lock, held only for the insert.
///
/// CONNECT goes through a [`ConnectTransport`] when one is set, since the
/// client would send it in authority-form.
pub struct ProbeEngine {
    client: Client,
    connect: Option<Arc<ConnectTransport>>,
    extras: Arc<RequestExtras>,
    concurrency_limit: usize,
}

impl ProbeEngine {
    pub fn new(client: Client, concurrency_limit: usize) -> Self {
        Self {
            client,
            connect: Some(Arc::new(ConnectTransport::default())),
            extras: Arc::new(RequestExtras::default()),
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn with_extras(mut self, extras: RequestExtras) -> Self {
        self.extras = Arc::new(extras);
        self
    }

    /// `None` sends CONNECT through the client like every other method.
    pub fn with_connect_transport(mut self, connect: Option<ConnectTransport>) -> Self {
        self.connect = connect.map(Arc::new);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Probes `target` with every method in `catalog` and returns once all
    /// tasks have joined. Methods whose request cannot be constructed are
    /// absent from the result.
    pub async fn run(&self, target: &str, catalog: &MethodCatalog) -> ResultAggregate {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let results: SharedResults = Arc::new(Mutex::new(BTreeMap::new()));
        let target: Arc<str> = Arc::from(target);

        let tasks: Vec<_> = catalog
            .iter()
            .cloned()
            .map(|method| {
                let semaphore = Arc::clone(&semaphore);
                let results = Arc::clone(&results);
                let client = self.client.clone();
                let connect = self.connect.clone();
                let extras = Arc::clone(&self.extras);
                let target = Arc::clone(&target);

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };

                    let outcome = match (method.as_str(), connect.as_deref()) {
                        ("CONNECT", Some(transport)) => {
                            debug!("Testing method: {}", method);
                            transport.probe(&target, &extras).await
                        }
                        _ => probe_method(&client, &target, &method, &extras).await,
                    };
                    if let Some(result) = outcome {
                        results.lock().await.insert(method, result);
                    }
                })
            })
            .collect();

        for outcome in join_all(tasks).await {
            if let Err(e) = outcome {
                warn!("Probe task did not complete: {}", e);
            }
        }

        let results = match Arc::try_unwrap(results) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        ResultAggregate::from(results)
    }
}

/// Sends a single probe. `None` means the request could not be built.
async fn probe_method(
    client: &Client,
    target: &str,
    method: &str,
    extras: &RequestExtras,
) -> Option<ProbeResult> {
    let verb = match Method::from_bytes(method.as_bytes()) {
        Ok(verb) => verb,
        Err(e) => {
            debug!("Failed to create request for method {}: {}", method, e);
            return None;
        }
    };

    let request = match extras.apply(client.request(verb, target)).build() {
        Ok(request) => request,
        Err(e) => {
            debug!("Failed to create request for method {}: {}", method, e);
            return None;
        }
    };

    debug!("Testing method: {}", method);
    match client.execute(request).await {
        Ok(response) => {
            let status = response.status();
            let reason = status_line(status, response.extensions());
            let length = read_capped_body(response, method).await;
            Some(ProbeResult::response(status.as_u16(), length, reason))
        }
        Err(e) => {
            debug!("Request failed for method {}: {}", method, e);
            Some(ProbeResult::transport_failure(e.to_string()))
        }
    }
}

/// Counts body bytes up to `MAX_BODY_BYTES`; the rest is dropped unread.
async fn read_capped_body(mut response: Response, method: &str) -> usize {
    let mut read = 0usize;
    while read < MAX_BODY_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => read += chunk.len().min(MAX_BODY_BYTES - read),
            Ok(None) => break,
            Err(e) => {
                debug!("Failed to read response body for method {}: {}", method, e);
                break;
            }
        }
    }
    read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_creation() {
        let engine = ProbeEngine::new(Client::new(), 10);
        assert_eq!(engine.concurrency_limit(), 10);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let engine = ProbeEngine::new(Client::new(), 0);
        assert_eq!(engine.concurrency_limit(), 1);
    }

    #[tokio::test]
    async fn test_invalid_method_token_is_skipped() {
        let catalog = MethodCatalog::from_candidates(["BAD VERB", "GE(T"]);
        let engine = ProbeEngine::new(Client::new(), 2);
        let results = engine.run("http://127.0.0.1:9/", &catalog).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_url_skips_every_method() {
        let engine = ProbeEngine::new(Client::new(), 4);
        let results = engine.run("not a url", &MethodCatalog::defaults()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_empty_aggregate() {
        let engine = ProbeEngine::new(Client::new(), 4);
        let results = engine.run("http://127.0.0.1:9/", &MethodCatalog::default()).await;
        assert!(results.is_empty());
    }
}
