use log::{debug, error, info};

use crate::core::catalog::{build_catalog, OptionsDiscovery};
use crate::core::engine::ProbeEngine;
use crate::core::result_aggregator::ResultAggregate;
use crate::core::safe_mode::apply_safe_mode;
use crate::error::ProbeError;
use crate::http::{build_client, parse_cookies, parse_headers, ConnectTransport, RequestExtras};
use crate::utils::read_lines;
use crate::ProbeConfig;

/// Runs the probe for the configured target, or for every URL listed in
/// `input_file`. In multi-URL mode a failing URL is logged and skipped.
pub async fn run(config: &ProbeConfig) -> Result<(), ProbeError> {
    info!("Starting HTTP verb enumeration and tampering");

    let Some(input) = config.input_file.as_deref() else {
        return run_single(config).await;
    };

    let urls = read_lines(input).map_err(|source| ProbeError::InputFileUnreadable {
        path: input.to_path_buf(),
        source,
    })?;

    for url in urls {
        info!("Testing URL: {}", url);
        let mut target_config = config.clone();
        target_config.url = url;
        if let Err(e) = run_single(&target_config).await {
            error!("Error processing {}: {}", target_config.url, e);
        }
    }
    Ok(())
}

async fn run_single(config: &ProbeConfig) -> Result<(), ProbeError> {
    let results = probe_target(config).await?;

    if !config.quiet {
        results.print_table();
        results.print_summary();
    }

    if let Some(path) = config.output.as_deref() {
        results.export_json(path)?;
        info!("Results exported to {}", path.display());
    }
    Ok(())
}

/// Full pipeline for one target: client, request extras, catalog,
/// safe-mode filter, dispatch.
pub async fn probe_target(config: &ProbeConfig) -> Result<ResultAggregate, ProbeError> {
    let target = config.target_url();
    if target != config.url.trim() {
        debug!("Added https:// prefix to URL: {}", target);
    }

    let client = build_client(config)?;
    let headers = parse_headers(&config.headers)?;
    let cookies = parse_cookies(config.cookies.as_deref())?;

    let discovery = OptionsDiscovery::new(client.clone());
    let catalog = build_catalog(config, &discovery).await?;
    let catalog = apply_safe_mode(catalog, config.safe_only);
    debug!("Probing {} with {} methods", target, catalog.len());

    let engine = ProbeEngine::new(client, config.effective_concurrency())
        .with_connect_transport(ConnectTransport::for_config(config))
        .with_extras(RequestExtras::new(headers, cookies));
    Ok(engine.run(&target, &catalog).await)
}
