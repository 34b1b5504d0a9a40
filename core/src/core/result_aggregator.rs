use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Outcome of one method probe. `status_code == 0` means the exchange
/// never completed and `reason` holds the transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status_code: u16,
    pub length: usize,
    pub reason: String,
}

impl ProbeResult {
    pub fn response(status_code: u16, length: usize, reason: impl Into<String>) -> Self {
        Self {
            status_code,
            length,
            reason: reason.into(),
        }
    }

    pub fn transport_failure(reason: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            length: 0,
            reason: reason.into(),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0
    }

    pub fn is_accepted(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Results keyed by method name, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultAggregate {
    results: BTreeMap<String, ProbeResult>,
}

impl From<BTreeMap<String, ProbeResult>> for ResultAggregate {
    fn from(results: BTreeMap<String, ProbeResult>) -> Self {
        Self { results }
    }
}

impl ResultAggregate {
    pub fn get(&self, method: &str) -> Option<&ProbeResult> {
        self.results.get(method)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates in method-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProbeResult)> {
        self.results.iter()
    }

    /// Methods answered with a 2xx status.
    pub fn accepted(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_accepted())
            .map(|(m, _)| m.as_str())
            .collect()
    }

    /// Methods whose exchange never produced a status.
    pub fn failed(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_transport_failure())
            .map(|(m, _)| m.as_str())
            .collect()
    }

    pub fn render_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("\n{:<15} {:<10} {:<10} {}\n", "METHOD", "STATUS", "LENGTH", "REASON"));
        out.push_str(&format!("{:<15} {:<10} {:<10} {}\n", "------", "------", "------", "------"));

        for (method, result) in &self.results {
            let status = format!("{:<10}", result.status_code);
            out.push_str(&format!(
                "{:<15} {} {:<10} {}\n",
                method,
                paint(result.status_code, &status),
                result.length,
                paint(result.status_code, &result.reason)
            ));
        }
        out
    }

    pub fn print_table(&self) {
        println!("{}", self.render_table());
    }

    pub fn render_summary(&self) -> String {
        let accepted = self.accepted();
        let mut out = if accepted.is_empty() {
            "[+] No method returned a 2xx status.".green().to_string()
        } else {
            format!("[+] {} method(s) accepted: {}", accepted.len(), accepted.join(", "))
                .yellow()
                .bold()
                .to_string()
        };

        let failed = self.failed();
        if !failed.is_empty() {
            out.push('\n');
            out.push_str(
                &format!("[-] {} method(s) got no response: {}", failed.len(), failed.join(", "))
                    .dimmed()
                    .to_string(),
            );
        }
        out
    }

    pub fn print_summary(&self) {
        println!("{}", self.render_summary());
    }

    /// Writes the aggregate as pretty-printed JSON.
    pub fn export_json(&self, path: &Path) -> Result<(), ProbeError> {
        let export_err = |reason: String| ProbeError::Export {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| export_err(e.to_string()))?;
        fs::write(path, json).map_err(|e| export_err(e.to_string()))
    }
}

fn paint(status_code: u16, text: &str) -> ColoredString {
    match status_code {
        200 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.red(),
        500..=599 => text.yellow(),
        _ => text.normal(),
    }
}
