use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use std::str;
use std::time::{Duration, Instant};
use stowage_core::ClamAvConfig;
use stowage_processing::{ScanResult, VirusScanner};

/// [`VirusScanner`] backed by a ClamAV daemon over TCP
///
/// Connection failures, timeouts and unreadable replies are reported as
/// [`ScanResult::Error`], which the security scanner treats as "unavailable".
#[derive(Clone)]
pub struct ClamAvScanner {
    host: String,
    port: u16,
    /// Timeout for each daemon round trip
    timeout: Duration,
}

impl ClamAvScanner {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_timeout(host, port, Duration::from_secs(30))
    }

    /// Create with a custom timeout (for large files or slow ClamAV instances).
    pub fn with_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &ClamAvConfig) -> Self {
        Self::with_timeout(
            config.host.clone(),
            config.port,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Virus name from a `stream: <name> FOUND` reply
fn parse_virus_name(response: &[u8]) -> String {
    let response = str::from_utf8(response).unwrap_or_default().trim();
    if !response.contains("FOUND") {
        return "unknown".to_string();
    }
    response
        .split(':')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl VirusScanner for ClamAvScanner {
    /// Scan in-memory data using the sync client inside spawn_blocking
    async fn scan(&self, data: &[u8]) -> ScanResult {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = self.port, size_bytes = data.len(), "Starting ClamAV scan");

        let data = data.to_vec();
        let address = self.address();
        let result = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || -> Result<Option<String>, String> {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                let response = clamav_client::scan_buffer(data.as_slice(), connection, None)
                    .map_err(|e| format!("ClamAV scan error: {}", e))?;
                let is_clean = clean(&response)
                    .map_err(|e| format!("Failed to parse ClamAV response: {}", e))?;
                Ok(if is_clean {
                    None
                } else {
                    Some(parse_virus_name(&response))
                })
            }),
        )
        .await;

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(Ok(Ok(None))) => {
                tracing::info!(duration_ms = duration_ms, "File scan completed: clean");
                ScanResult::Clean
            }
            Ok(Ok(Ok(Some(threat)))) => {
                tracing::warn!(duration_ms = duration_ms, virus = %threat, "File scan detected virus");
                ScanResult::Infected { threat }
            }
            Ok(Ok(Err(message))) => {
                tracing::error!(error = %message, "ClamAV scan failed");
                ScanResult::Error { message }
            }
            Ok(Err(e)) => {
                let message = format!("ClamAV scan task join error: {}", e);
                tracing::error!(error = %message, "ClamAV scan panicked");
                ScanResult::Error { message }
            }
            Err(_) => {
                let message = format!(
                    "ClamAV scan timeout (exceeded {} seconds)",
                    self.timeout.as_secs()
                );
                tracing::error!(error = %message, "ClamAV scan timeout");
                ScanResult::Error { message }
            }
        }
    }

    fn name(&self) -> &str {
        "ClamAV"
    }

    async fn is_available(&self) -> bool {
        let address = self.address();
        let ping = tokio::task::spawn_blocking(move || {
            clamav_client::ping(Tcp {
                host_address: address.as_str(),
            })
        });

        match tokio::time::timeout(self.timeout, ping).await {
            Ok(Ok(Ok(response))) => response == clamav_client::PONG,
            _ => false,
        }
    }
}
