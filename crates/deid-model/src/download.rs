//! Streaming archive download with explicit deadlines.
//!
//! The request future is wrapped in a timeout (connect deadline) and every
//! body read gets its own timeout (stall deadline). Nothing here ever waits
//! on the network without a bound.

use deid_core::ProgressFn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::{ModelError, Result, TimeoutPhase};

/// Share of the progress range given to the transfer; the rest is for
/// unpacking.
pub const DOWNLOAD_SHARE: f64 = 0.99;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Bound on the TCP reachability probe.
    #[serde(with = "secs")]
    pub probe_timeout: Duration,

    /// Connect timeout handed to the HTTP client.
    #[serde(with = "secs")]
    pub connect_timeout: Duration,

    /// Extra time granted to the whole request on top of `connect_timeout`.
    #[serde(with = "secs")]
    pub connect_grace: Duration,

    /// Longest gap allowed between two body chunks.
    #[serde(with = "secs")]
    pub read_timeout: Duration,

    /// Write buffer size for the temporary archive.
    pub buffer_size: usize,

    /// Probe this host instead of the one in the archive URL.
    pub probe_host: Option<String>,

    /// Probe this port instead of the archive URL's port.
    pub probe_port: Option<u16>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
            connect_grace: Duration::from_secs(5),
            read_timeout: Duration::from_secs(60),
            buffer_size: 1024 * 1024,
            probe_host: None,
            probe_port: None,
        }
    }
}

impl DownloadSettings {
    pub fn request_deadline(&self) -> Duration {
        self.connect_timeout + self.connect_grace
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn report(progress: Option<&ProgressFn<'_>>, fraction: f64, message: &str) {
    if let Some(cb) = progress {
        cb(fraction, message);
    }
}

/// Resolve the `(host, port)` the probe should try for `url`.
pub fn probe_target(url: &str, settings: &DownloadSettings) -> Result<(String, u16)> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ModelError::InvalidUrl(format!("{}: {}", url, e)))?;
    let host = match &settings.probe_host {
        Some(h) => h.clone(),
        None => parsed
            .host_str()
            .ok_or_else(|| ModelError::InvalidUrl(format!("{} has no host", url)))?
            .to_string(),
    };
    let port = settings
        .probe_port
        .or_else(|| parsed.port_or_known_default())
        .unwrap_or(443);
    Ok((host, port))
}

/// Build the HTTP client used for archive downloads.
pub fn build_client(settings: &DownloadSettings) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("deid/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(settings.connect_timeout)
        .build()?;
    Ok(client)
}

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// `dest` is owned by the caller, who is responsible for removing it on
/// failure.
pub async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    settings: &DownloadSettings,
    progress: Option<&ProgressFn<'_>>,
) -> Result<u64> {
    let deadline = settings.request_deadline();
    let mut response = match tokio::time::timeout(deadline, client.get(url).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) if e.is_timeout() => {
            return Err(ModelError::Timeout {
                phase: TimeoutPhase::Connect,
                after: settings.connect_timeout,
            });
        }
        Ok(Err(e)) => return Err(ModelError::Transfer(e)),
        Err(_) => {
            return Err(ModelError::Timeout {
                phase: TimeoutPhase::Connect,
                after: deadline,
            });
        }
    };

    if !response.status().is_success() {
        return Err(ModelError::HttpStatus {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let total = response.content_length();
    debug!("Downloading {} ({:?} bytes declared)", url, total);

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(dest)
        .await
        .map_err(|e| ModelError::filesystem(dest, e))?;
    let mut writer = BufWriter::with_capacity(settings.buffer_size, file);

    let mut received: u64 = 0;
    let mut last_percent: Option<u64> = None;

    loop {
        let next = tokio::time::timeout(settings.read_timeout, response.chunk())
            .await
            .map_err(|_| ModelError::Timeout {
                phase: TimeoutPhase::Read,
                after: settings.read_timeout,
            })?;

        let chunk = match next {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                if let Some(expected) = total.filter(|&t| received < t) {
                    debug!("Body error after {} of {} bytes: {}", received, expected, e);
                    return Err(ModelError::IncompleteTransfer { received, expected });
                }
                return Err(ModelError::Transfer(e));
            }
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ModelError::filesystem(dest, e))?;
        received += chunk.len() as u64;

        if let Some(expected) = total.filter(|&t| t > 0) {
            let ratio = (received as f64 / expected as f64).min(1.0);
            let percent = (ratio * 100.0) as u64;
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                report(
                    progress,
                    ratio * DOWNLOAD_SHARE,
                    &format!(
                        "Downloading: {:.1} / {:.1} MB",
                        received as f64 / MIB,
                        expected as f64 / MIB
                    ),
                );
            }
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| ModelError::filesystem(dest, e))?;

    if let Some(expected) = total.filter(|&t| received < t) {
        return Err(ModelError::IncompleteTransfer { received, expected });
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_target_from_url() {
        let settings = DownloadSettings::default();
        let (host, port) = probe_target(
            "https://github.com/explosion/spacy-models/releases/download/x/x.tar.gz",
            &settings,
        )
        .unwrap();
        assert_eq!(host, "github.com");
        assert_eq!(port, 443);

        let (host, port) = probe_target("http://127.0.0.1:8123/a.tar.gz", &settings).unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 8123);
    }

    #[test]
    fn test_probe_target_override() {
        let settings = DownloadSettings {
            probe_host: Some("proxy.local".to_string()),
            probe_port: Some(3128),
            ..Default::default()
        };
        let (host, port) = probe_target("https://github.com/a.tar.gz", &settings).unwrap();
        assert_eq!(host, "proxy.local");
        assert_eq!(port, 3128);
    }

    #[test]
    fn test_invalid_url() {
        let err = probe_target("not a url", &DownloadSettings::default()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidUrl(_)));
    }

    #[test]
    fn test_request_deadline_exceeds_connect_timeout() {
        let settings = DownloadSettings::default();
        assert!(settings.request_deadline() > settings.connect_timeout);
    }
}
