use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::fetch::{map_reqwest_error, DEFAULT_USER_AGENT};
use crate::{FailureKind, FetchError, MirrorError};

/// Text that marks a small download as an error page rather than a file.
const ERROR_MARKERS: &[&str] = &[
    "error",
    "not found",
    "404",
    "forbidden",
    "unauthorized",
    "<html",
    "<!doctype",
    "gofile.io",
    "page not found",
];

const MARKUP_PREFIXES: &[&str] = &["<!doctype", "<html"];

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub connect_timeout: Duration,
    /// Bound on the redirect-resolving metadata request.
    pub metadata_timeout: Duration,
    /// Bound on the response head and on each body read.
    pub body_timeout: Duration,
    /// Files below this size have their leading bytes inspected.
    pub small_file_bytes: u64,
    /// Small files that are not readable as text are rejected below this size.
    pub unreadable_floor_bytes: u64,
    /// How many leading bytes are inspected.
    pub sniff_bytes: usize,
    pub user_agent: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            metadata_timeout: Duration::from_secs(30),
            body_timeout: Duration::from_secs(60),
            small_file_bytes: 100 * 1024,
            unreadable_floor_bytes: 10 * 1024,
            sniff_bytes: 2000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A transfer that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub path: PathBuf,
    pub bytes: u64,
    /// Url the body was actually read from.
    pub final_url: String,
    /// Lower-case hex SHA-256 of the written file.
    pub sha256: String,
    /// 1 when the redirect-resolved url worked, 2 for the fallback.
    pub attempt: u8,
}

/// Streams a resource to disk and rejects results that look like error pages.
#[derive(Debug, Clone)]
pub struct VerifiedTransfer {
    client: reqwest::Client,
    settings: TransferSettings,
}

impl VerifiedTransfer {
    pub fn new(settings: TransferSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// [`Self::download`] reduced to pass/fail.
    pub async fn transfer(&self, url: &str, dest: &Path) -> bool {
        self.download(url, dest).await.is_ok()
    }

    /// Two attempts: the redirect-resolved url first, then the original url.
    /// A failed attempt never leaves a file at `dest`.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<TransferReport, MirrorError> {
        engine_info!("Downloading {} to {:?}", url, dest);
        match self.attempt(url, dest, 1).await {
            Ok(report) => return Ok(report),
            Err(err) => {
                engine_warn!("Attempt 1 failed: {}. Retrying the original url", err);
                discard(dest).await;
            }
        }
        match self.attempt(url, dest, 2).await {
            Ok(report) => Ok(report),
            Err(err) => {
                engine_warn!("Attempt 2 failed: {}", err);
                discard(dest).await;
                Err(err)
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        dest: &Path,
        attempt: u8,
    ) -> Result<TransferReport, MirrorError> {
        let target = if attempt == 1 {
            self.resolve_redirects(url).await?
        } else {
            url.to_string()
        };

        let response = tokio::time::timeout(self.settings.body_timeout, self.client.get(&target).send())
            .await
            .map_err(|_| timeout_error(&target))?
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(FailureKind::HttpStatus(status.as_u16()), status.to_string()).into());
        }
        let final_url = response.url().to_string();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(ct) = content_type.filter(|ct| ct.contains("text/html")) {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType { content_type: ct },
                "server answered with a web page instead of a file",
            )
            .into());
        }

        let mut file = File::create(dest).await.map_err(|err| io_error(dest, err))?;
        let mut hasher = Sha256::new();
        let mut head: Vec<u8> = Vec::with_capacity(self.settings.sniff_bytes);
        let mut bytes: u64 = 0;
        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::time::timeout(self.settings.body_timeout, stream.next())
                .await
                .map_err(|_| timeout_error(&final_url))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(map_reqwest_error)?;
            if head.len() < self.settings.sniff_bytes {
                let take = (self.settings.sniff_bytes - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(|err| io_error(dest, err))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|err| io_error(dest, err))?;
        file.sync_all().await.map_err(|err| io_error(dest, err))?;
        drop(file);

        if looks_like_markup(&head) {
            return Err(MirrorError::integrity(dest, "body is an HTML document"));
        }
        if bytes < self.settings.small_file_bytes {
            engine_warn!("Downloaded file is very small ({} bytes), checking its content", bytes);
            self.verify_small_file(dest, &head, bytes)?;
        }

        let report = TransferReport {
            path: dest.to_path_buf(),
            bytes,
            final_url,
            sha256: format!("{:x}", hasher.finalize()),
            attempt,
        };
        engine_info!(
            "Download completed: {:?} ({} bytes, sha256 {})",
            report.path,
            report.bytes,
            report.sha256
        );
        Ok(report)
    }

    /// Follow redirects with a HEAD request and return where they end.
    /// Any status is accepted; only transport errors fail.
    async fn resolve_redirects(&self, url: &str) -> Result<String, MirrorError> {
        let response = tokio::time::timeout(self.settings.metadata_timeout, self.client.head(url).send())
            .await
            .map_err(|_| timeout_error(url))?
            .map_err(map_reqwest_error)?;
        let final_url = response.url().to_string();
        if final_url != url {
            engine_debug!("Redirects resolved {} to {}", url, final_url);
        }
        Ok(final_url)
    }

    fn verify_small_file(&self, dest: &Path, head: &[u8], bytes: u64) -> Result<(), MirrorError> {
        // Invalid sequences are dropped before scanning; legacy-encoded error
        // pages still carry ASCII markers.
        let lower = String::from_utf8_lossy(head).to_lowercase();
        if let Some(marker) = ERROR_MARKERS.iter().find(|m| lower.contains(*m)) {
            return Err(MirrorError::integrity(
                dest,
                format!("small file contains error marker {marker:?}"),
            ));
        }
        if leading_text(head).is_none() && bytes < self.settings.unreadable_floor_bytes {
            return Err(MirrorError::integrity(
                dest,
                format!("{bytes} bytes is too small to be a valid file"),
            ));
        }
        Ok(())
    }
}

/// `head` as UTF-8, tolerating a character cut off at the end.
fn leading_text(head: &[u8]) -> Option<&str> {
    match std::str::from_utf8(head) {
        Ok(text) => Some(text),
        Err(err) if err.error_len().is_none() => std::str::from_utf8(&head[..err.valid_up_to()]).ok(),
        Err(_) => None,
    }
}

fn looks_like_markup(head: &[u8]) -> bool {
    let start = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    let prefix = String::from_utf8_lossy(&head[start..head.len().min(start + 16)]).to_lowercase();
    MARKUP_PREFIXES.iter().any(|p| prefix.starts_with(p))
}

fn timeout_error(url: &str) -> MirrorError {
    FetchError::new(FailureKind::Timeout, format!("no response from {url}")).into()
}

fn io_error(dest: &Path, err: io::Error) -> MirrorError {
    MirrorError::integrity(dest, err.to_string())
}

async fn discard(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => engine_debug!("Removed partial file {:?}", dest),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => engine_warn!("Could not remove partial file {:?}: {}", dest, err),
    }
}
