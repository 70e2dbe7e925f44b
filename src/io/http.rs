use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

use super::{ChunkSink, OpenOptions, RangeSource, check_span};
use crate::error::{Error, Result};

/// Client shared by every open HTTP archive; freed when the last one is released
static SHARED_CLIENT: Mutex<Weak<Client>> = parking_lot::const_mutex(Weak::new());

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the process-wide client, building it if no archive holds it right now
fn shared_client() -> Result<Arc<Client>> {
    let mut slot = SHARED_CLIENT.lock();
    if let Some(client) = slot.upgrade() {
        return Ok(client);
    }

    let client = Arc::new(
        Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("partialzip/", env!("CARGO_PKG_VERSION")))
            .build()?,
    );
    debug!("created shared HTTP client");
    *slot = Arc::downgrade(&client);
    Ok(client)
}

/// HTTP Range reader for remote ZIP files
pub struct HttpRangeReader {
    client: Arc<Client>,
    url: Url,
    size: u64,
    user_agent: Option<String>,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This sends a HEAD request to get the file size
    pub async fn connect(url: Url, options: &OpenOptions) -> Result<Self> {
        let unreachable = |reason: String| Error::SourceUnreachable {
            source_id: url.to_string(),
            reason,
        };

        let client = shared_client()?;

        let mut request = client.head(url.clone());
        if let Some(agent) = &options.user_agent {
            request = request.header(USER_AGENT, agent);
        }
        let resp = match options.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, request.send())
                .await
                .map_err(|_| unreachable(format!("connection timed out after {limit:?}")))?,
            None => request.send().await,
        }
        .map_err(|e| unreachable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(unreachable(format!("HEAD request failed with status: {}", resp.status())));
        }

        let accept_ranges = resp
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            warn!(%url, "server does not advertise byte range support");
        }

        // Read the header directly; hyper reports a zero body size hint for HEAD
        let size = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unreachable("server did not return Content-Length".to_string()))?;
        debug!(%url, size, "probed remote archive");

        Ok(Self {
            client,
            url,
            size,
            user_agent: options.user_agent.clone(),
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RangeSource for HttpRangeReader {
    fn size(&self) -> u64 {
        self.size
    }

    async fn fetch_range(&self, start: u64, end: u64, sink: &mut ChunkSink<'_>) -> Result<()> {
        let expected = check_span(start, end, self.size)?;
        debug!(url = %self.url, start, end, "requesting range");

        let mut request = self
            .client
            .get(self.url.clone())
            .header(RANGE, format!("bytes={start}-{end}"));
        if let Some(agent) = &self.user_agent {
            request = request.header(USER_AGENT, agent);
        }
        let mut resp = request.send().await?;

        // A plain 200 is only acceptable when the span is the whole resource
        let whole = start == 0 && expected == self.size;
        let status = resp.status();
        if status != StatusCode::PARTIAL_CONTENT && !(status == StatusCode::OK && whole) {
            return Err(Error::transport(format!(
                "range request {start}-{end} failed with status: {status}"
            )));
        }

        if status == StatusCode::PARTIAL_CONTENT {
            let content_range = resp.headers().get(CONTENT_RANGE).and_then(|v| v.to_str().ok());
            let matches = content_range.and_then(parse_content_range).is_some_and(|(from, to, total)| {
                from == start && to == end && total.is_none_or(|t| t == self.size)
            });
            if !matches {
                return Err(Error::transport(format!(
                    "range request {start}-{end} answered with Content-Range {}",
                    content_range.unwrap_or("<missing>")
                )));
            }
        }

        let mut received = 0u64;
        while received < expected {
            let Some(chunk) = resp.chunk().await? else {
                break;
            };
            let take = chunk.len().min((expected - received) as usize);
            trace!(len = take, "received chunk");
            if take > 0 {
                sink(&chunk[..take])?;
                received += take as u64;
                self.transferred_bytes.fetch_add(take as u64, Ordering::Relaxed);
            }
        }

        if received < expected {
            return Err(Error::transport(format!(
                "short read for range {start}-{end}: got {received} of {expected} bytes"
            )));
        }

        Ok(())
    }
}

/// Parse `bytes <start>-<end>/<total>`; the total may be `*`
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let (span, total) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    let total = match total {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some((start.parse().ok()?, end.parse().ok()?, total))
}
