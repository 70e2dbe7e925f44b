//! Range transport: inclusive byte-span reads from local files and HTTP servers.

mod http;
mod local;
#[cfg(test)]
pub(crate) mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};

/// Receives the bytes of a range fetch in order, one chunk at a time
pub type ChunkSink<'a> = dyn FnMut(&[u8]) -> Result<()> + Send + 'a;

/// Trait for inclusive byte-range reads from a data source
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Total size of the data source in bytes
    fn size(&self) -> u64;

    /// Fetch bytes `start..=end`, handing them to `sink` as they arrive.
    ///
    /// Either exactly `end - start + 1` bytes reach the sink or an error is returned.
    async fn fetch_range(&self, start: u64, end: u64, sink: &mut ChunkSink<'_>) -> Result<()>;

    /// Fetch bytes `start..=end` into one buffer
    async fn fetch_range_bytes(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(span_len(start, end)? as usize);
        self.fetch_range(start, end, &mut |chunk: &[u8]| {
            out.extend_from_slice(chunk);
            Ok(())
        })
        .await?;
        Ok(out)
    }
}

/// Number of bytes in the inclusive span, rejecting inverted spans
pub(crate) fn span_len(start: u64, end: u64) -> Result<u64> {
    if end < start {
        return Err(Error::transport(format!("invalid range {start}-{end}")));
    }
    Ok(end - start + 1)
}

/// Reject spans that run past the end of a source of `size` bytes
pub(crate) fn check_span(start: u64, end: u64, size: u64) -> Result<u64> {
    let len = span_len(start, end)?;
    if end >= size {
        return Err(Error::transport(format!(
            "range {start}-{end} extends past end of source ({size} bytes)"
        )));
    }
    Ok(len)
}

/// Settings applied to every fetch issued for one archive
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Upper bound for a single range request, including the body transfer
    pub request_timeout: Option<Duration>,
    /// Upper bound for opening an HTTP source, including the length probe
    pub connect_timeout: Option<Duration>,
    /// `User-Agent` sent with HTTP requests
    pub user_agent: Option<String>,
    /// Cancels whichever fetch is in flight
    pub cancel: CancellationToken,
}

impl OpenOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one blocking fetch under the timeout and cancellation token
    pub async fn guard<T>(&self, fetch: impl Future<Output = Result<T>>) -> Result<T> {
        let timed = async {
            match self.request_timeout {
                Some(limit) => tokio::time::timeout(limit, fetch).await.unwrap_or_else(|_| {
                    Err(Error::transport(format!("request timed out after {limit:?}")))
                }),
                None => fetch.await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            result = timed => result,
        }
    }
}

/// Turn a source identifier into a URL.
///
/// Anything without a `://` is taken as a local path and becomes a `file://` URL.
pub fn normalize_source_id(source_id: &str) -> Result<Url> {
    let unreachable = |reason: String| Error::SourceUnreachable {
        source_id: source_id.to_string(),
        reason,
    };

    if source_id.contains("://") {
        return Url::parse(source_id).map_err(|e| unreachable(e.to_string()));
    }

    let absolute = std::path::absolute(Path::new(source_id)).map_err(|e| unreachable(e.to_string()))?;
    Url::from_file_path(&absolute).map_err(|()| unreachable("not a valid file path".to_string()))
}

/// Connect to an HTTP source and probe its length.
///
/// The probe runs under the request timeout and cancellation token. Any
/// failure other than cancellation means the source could not be opened.
pub async fn open_http(url: Url, options: &OpenOptions) -> Result<HttpRangeReader> {
    let source_id = url.to_string();
    options
        .guard(HttpRangeReader::connect(url, options))
        .await
        .map_err(|err| match err {
            Error::TransportFailure(reason) => Error::SourceUnreachable { source_id, reason },
            other => other,
        })
}

/// Open a transport for `source_id` and probe its length
pub async fn open_source(source_id: &str, options: &OpenOptions) -> Result<Arc<dyn RangeSource>> {
    let url = normalize_source_id(source_id)?;

    match url.scheme() {
        "file" => {
            let path = url.to_file_path().map_err(|()| Error::SourceUnreachable {
                source_id: source_id.to_string(),
                reason: "file URL does not name a local path".to_string(),
            })?;
            Ok(Arc::new(LocalFileReader::open(&path)?))
        }
        "http" | "https" => {
            Ok(Arc::new(open_http(url, options).await?))
        }
        scheme => Err(Error::SourceUnreachable {
            source_id: source_id.to_string(),
            reason: format!("no transport for scheme '{scheme}'"),
        }),
    }
}
