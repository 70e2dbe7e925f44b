use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ChunkSink, RangeSource, check_span};
use crate::error::{Error, Result};

/// Bytes handed to the sink per positional read
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Local file reader with random access support
pub struct LocalFileReader {
    #[cfg(unix)]
    file: std::fs::File,
    path: PathBuf,
    size: u64,
}

impl LocalFileReader {
    /// Open `path` and stat it for its length
    pub fn open(path: &Path) -> Result<Self> {
        let unreachable = |err: std::io::Error| Error::SourceUnreachable {
            source_id: path.display().to_string(),
            reason: err.to_string(),
        };

        let file = std::fs::File::open(path).map_err(unreachable)?;
        let size = file.metadata().map_err(unreachable)?.len();
        debug!(path = %path.display(), size, "opened local archive");

        Ok(Self {
            #[cfg(unix)]
            file,
            path: path.to_path_buf(),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RangeSource for LocalFileReader {
    fn size(&self) -> u64 {
        self.size
    }

    async fn fetch_range(&self, start: u64, end: u64, sink: &mut ChunkSink<'_>) -> Result<()> {
        let len = check_span(start, end, self.size)?;
        debug!(path = %self.path.display(), start, end, "reading range");

        // pread leaves the shared handle untouched, so concurrent fetches are fine
        #[cfg(unix)]
        let read_at = |buf: &mut [u8], offset: u64| {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset)
        };

        // Without pread every fetch gets its own handle to seek on
        #[cfg(not(unix))]
        let mut file = std::fs::File::open(&self.path)?;
        #[cfg(not(unix))]
        let mut read_at = |buf: &mut [u8], offset: u64| {
            use std::io::{Read, Seek, SeekFrom};
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(buf)
        };

        let mut buf = vec![0u8; READ_CHUNK_SIZE.min(len as usize)];
        let mut offset = start;
        while offset <= end {
            let n = (end - offset + 1).min(buf.len() as u64) as usize;
            read_at(&mut buf[..n], offset).map_err(|e| {
                Error::transport(format!("short read at offset {offset} of {}: {e}", self.path.display()))
            })?;
            sink(&buf[..n])?;
            offset += n as u64;
        }

        Ok(())
    }
}
