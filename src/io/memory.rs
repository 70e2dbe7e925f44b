use async_trait::async_trait;
use std::sync::Mutex;

use super::{ChunkSink, RangeSource, check_span};
use crate::error::Result;

/// In-memory source that hands out data in fixed-size chunks and records every request
pub(crate) struct MemorySource {
    data: Vec<u8>,
    chunk_size: usize,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl MemorySource {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self::with_chunk_size(data, 64 * 1024)
    }

    pub(crate) fn with_chunk_size(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            chunk_size,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn fetch_range(&self, start: u64, end: u64, sink: &mut ChunkSink<'_>) -> Result<()> {
        check_span(start, end, self.size())?;
        self.requests.lock().unwrap().push((start, end));
        for chunk in self.data[start as usize..=end as usize].chunks(self.chunk_size) {
            sink(chunk)?;
        }
        Ok(())
    }
}
