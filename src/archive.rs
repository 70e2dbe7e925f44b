//! Handle over one opened remote archive.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::{OpenOptions, RangeSource, open_source};
use crate::zip::{
    CentralDirectory, EndOfCentralDirectory, Entry, EntryFetcher, Listing, ZipParser,
    decode_payload,
};

/// Snapshot handed to a [`ProgressCallback`] while an entry's payload downloads
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Identifier the archive was opened with
    pub archive: &'a str,
    /// Name of the entry being fetched
    pub entry: &'a str,
    /// Compressed bytes received so far
    pub received: u64,
    /// Compressed size of the entry
    pub total: u64,
}

impl Progress<'_> {
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            self.received * 100 / self.total
        }
    }
}

/// Observer for payload downloads. It only ever sees a [`Progress`] snapshot.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &Progress<'_>);
}

impl<F> ProgressCallback for F
where
    F: Fn(&Progress<'_>) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress<'_>) {
        self(progress)
    }
}

/// An archive whose central directory has been read.
///
/// Opening transfers the archive's tail and its central directory. After that
/// the directory is read-only; each [`fetch_entry_data`](Self::fetch_entry_data)
/// transfers one local header and one payload.
pub struct Archive {
    source_id: String,
    source: Arc<dyn RangeSource>,
    options: OpenOptions,
    eocd: EndOfCentralDirectory,
    directory: CentralDirectory,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Archive {
    /// Open `source_id` (URL or local path) with default options
    pub async fn open(source_id: &str) -> Result<Self> {
        Self::open_with(source_id, OpenOptions::default()).await
    }

    /// Open `source_id` and read its central directory
    pub async fn open_with(source_id: &str, options: OpenOptions) -> Result<Self> {
        let source = open_source(source_id, &options).await?;
        Self::from_source(source_id, source, options).await
    }

    /// Open `source_id` with a progress callback already registered
    pub async fn open_with_callback(
        source_id: &str,
        options: OpenOptions,
        callback: impl ProgressCallback + 'static,
    ) -> Result<Self> {
        let mut archive = Self::open_with(source_id, options).await?;
        archive.set_progress_callback(callback);
        Ok(archive)
    }

    /// Read the central directory through an already opened transport
    pub async fn from_source(
        source_id: impl Into<String>,
        source: Arc<dyn RangeSource>,
        options: OpenOptions,
    ) -> Result<Self> {
        let source_id = source_id.into();
        let parser = ZipParser::new(source.as_ref(), &options);
        let (eocd, eocd_offset) = parser.find_eocd().await?;
        let directory = parser.read_central_directory(&eocd, eocd_offset).await?;
        info!(source = %source_id, entries = directory.len(), "opened archive");

        Ok(Self {
            source_id,
            source,
            options,
            eocd,
            directory,
            progress: None,
        })
    }

    /// Replace the registered progress callback
    pub fn set_progress_callback(&mut self, callback: impl ProgressCallback + 'static) {
        self.progress = Some(Arc::new(callback));
    }

    pub fn clear_progress_callback(&mut self) {
        self.progress = None;
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Total length of the archive in bytes
    pub fn archive_len(&self) -> u64 {
        self.source.size()
    }

    pub fn end_of_central_directory(&self) -> &EndOfCentralDirectory {
        &self.eocd
    }

    pub fn directory(&self) -> &CentralDirectory {
        &self.directory
    }

    pub fn entries(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        self.directory.iter()
    }

    /// Exact, case-sensitive lookup by name
    pub fn find_by_name(&self, name: &str) -> Result<Entry<'_>> {
        self.directory
            .find_by_name(name)
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))
    }

    pub fn list_entries(&self) -> Listing {
        self.directory.list()
    }

    /// Fetch and decode one entry.
    ///
    /// The registered callback, if any, is told the running byte count after
    /// every payload chunk.
    pub async fn fetch_entry_data(&self, entry: &Entry<'_>) -> Result<Vec<u8>> {
        EntryFetcher::check_supported(entry)?;

        let name = entry.name_lossy();
        let total = entry.compressed_size();
        let callback = self.progress.as_deref();
        let mut report = |received: u64| {
            if let Some(callback) = callback {
                callback.on_progress(&Progress {
                    archive: &self.source_id,
                    entry: &name,
                    received,
                    total,
                });
            }
        };

        let fetcher = EntryFetcher::new(self.source.as_ref(), &self.options);
        let data = fetcher.fetch_payload(entry, &mut report).await?;
        debug!(name = %name, compressed = data.len(), "payload received");
        decode_payload(entry, data)
    }

    /// Look up `name` exactly and fetch its content
    pub async fn fetch_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.find_by_name(name)?;
        self.fetch_entry_data(&entry).await
    }

    /// Drop the directory buffer and close the transport
    pub fn release(self) {
        debug!(source = %self.source_id, "releasing archive");
    }
}
