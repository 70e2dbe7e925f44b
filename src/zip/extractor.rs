use flate2::{Decompress, FlushDecompress, Status};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{OpenOptions, RangeSource};

use super::directory::Entry;
use super::structures::{CompressionMethod, LocalFileHeader};

/// Fetches and decodes the payload of single entries
pub struct EntryFetcher<'a> {
    source: &'a dyn RangeSource,
    options: &'a OpenOptions,
}

impl<'a> EntryFetcher<'a> {
    pub fn new(source: &'a dyn RangeSource, options: &'a OpenOptions) -> Self {
        Self { source, options }
    }

    /// Refuse entries this reader cannot decode before any payload is transferred
    pub fn check_supported(entry: &Entry<'_>) -> Result<()> {
        let record = entry.record();
        if record.is_encrypted() {
            return Err(Error::EncryptedEntry(entry.name_lossy().into_owned()));
        }
        if let CompressionMethod::Unknown(method) = record.compression_method() {
            return Err(Error::UnsupportedCompressionMethod {
                name: entry.name_lossy().into_owned(),
                method,
            });
        }
        Ok(())
    }

    /// Read the Local File Header at the entry's offset.
    pub async fn local_header(&self, entry: &Entry<'_>) -> Result<LocalFileHeader> {
        let offset = entry.record().offset as u64;
        let end = offset + LocalFileHeader::SIZE as u64 - 1;
        if end >= self.source.size() {
            return Err(Error::InvalidLocalHeader(offset));
        }

        let raw = self
            .options
            .guard(self.source.fetch_range_bytes(offset, end))
            .await?;
        LocalFileHeader::from_bytes(&raw).ok_or(Error::InvalidLocalHeader(offset))
    }

    /// Resolve the payload position and fetch the entry's compressed bytes.
    ///
    /// `on_chunk` sees the running byte count after every chunk; the last call
    /// reports the full compressed size. Sizes come from the central directory,
    /// which is authoritative even for entries written with a data descriptor.
    pub async fn fetch_payload(
        &self,
        entry: &Entry<'_>,
        on_chunk: &mut (dyn FnMut(u64) + Send),
    ) -> Result<Vec<u8>> {
        let header = self.local_header(entry).await?;
        let start = entry.record().offset as u64 + header.payload_offset();
        let compressed = entry.compressed_size();

        if entry.record().has_data_descriptor() {
            debug!(name = %entry.name_lossy(), "entry uses a data descriptor, sizing from central directory");
        }
        if compressed == 0 {
            return Ok(Vec::new());
        }

        let end = start + compressed - 1;
        if end >= self.source.size() {
            return Err(Error::corrupt(format!(
                "payload of {} spans {start}-{end}, past the end of the archive ({} bytes)",
                entry.name_lossy(),
                self.source.size()
            )));
        }
        debug!(name = %entry.name_lossy(), start, end, "fetching payload");

        let mut data = Vec::with_capacity(compressed as usize);
        self.options
            .guard(self.source.fetch_range(start, end, &mut |chunk: &[u8]| {
                data.extend_from_slice(chunk);
                on_chunk(data.len() as u64);
                Ok(())
            }))
            .await?;

        if data.len() as u64 != compressed {
            return Err(Error::transport(format!(
                "payload fetch returned {} of {compressed} bytes",
                data.len()
            )));
        }
        Ok(data)
    }
}

/// Turn fetched payload bytes into the entry's content.
///
/// The result is exactly `entry.size()` bytes or an error.
pub fn decode_payload(entry: &Entry<'_>, data: Vec<u8>) -> Result<Vec<u8>> {
    let failure = |reason: String| Error::DecompressionFailure {
        name: entry.name_lossy().into_owned(),
        reason,
    };
    let expected = entry.size() as usize;

    match entry.record().compression_method() {
        CompressionMethod::Stored => {
            if data.len() != expected {
                return Err(failure(format!(
                    "stored size mismatch: {} bytes, expected {expected}",
                    data.len()
                )));
            }
            Ok(data)
        }
        CompressionMethod::Deflate => inflate_raw(&data, expected).map_err(failure),
        CompressionMethod::Unknown(method) => Err(Error::UnsupportedCompressionMethod {
            name: entry.name_lossy().into_owned(),
            method,
        }),
    }
}

/// Inflate a raw DEFLATE stream that must decode to exactly `expected` bytes
fn inflate_raw(input: &[u8], expected: usize) -> std::result::Result<Vec<u8>, String> {
    let mut inflater = Decompress::new(false);
    // One spare byte so an overlong stream shows up as a length mismatch
    let mut output = Vec::with_capacity(expected + 1);

    match inflater.decompress_vec(input, &mut output, FlushDecompress::Finish) {
        Ok(Status::StreamEnd) if output.len() == expected => Ok(output),
        Ok(Status::StreamEnd) => Err(format!(
            "inflated to {} bytes, expected {expected}",
            output.len()
        )),
        Ok(_) if output.len() > expected => {
            Err(format!("inflated output exceeds expected {expected} bytes"))
        }
        Ok(_) => Err(format!(
            "deflate stream ended early after {} of {} input bytes",
            inflater.total_in(),
            input.len()
        )),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_exact_size() {
        let text = b"hello hello hello hello partial zip".repeat(20);
        let out = inflate_raw(&deflate(&text), text.len()).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn inflates_empty_stream() {
        assert!(inflate_raw(&deflate(b""), 0).unwrap().is_empty());
    }

    #[test]
    fn truncated_stream_fails() {
        let text = b"some text that compresses somewhat".repeat(50);
        let packed = deflate(&text);
        assert!(inflate_raw(&packed[..packed.len() / 2], text.len()).is_err());
    }

    #[test]
    fn size_mismatch_fails() {
        let text = b"0123456789".repeat(10);
        let packed = deflate(&text);
        assert!(inflate_raw(&packed, text.len() - 1).is_err());
        assert!(inflate_raw(&packed, text.len() + 1).is_err());
    }

    #[test]
    fn garbage_fails() {
        assert!(inflate_raw(&[0xFF; 32], 100).is_err());
    }
}
