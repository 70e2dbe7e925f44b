//! Locating and reading the central directory of a remote archive.
//!
//! ZIP files are designed to be read from the end:
//! 1. Fetch the tail window that must contain the End of Central Directory (EOCD)
//! 2. Find the one EOCD whose comment runs exactly to the end of the file
//! 3. Fetch the Central Directory it points at in a single range request
//!
//! Only the tail and the directory are transferred, which is what makes
//! listing a large remote archive cheap.

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{OpenOptions, RangeSource};

use super::directory::CentralDirectory;
use super::structures::EndOfCentralDirectory;

/// Length of the tail window searched for the EOCD.
///
/// The record is 22 bytes and may be followed by up to 65535 bytes of comment.
pub fn eocd_window_len(archive_len: u64) -> u64 {
    archive_len.min((EndOfCentralDirectory::MAX_COMMENT_LEN + EndOfCentralDirectory::SIZE) as u64)
}

/// Find the EOCD in the tail `window` of an archive.
///
/// Scans forward for the signature and accepts the first candidate whose
/// declared comment ends exactly at the end of the window. Signature bytes
/// that merely occur inside a comment fail that check.
///
/// Returns the record and its position inside the window.
pub fn locate_eocd(window: &[u8]) -> Option<(usize, EndOfCentralDirectory)> {
    let signature = EndOfCentralDirectory::SIGNATURE.to_le_bytes();
    let last_start = window.len().checked_sub(EndOfCentralDirectory::SIZE)?;

    (0..=last_start)
        .filter(|&i| window[i..i + 4] == signature)
        .filter_map(|i| EndOfCentralDirectory::from_bytes(&window[i..]).map(|eocd| (i, eocd)))
        .find(|(i, eocd)| i + EndOfCentralDirectory::SIZE + eocd.comment_len as usize == window.len())
}

/// Low-level ZIP file parser.
///
/// Borrows the transport of an archive being opened and issues its fetches
/// one after another.
pub struct ZipParser<'a> {
    source: &'a dyn RangeSource,
    options: &'a OpenOptions,
}

impl<'a> ZipParser<'a> {
    pub fn new(source: &'a dyn RangeSource, options: &'a OpenOptions) -> Self {
        Self { source, options }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its absolute offset in the archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let size = self.source.size();
        if size < EndOfCentralDirectory::SIZE as u64 {
            return Err(Error::NotAZipArchive);
        }

        let window_start = size - eocd_window_len(size);
        let window = self
            .options
            .guard(self.source.fetch_range_bytes(window_start, size - 1))
            .await?;

        let (pos, eocd) = locate_eocd(&window).ok_or(Error::NotAZipArchive)?;
        let eocd_offset = window_start + pos as u64;
        debug!(
            eocd_offset,
            entries = eocd.total_entries,
            cd_offset = eocd.cd_offset,
            cd_size = eocd.cd_size,
            "found end of central directory"
        );

        Ok((eocd, eocd_offset))
    }

    /// Fetch the central directory described by `eocd` and walk it.
    pub async fn read_central_directory(
        &self,
        eocd: &EndOfCentralDirectory,
        eocd_offset: u64,
    ) -> Result<CentralDirectory> {
        if eocd.is_multi_disk() {
            return Err(Error::corrupt(format!(
                "archive spans disks (disk {}, directory on disk {})",
                eocd.disk_number, eocd.disk_with_cd
            )));
        }

        let cd_offset = eocd.cd_offset as u64;
        let cd_size = eocd.cd_size as u64;
        if cd_offset + cd_size > eocd_offset {
            return Err(Error::corrupt(format!(
                "directory {cd_offset}+{cd_size} overlaps the end record at {eocd_offset}"
            )));
        }

        let buffer = if cd_size == 0 {
            Vec::new()
        } else {
            self.options
                .guard(self.source.fetch_range_bytes(cd_offset, cd_offset + cd_size - 1))
                .await?
        };

        CentralDirectory::parse(buffer, eocd.total_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::memory::MemorySource;

    fn eocd_bytes(entries: u16, cd_size: u32, cd_offset: u32, comment: &[u8]) -> Vec<u8> {
        let mut raw = b"PK\x05\x06".to_vec();
        raw.extend_from_slice(&[0u8; 4]);
        raw.extend_from_slice(&entries.to_le_bytes());
        raw.extend_from_slice(&entries.to_le_bytes());
        raw.extend_from_slice(&cd_size.to_le_bytes());
        raw.extend_from_slice(&cd_offset.to_le_bytes());
        raw.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        raw.extend_from_slice(comment);
        raw
    }

    #[test]
    fn window_is_bounded_by_the_comment_limit() {
        assert_eq!(eocd_window_len(100), 100);
        assert_eq!(eocd_window_len(10_000_000), 65_557);
    }

    #[test]
    fn finds_trailing_record_without_comment() {
        let mut window = vec![0xAAu8; 40];
        window.extend(eocd_bytes(0, 0, 0, b""));
        let (pos, eocd) = locate_eocd(&window).unwrap();
        assert_eq!(pos, 40);
        assert_eq!(eocd.comment_len, 0);
    }

    #[test]
    fn signature_inside_comment_is_rejected() {
        // The comment holds a complete fake record whose own comment length
        // does not reach the end of the window.
        let fake = eocd_bytes(9, 99, 999, b"");
        let mut comment = b"see ".to_vec();
        comment.extend(&fake);
        comment.extend_from_slice(b" tail");

        let mut window = vec![0u8; 10];
        window.extend(eocd_bytes(1, 46, 0, &comment));
        let (pos, eocd) = locate_eocd(&window).unwrap();
        assert_eq!(pos, 10);
        assert_eq!(eocd.total_entries, 1);
        assert_eq!(eocd.comment_len as usize, comment.len());
    }

    #[test]
    fn no_record_means_no_match() {
        assert!(locate_eocd(&[0u8; 100]).is_none());
        assert!(locate_eocd(b"PK\x05\x06").is_none());
        // Right signature, comment length pointing past the window
        let mut window = eocd_bytes(0, 0, 0, b"");
        window[20] = 4;
        assert!(locate_eocd(&window).is_none());
    }

    #[tokio::test]
    async fn tiny_source_is_not_an_archive() {
        let source = MemorySource::new(b"PK\x05\x06".to_vec());
        let options = OpenOptions::default();
        let err = ZipParser::new(&source, &options).find_eocd().await.unwrap_err();
        assert!(matches!(err, Error::NotAZipArchive));
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn fetches_only_the_tail_window() {
        let mut data = vec![0u8; 100_000];
        data.extend(eocd_bytes(0, 0, 100_000, b""));
        let len = data.len() as u64;
        let source = MemorySource::new(data);
        let options = OpenOptions::default();

        let (eocd, offset) = ZipParser::new(&source, &options).find_eocd().await.unwrap();
        assert_eq!(offset, 100_000);
        assert_eq!(eocd.total_entries, 0);
        assert_eq!(source.requests(), vec![(len - 65_557, len - 1)]);
    }

    #[tokio::test]
    async fn directory_past_end_record_is_corrupt() {
        let data = eocd_bytes(1, 46, 10, b"");
        let source = MemorySource::new(data);
        let options = OpenOptions::default();
        let parser = ZipParser::new(&source, &options);

        let (eocd, offset) = parser.find_eocd().await.unwrap();
        let err = parser.read_central_directory(&eocd, offset).await.unwrap_err();
        assert!(matches!(err, Error::TruncatedOrCorruptDirectory(_)));
    }
}
