//! Parsed central directory and lookups over it.
//!
//! The raw directory bytes are kept in one buffer. Each [`CentralDirectoryEntry`]
//! remembers where its record starts, and names are sliced out of the buffer on
//! demand rather than copied per entry.

use std::borrow::Cow;
use std::io::Cursor;

use crate::error::{Error, Result};

use super::structures::{CentralDirectoryEntry, DosDateTime};

/// Central directory bytes plus the records decoded from them
#[derive(Debug, Clone)]
pub struct CentralDirectory {
    buffer: Vec<u8>,
    entries: Vec<CentralDirectoryEntry>,
}

impl CentralDirectory {
    /// Walk `buffer` exactly `count` times.
    ///
    /// Fails if a record is cut short, lacks its signature, declares lengths that
    /// run past the end of the buffer, or if bytes are left over after the last record.
    pub fn parse(buffer: Vec<u8>, count: u16) -> Result<Self> {
        let mut entries = Vec::with_capacity(count as usize);
        let mut pos = 0usize;

        for index in 0..count {
            let remaining = buffer.len() - pos;
            if remaining < CentralDirectoryEntry::SIZE {
                return Err(Error::corrupt(format!(
                    "record {index} at offset {pos} needs {} bytes, {remaining} left",
                    CentralDirectoryEntry::SIZE
                )));
            }

            let mut cursor = Cursor::new(&buffer[pos..pos + CentralDirectoryEntry::SIZE]);
            let entry = CentralDirectoryEntry::read(&mut cursor, pos).map_err(Error::corrupt)?;

            if entry.signature != CentralDirectoryEntry::SIGNATURE {
                return Err(Error::corrupt(format!(
                    "record {index} at offset {pos} has signature {:#010x}",
                    entry.signature
                )));
            }
            if entry.record_len() > remaining {
                return Err(Error::corrupt(format!(
                    "record {index} at offset {pos} declares {} bytes, {remaining} left",
                    entry.record_len()
                )));
            }

            pos += entry.record_len();
            entries.push(entry);
        }

        if pos != buffer.len() {
            return Err(Error::corrupt(format!(
                "{} bytes left over after {count} records",
                buffer.len() - pos
            )));
        }

        Ok(Self { buffer, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size in bytes of the raw directory
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entry<'_>> + '_ {
        self.entries.iter().map(|record| self.view(record))
    }

    pub fn get(&self, index: usize) -> Option<Entry<'_>> {
        self.entries.get(index).map(|record| self.view(record))
    }

    fn view<'a>(&'a self, record: &'a CentralDirectoryEntry) -> Entry<'a> {
        let name_start = record.record_offset + CentralDirectoryEntry::SIZE;
        let extra_start = name_start + record.len_file_name as usize;
        let comment_start = extra_start + record.len_extra as usize;
        let end = comment_start + record.len_comment as usize;
        Entry {
            record,
            name: &self.buffer[name_start..extra_start],
            extra: &self.buffer[extra_start..comment_start],
            comment: &self.buffer[comment_start..end],
        }
    }

    /// Find the entry whose name is byte-for-byte equal to `name`
    pub fn find_by_name(&self, name: impl AsRef<[u8]>) -> Option<Entry<'_>> {
        let name = name.as_ref();
        self.iter().find(|entry| entry.name() == name)
    }

    /// Names, sizes and timestamps of every entry plus totals
    pub fn list(&self) -> Listing {
        let entries: Vec<ListedEntry> = self
            .iter()
            .map(|entry| ListedEntry {
                name: entry.name_lossy().into_owned(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
                modified: entry.record().modified(),
                is_directory: entry.is_directory(),
            })
            .collect();

        Listing {
            total_size: entries.iter().map(|e| e.size).sum(),
            file_count: entries.len(),
            entries,
        }
    }
}

/// One central directory record with its variable-length fields
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    record: &'a CentralDirectoryEntry,
    name: &'a [u8],
    extra: &'a [u8],
    comment: &'a [u8],
}

impl<'a> Entry<'a> {
    pub fn record(&self) -> &'a CentralDirectoryEntry {
        self.record
    }

    /// Raw name bytes as stored in the archive
    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    pub fn name_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.name)
    }

    pub fn extra(&self) -> &'a [u8] {
        self.extra
    }

    pub fn comment(&self) -> &'a [u8] {
        self.comment
    }

    /// Uncompressed size
    pub fn size(&self) -> u64 {
        self.record.size as u64
    }

    pub fn compressed_size(&self) -> u64 {
        self.record.compressed_size as u64
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with(b"/")
    }
}

/// Listing row for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub modified: DosDateTime,
    pub is_directory: bool,
}

/// Every entry plus the summary line totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<ListedEntry>,
    pub total_size: u64,
    pub file_count: usize,
}
