#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

/// 2024-01-02
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (1 << 5) | 2;
/// 03:04:30
pub const DOS_TIME: u16 = (3 << 11) | (4 << 5) | 15;

pub struct TestEntry {
    pub name: Vec<u8>,
    pub content: Vec<u8>,
    pub method: u16,
    pub flags: u16,
    pub local_extra: Vec<u8>,
    pub central_extra: Vec<u8>,
    pub comment: Vec<u8>,
}

impl TestEntry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self::new(name, content, 0)
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        Self::new(name, content, 8)
    }

    pub fn new(name: &str, content: &[u8], method: u16) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            content: content.to_vec(),
            method,
            flags: 0,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn local_extra(mut self, extra: &[u8]) -> Self {
        self.local_extra = extra.to_vec();
        self
    }

    pub fn central_extra(mut self, extra: &[u8]) -> Self {
        self.central_extra = extra.to_vec();
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    fn payload(&self) -> Vec<u8> {
        if self.method == 8 {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(&self.content).unwrap();
            encoder.finish().unwrap()
        } else {
            self.content.clone()
        }
    }
}

/// Layout facts about a built archive
pub struct Built {
    pub bytes: Vec<u8>,
    pub cd_offset: usize,
    pub cd_size: usize,
    pub compressed_sizes: Vec<usize>,
}

/// Assemble an archive: local headers and payloads, central directory, end record
pub fn build_archive(entries: &[TestEntry], archive_comment: &[u8]) -> Built {
    let mut out = Vec::new();
    let mut central = Vec::new();
    let mut compressed_sizes = Vec::new();

    for entry in entries {
        let payload = entry.payload();
        let offset = out.len() as u32;
        compressed_sizes.push(payload.len());

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&entry.flags.to_le_bytes());
        out.extend_from_slice(&entry.method.to_le_bytes());
        out.extend_from_slice(&DOS_TIME.to_le_bytes());
        out.extend_from_slice(&DOS_DATE.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        if entry.flags & 0x0008 != 0 {
            // sizes deferred to the data descriptor
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        } else {
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.content.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(entry.local_extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&entry.name);
        out.extend_from_slice(&entry.local_extra);
        out.extend_from_slice(&payload);
        if entry.flags & 0x0008 != 0 {
            out.extend_from_slice(b"PK\x07\x08");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.content.len() as u32).to_le_bytes());
        }

        central.extend_from_slice(b"PK\x01\x02");
        central.extend_from_slice(&0x031Eu16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&entry.flags.to_le_bytes());
        central.extend_from_slice(&entry.method.to_le_bytes());
        central.extend_from_slice(&DOS_TIME.to_le_bytes());
        central.extend_from_slice(&DOS_DATE.to_le_bytes());
        central.extend_from_slice(&0u32.to_le_bytes());
        central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        central.extend_from_slice(&(entry.content.len() as u32).to_le_bytes());
        central.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        central.extend_from_slice(&(entry.central_extra.len() as u16).to_le_bytes());
        central.extend_from_slice(&(entry.comment.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u32.to_le_bytes());
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(&entry.name);
        central.extend_from_slice(&entry.central_extra);
        central.extend_from_slice(&entry.comment);
    }

    let cd_offset = out.len();
    let cd_size = central.len();
    out.extend_from_slice(&central);

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(cd_size as u32).to_le_bytes());
    out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
    out.extend_from_slice(&(archive_comment.len() as u16).to_le_bytes());
    out.extend_from_slice(archive_comment);

    Built {
        bytes: out,
        cd_offset,
        cd_size,
        compressed_sizes,
    }
}

/// Write `bytes` to a fresh temporary file
pub fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Some text that deflate shrinks but does not make trivial
pub fn sample_text(len: usize) -> Vec<u8> {
    let words = ["partial ", "zip ", "range ", "request ", "central ", "directory "];
    let mut out = Vec::with_capacity(len + 16);
    let mut i = 0usize;
    while out.len() < len {
        out.extend_from_slice(words[(i * 7 + i / 3) % words.len()].as_bytes());
        out.extend_from_slice(i.to_string().as_bytes());
        i += 1;
    }
    out.truncate(len);
    out
}
