//! ZIP archive parsing and entry extraction over range reads.
//!
//! ## Architecture
//!
//! - [`structures`]: fixed wire records (EOCD, central directory entry, local header)
//! - [`parser`]: EOCD search in the tail window and the central directory fetch
//! - [`directory`]: the walked central directory, exact lookup and listing
//! - [`extractor`]: local header resolution, payload fetch and decompression
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! All integers on the wire are little-endian.
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only
//! - No encryption, ZIP64 or multi-disk support
//! - CRC32 values are exposed but not checked

mod directory;
mod extractor;
mod parser;
mod structures;

pub use directory::{CentralDirectory, Entry, ListedEntry, Listing};
pub use extractor::{EntryFetcher, decode_payload};
pub use parser::{ZipParser, eocd_window_len, locate_eocd};
pub use structures::*;
