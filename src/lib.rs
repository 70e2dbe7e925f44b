//! # partialzip
//!
//! Read individual files out of remote ZIP archives without downloading them.
//!
//! Opening an archive fetches only its tail (to find the End of Central
//! Directory) and its central directory. Fetching an entry then transfers that
//! entry's local header and compressed payload and nothing else. Sources are
//! HTTP(S) URLs, served with Range requests, or local paths.
//!
//! ## Features
//!
//! - HTTP/HTTPS byte-range transport and positional reads for local files
//! - Exact-name lookup and listing with decoded MS-DOS timestamps
//! - STORED and DEFLATE entries
//! - Progress callbacks during payload transfer
//! - Per-request timeouts and cancellation
//!
//! ## Example
//!
//! ```no_run
//! use partialzip::Archive;
//!
//! #[tokio::main]
//! async fn main() -> partialzip::Result<()> {
//!     let archive = Archive::open("https://example.com/archive.zip").await?;
//!
//!     for entry in &archive.list_entries().entries {
//!         println!("{} ({} bytes)", entry.name, entry.size);
//!     }
//!
//!     let readme = archive.fetch_by_name("README.md").await?;
//!     println!("{}", String::from_utf8_lossy(&readme));
//!
//!     archive.release();
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use archive::{Archive, Progress, ProgressCallback};
pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{HttpRangeReader, LocalFileReader, OpenOptions, RangeSource};
pub use zip::{Entry, ListedEntry, Listing};
