//! Main entry point for the partialzip CLI application.
//!
//! Lists remote or local ZIP archives and extracts single entries from them,
//! transferring only the parts of the archive that are needed.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;
use url::Url;

use partialzip::io::open_http;
use partialzip::{Archive, Cli, Entry, Progress};

/// Application entry point.
///
/// HTTP sources go through a reader kept here so the transfer total can be
/// reported; everything else is opened by identifier.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = cli.open_options();

    // Ctrl-C cancels whichever range request is in flight
    let cancel = options.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    if cli.is_http_url() {
        let url = Url::parse(&cli.file).with_context(|| format!("Cannot open {}", cli.file))?;
        let reader = open_http(url, &options)
            .await
            .map(Arc::new)
            .with_context(|| format!("Cannot open {}", cli.file))?;
        let archive = Archive::from_source(cli.file.clone(), reader.clone(), options)
            .await
            .with_context(|| format!("Cannot open {}", cli.file))?;

        let result = process_zip(archive, &cli).await;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!("\nTotal bytes transferred: {}", format_size(reader.transferred_bytes()));
        }
        result
    } else {
        let archive = Archive::open_with(&cli.file, options)
            .await
            .with_context(|| format!("Cannot open {}", cli.file))?;
        process_zip(archive, &cli).await
    }
}

/// Process a ZIP archive based on CLI options.
///
/// This function handles both listing and extraction modes:
/// - List mode (`-l` or `-v`): Display archive contents
/// - Extract mode: Extract the named entries, or every file when none are named
///
/// A missing or failed entry is reported and the remaining entries are still
/// extracted.
///
/// # Arguments
///
/// * `archive` - The opened archive; released before returning
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` when every selected entry was extracted, or an error
/// counting the entries that failed.
async fn process_zip(mut archive: Archive, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        list_files(&archive, cli.verbose);
        archive.release();
        return Ok(());
    }

    if !cli.is_quiet() {
        archive.set_progress_callback(|progress: &Progress<'_>| {
            eprint!("\rGetting: {}%\x1b[K", progress.percent());
            let _ = std::io::stderr().flush();
        });
    }

    let mut failures = 0usize;
    let mut selected = Vec::new();

    if cli.files.is_empty() {
        selected.extend(archive.entries().filter(|e| !e.is_directory()));
    } else {
        // Requested names are matched exactly, in the order given
        for name in &cli.files {
            match archive.find_by_name(name) {
                Ok(entry) => selected.push(entry),
                Err(_) => {
                    if !cli.is_very_quiet() {
                        eprintln!("Cannot find {} in {}", name, archive.source_id());
                    }
                    failures += 1;
                }
            }
        }
    }

    selected.retain(|entry| {
        let name = entry.name_lossy();
        !cli.exclude.iter().any(|x| glob_match(x, &name))
    });

    let multiple_files = cli.pipe && selected.len() > 1;
    for entry in &selected {
        if let Err(err) = extract_file(&archive, entry, cli, multiple_files).await {
            if !cli.is_very_quiet() {
                eprintln!("\nCouldn't extract {}: {:#}", entry.name_lossy(), err);
            }
            failures += 1;
        }
    }

    drop(selected);
    archive.release();

    if failures > 0 {
        bail!("{failures} of the requested entries could not be extracted");
    }
    Ok(())
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Short format (`-l`): size, date, time and name
/// - Verbose format (`-v`): adds compressed size and compression ratio
///
/// # Arguments
///
/// * `archive` - The opened archive
/// * `verbose` - If true, display the verbose table with totals
fn list_files(archive: &Archive, verbose: bool) {
    let listing = archive.list_entries();

    println!("Archive:  {}", archive.source_id());
    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    } else {
        println!("  Length      Date    Time    Name");
        println!("---------  ---------- -----   ----");
    }

    let mut total_compressed = 0u64;

    for entry in &listing.entries {
        let m = entry.modified;
        if verbose {
            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
                entry.size,
                entry.compressed_size,
                ratio(entry.compressed_size, entry.size),
                m.year,
                m.month,
                m.day,
                m.hour,
                m.minute,
                entry.name
            );
            total_compressed += entry.compressed_size;
        } else {
            println!(
                " {:>8}  {:02}-{:02}-{:04} {:02}:{:02}   {}",
                entry.size, m.month, m.day, m.year, m.hour, m.minute, entry.name
            );
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            listing.total_size,
            total_compressed,
            ratio(total_compressed, listing.total_size),
            "",
            listing.file_count
        );
    } else {
        println!("---------                     -------");
        println!("{:<9}                     {} files", listing.total_size, listing.file_count);
    }
}

/// Percentage saved by compression, formatted for the verbose listing
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Extract a single entry.
///
/// Handles various extraction options:
/// - Pipe mode (`-p`): Write to stdout instead of a file
/// - Custom output directory (`-d`): Extract to the specified directory
/// - Junk paths (`-j`): Drop the directory part of the entry name
/// - Overwrite control (`-n`, `-o`): Handle existing files
///
/// # Arguments
///
/// * `archive` - The archive the entry belongs to
/// * `entry` - The entry to extract
/// * `cli` - Parsed command-line arguments
/// * `show_filename` - If true, print a filename marker before the content (pipe mode with multiple files)
///
/// # Returns
///
/// Returns `Ok(())` on success or when the file is skipped. Entry names that
/// would land outside the output directory are an error.
async fn extract_file(
    archive: &Archive,
    entry: &Entry<'_>,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    let file_name = entry.name_lossy().into_owned();

    if cli.pipe {
        let data = archive.fetch_entry_data(entry).await?;
        let mut stdout = tokio::io::stdout();
        if show_filename {
            stdout
                .write_all(format!("--- {} ---\n", file_name).as_bytes())
                .await?;
        }
        stdout.write_all(&data).await?;
        stdout.flush().await?;
        return Ok(());
    }

    let relative = if cli.junk_paths {
        Path::new(&file_name)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.clone())
    } else {
        file_name.clone()
    };
    let relative = contained_path(&relative)?;
    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(&relative),
        None => PathBuf::from(&relative),
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", file_name);
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", file_name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  inflating: {}", file_name);
    }

    // Fetch before touching the filesystem so a failed entry leaves nothing behind
    let data = archive.fetch_entry_data(entry).await?;
    if !cli.is_quiet() {
        eprintln!();
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    let mut file = fs::File::create(&output_path)
        .await
        .with_context(|| format!("Failed to open file at {}", output_path.display()))?;
    file.write_all(&data).await?;
    file.flush().await?;

    Ok(())
}

/// Check that an entry name stays below the output directory.
///
/// Only plain path components are accepted, so absolute names, `..` and
/// drive prefixes are refused.
///
/// # Arguments
///
/// * `name` - The entry name, after junk-path handling
///
/// # Returns
///
/// The name as a relative path, or an error naming the offending entry.
fn contained_path(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        bail!("entry has an empty name");
    }
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        bail!("refusing to write {name} outside the output directory");
    }
    Ok(path.to_path_buf())
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
///
/// # Arguments
///
/// * `pattern` - The glob pattern to match against
/// * `text` - The entry name to check
///
/// # Returns
///
/// Returns `true` if the whole name matches the pattern.
///
/// # Examples
///
/// ```ignore
/// assert!(glob_match("*.txt", "readme.txt"));
/// assert!(!glob_match("a", "data.bin"));
/// ```
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Star matches zero characters, or one and stays for more
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

/// Format a byte size into a human-readable string.
///
/// Picks bytes, KB, MB or GB by magnitude.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
