use clap::Parser;
use std::time::Duration;

use crate::io::OpenOptions;

#[derive(Parser, Debug)]
#[command(name = "partialzip")]
#[command(version)]
#[command(about = "Extract single files from remote ZIP archives using Range requests", long_about = None)]
#[command(after_help = "Examples:\n  \
  partialzip -l https://example.com/archive.zip          list files in a remote ZIP\n  \
  partialzip https://example.com/archive.zip README.md   fetch one file\n  \
  partialzip -p foo.zip notes.txt | more                 send one file into more")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries to extract, matched exactly (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely with compressed sizes and ratios
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Give up on any single range request after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Give up on opening a remote archive after this many seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// User-Agent sent with HTTP requests
    #[arg(long, value_name = "AGENT")]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Log filter used when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_very_quiet() { "off" } else if self.is_quiet() { "error" } else { "warn" }
    }

    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::default();
        if let Some(secs) = self.timeout {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout {
            options = options.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(agent) = &self.user_agent {
            options = options.with_user_agent(agent.clone());
        }
        options
    }
}
