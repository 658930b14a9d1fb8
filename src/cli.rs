use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use url::Url;

/// Browser-like User-Agent; some news sites reject non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/56.0.2924.76 Safari/537.36";

/// When to draw the fetch/extract/archive spinner on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Only if stderr is a terminal.
    Auto,
    Always,
    /// Keep stderr for log lines only.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// URL of the page to create a reference from.
    #[arg(short, long)]
    pub url: Url,

    /// Write a result page (reference, copy button, theme toggle) to this HTML file.
    #[arg(long)]
    pub html: Option<PathBuf>,

    /// Copy the generated reference to the system clipboard.
    #[arg(long)]
    pub copy: bool,

    /// Skip the Wayback Machine lookup; archive fields stay empty.
    #[arg(long)]
    pub no_archive: bool,

    /// Wayback Machine base URL (CDX search and memento links are resolved against it).
    #[arg(long, default_value = "https://web.archive.org/")]
    pub archive_endpoint: Url,

    /// Locale used to format dates (e.g. `en_US`). Defaults to the page's `og:locale`, then `en_US`.
    #[arg(long)]
    pub locale: Option<String>,

    /// JSON file mapping page roles to element ids for the result page.
    #[arg(long)]
    pub page_config: Option<PathBuf>,

    /// HTTP User-Agent used for fetching the page.
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Spinner while the page and archive are queried.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
