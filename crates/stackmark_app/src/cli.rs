use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

/// Save rendered Substack posts as linked Markdown notes through a running
/// Chrome/Brave session with remote debugging enabled.
#[derive(Parser, Debug, Clone)]
#[command(name = "stackmark", version)]
pub struct Cli {
    /// Post addresses to fetch
    pub urls: Vec<String>,

    /// File with one address per line; blank lines and `#` comments are skipped
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// Re-file an exported Markdown file instead of fetching (needs --url)
    #[arg(long, value_name = "FILE", requires = "url")]
    pub from_md: Option<PathBuf>,

    /// Source address of the file given to --from-md
    #[arg(long, requires = "from_md")]
    pub url: Option<String>,

    /// Root of the notes tree
    #[arg(long, env = "STACKMARK_BASE_DIR", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// RON config file with `base_dir` and `publication_mappings`
    #[arg(long, env = "STACKMARK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep the captured HTML next to each note
    #[arg(long)]
    pub also_save_html: bool,

    /// Replace notes that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Debugging-protocol host
    #[arg(long, default_value = "127.0.0.1")]
    pub cdp_host: String,

    /// Debugging-protocol port
    #[arg(long, default_value_t = 9222)]
    pub cdp_port: u16,

    /// Per-page timeout in seconds
    #[arg(long, default_value_t = 45)]
    pub timeout: u64,

    /// Attempts per address
    #[arg(long, default_value_t = 2)]
    pub retries: usize,

    /// Pause between addresses in milliseconds
    #[arg(long, default_value_t = 150)]
    pub sleep_ms: u64,

    /// Print every post address of the first input's archive instead of saving
    #[arg(long)]
    pub export_archive: bool,

    /// More log output; repeat for debug and trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write the log to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    pub fn pause_between(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }
}
