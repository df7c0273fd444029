use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "mysched")]
#[command(about = "Bookmark and reserve conference sessions from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Account whose schedule is used
    #[arg(long, global = true, value_name = "NAME")]
    pub account: Option<String>,

    /// How equal timestamps are resolved
    #[arg(long, global = true, value_enum, value_name = "POLICY")]
    pub tie_break: Option<TieBreakArg>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a session to my schedule
    #[command(alias = "star")]
    Bookmark {
        /// Session ID
        session_id: String,
    },
    /// Remove a session from my schedule
    #[command(alias = "unstar")]
    Unbookmark {
        /// Session ID
        session_id: String,
    },
    /// Reserve a seat in a session
    Reserve {
        /// Session ID
        session_id: String,
    },
    /// Join the waitlist of a full session
    Waitlist {
        /// Session ID
        session_id: String,
    },
    /// Cancel a reservation or waitlist entry
    Unreserve {
        /// Session ID
        session_id: String,
    },
    /// Record that feedback was submitted for a session
    Feedback {
        /// Session ID
        session_id: String,
    },
    /// Show everything recorded for one session
    Show {
        /// Session ID
        session_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List my schedule
    List {
        /// Include removed bookmarks and cancelled reservations
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync with the remote user data store
    Sync {
        /// Remote file path or http(s) URL (overrides configuration)
        #[arg(long, value_name = "PATH|URL")]
        remote: Option<String>,
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Export user data
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import a JSON export; newer records win
    Import {
        /// Path to a JSON export
        path: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for mysched_core::export::ExportFormat {
    fn from(value: ExportFormat) -> Self {
        match value {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum TieBreakArg {
    PreferActive,
    KeepExisting,
    PreferIncoming,
}

impl From<TieBreakArg> for mysched_core::TieBreak {
    fn from(value: TieBreakArg) -> Self {
        match value {
            TieBreakArg::PreferActive => Self::PreferActive,
            TieBreakArg::KeepExisting => Self::KeepExisting,
            TieBreakArg::PreferIncoming => Self::PreferIncoming,
        }
    }
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently dropped conflicting writes
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Remote file path or http(s) URL
        #[arg(long, value_name = "PATH|URL")]
        remote: Option<String>,
        /// Bearer token for an http(s) remote
        #[arg(long, value_name = "TOKEN")]
        remote_token: Option<String>,
    },
    /// Print the resolved configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
