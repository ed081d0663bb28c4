//! Command-line interface definition using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Code review authorization and workflow over a local tracker
#[derive(Parser, Debug)]
#[command(name = "codereview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "CODEREVIEW_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// User to act as
    #[arg(short, long, env = "CODEREVIEW_USER", global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// The review subject.
#[derive(Args, Debug, Clone)]
pub struct Subject {
    /// Project the item belongs to
    pub project: String,

    /// Work item ID
    pub item: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show review state and permissions of an item
    Status {
        #[command(flatten)]
        subject: Subject,

        /// Also check whether this user is or was a permitted reviewer
        #[arg(long)]
        reviewer: Option<String>,

        /// Also check whether this repository path may be fast-tracked
        #[arg(long)]
        path: Option<String>,
    },

    /// List the revisions to review
    Revisions {
        #[command(flatten)]
        subject: Subject,

        /// List every linked revision, ignoring review progress
        #[arg(long)]
        compare_all: bool,

        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print a link to the review page
    Link {
        #[command(flatten)]
        subject: Subject,

        /// Compare pending revisions as one diff
        #[arg(long)]
        aggregated: bool,

        /// Compare all linked revisions
        #[arg(long)]
        compare_all: bool,

        /// Request the successful-review workflow action
        #[arg(long)]
        successful: bool,

        /// Extra parameter as name=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// Record a completed review
    Complete {
        #[command(flatten)]
        subject: Subject,

        /// Revisions reviewed (default: all pending)
        #[arg(long, value_delimiter = ',')]
        revisions: Vec<String>,

        /// Reviewer to record (default: the acting user)
        #[arg(long)]
        reviewer: Option<String>,

        /// Take the successful-review workflow transition
        #[arg(long)]
        successful: bool,
    },

    /// Show status changes of an item
    History {
        #[command(flatten)]
        subject: Subject,

        /// Only the last change away from this status
        #[arg(long)]
        from: Option<String>,

        /// Only changes on this date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "from")]
        on: Option<NaiveDate>,

        /// Only changes before this date (YYYY-MM-DD)
        #[arg(long, conflicts_with_all = ["from", "on"])]
        before: Option<NaiveDate>,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Brief,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".codereview"))
                .unwrap_or_else(|| PathBuf::from(".codereview"))
        })
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
