//! Command line argument parsing for the docseek CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::query::parser::DefaultOperator;

/// docseek - search documentation passages
#[derive(Parser, Debug, Clone)]
#[command(name = "docseek")]
#[command(about = "Index documentation pages and search their passages")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct DocseekArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", env = "DOCSEEK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Index directory, overriding the configuration
    #[arg(short, long, value_name = "INDEX_PATH", env = "DOCSEEK_INDEX")]
    pub index: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl DocseekArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch pages and index their passages
    Ingest(IngestArgs),

    /// Search indexed passages
    Search(SearchArgs),

    /// Answer a question the way the query service does
    Ask(AskArgs),

    /// Show index statistics
    Stats,

    /// Check index integrity
    Verify,

    /// Clear the index and ingest pages from scratch
    Rebuild(RebuildArgs),
}

/// Where pages come from and how they are read.
#[derive(Parser, Debug, Clone)]
pub struct SourceArgs {
    /// Page format
    #[arg(long = "page-format", default_value = "auto")]
    pub page_format: PageFormat,

    /// Directory relative page paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub base: Option<PathBuf>,
}

/// Arguments for ingesting pages
#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    /// Page locators (paths or file:// URLs)
    #[arg(value_name = "LOCATOR", required = true)]
    pub locators: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Maximum number of results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Operator between words written next to each other
    #[arg(long)]
    pub operator: Option<OperatorArg>,

    /// Abort the search after this many milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Print the parsed query tree
    #[arg(long)]
    pub explain: bool,
}

/// Arguments for the ask command
#[derive(Parser, Debug, Clone)]
pub struct AskArgs {
    /// Natural-language question
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Re-ingest the routed documentation even if it is indexed
    #[arg(long)]
    pub refresh: bool,

    /// Maximum number of results to return
    #[arg(short, long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for rebuilding an index
#[derive(Parser, Debug, Clone)]
pub struct RebuildArgs {
    /// Page locators (paths or file:// URLs)
    #[arg(value_name = "LOCATOR", required = true)]
    pub locators: Vec<String>,

    /// Delete the persisted snapshot before opening, for indexes that no
    /// longer open
    #[arg(long)]
    pub discard: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Page formats understood by the extractors
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    /// HTML for content starting with '<', Markdown otherwise
    Auto,
    /// HTML
    Html,
    /// Markdown
    Markdown,
}

/// Query operators selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorArg {
    And,
    Or,
}

impl From<OperatorArg> for DefaultOperator {
    fn from(operator: OperatorArg) -> Self {
        match operator {
            OperatorArg::And => DefaultOperator::And,
            OperatorArg::Or => DefaultOperator::Or,
        }
    }
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
