//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Page, RecordFilter};

/// Kinds command arguments.
#[derive(Debug, Args)]
pub struct KindsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Form kind, e.g. `bogie-checksheet`
    pub kind: String,

    /// Read the JSON record from this file instead of stdin
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Form kind, e.g. `bogie-checksheet`
    pub kind: String,

    /// Only records with this form number
    #[arg(long)]
    pub form_number: Option<String>,

    /// Only records submitted by this person
    #[arg(long)]
    pub submitted_by: Option<String>,

    /// Only records submitted on this date (YYYY-MM-DD)
    #[arg(long)]
    pub submitted_date: Option<NaiveDate>,

    /// Number of matching records to skip
    #[arg(long, default_value = "0")]
    pub skip: u64,

    /// Maximum number of results (capped at 100)
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// The filter described by the flags.
    #[must_use]
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            form_number: self.form_number.clone(),
            submitted_by: self.submitted_by.clone(),
            submitted_date: self.submitted_date,
        }
    }

    /// The page window described by the flags.
    #[must_use]
    pub fn page(&self) -> Page {
        Page {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

/// Get command arguments.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Form kind
    pub kind: String,

    /// Record id
    pub id: i64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Form kind
    pub kind: String,

    /// Record id
    pub id: i64,

    /// Read the JSON update from this file instead of stdin
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Form kind
    pub kind: String,

    /// Record id
    pub id: i64,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
