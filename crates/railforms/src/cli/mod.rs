//! Command-line interface for railforms.
//!
//! This module provides the CLI structure and output rendering for the
//! `railforms` binary.

mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    ConfigCommand, CreateCommand, DeleteCommand, GetCommand, KindsCommand, ListCommand,
    OutputFormat, StatusCommand, UpdateCommand,
};
pub use render::{render_kinds, render_record, render_records};

/// railforms - Railway maintenance form records
///
/// Stores, validates and retrieves inspection forms such as wheel
/// specifications and bogie checksheets.
#[derive(Debug, Parser)]
#[command(name = "railforms")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the database or bring its schema up to date
    Migrate,

    /// List the known form kinds and their fields
    Kinds(KindsCommand),

    /// Create a record from JSON
    Create(CreateCommand),

    /// List records of one kind
    List(ListCommand),

    /// Show one record
    Get(GetCommand),

    /// Apply a partial update from JSON
    Update(UpdateCommand),

    /// Delete a record
    Delete(DeleteCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
