//! Command-line interface for evidencelink.
//!
//! This module provides the CLI structure for the `evlink` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AnalyzeCommand, ConfigCommand, LinkCommand, NoteCommand, OutputFormat, ShowCommand,
    StatsCommand, TranscriptCommand, UnlinkCommand,
};

/// evlink - Link interview evidence to compliance control objectives
///
/// Keeps a per-objective list of evidence quotes, stores interview
/// transcripts, and asks an analysis service to propose quotes from them.
#[derive(Debug, Parser)]
#[command(name = "evlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
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
    /// Link an evidence quote to an objective
    Link(LinkCommand),

    /// Remove a quote from an objective
    Unlink(UnlinkCommand),

    /// Replace the note on a quote
    Note(NoteCommand),

    /// Show linked evidence
    Show(ShowCommand),

    /// Show evidence counts
    Stats(StatsCommand),

    /// Manage stored transcripts
    #[command(subcommand)]
    Transcript(TranscriptCommand),

    /// Propose evidence quotes from a transcript
    Analyze(AnalyzeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
