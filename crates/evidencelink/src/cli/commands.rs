//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Link command arguments.
#[derive(Debug, Args)]
pub struct LinkCommand {
    /// Objective identifier (e.g. IA.L2-3.5.1)
    pub objective: String,

    /// The evidence quote
    pub text: String,

    /// Who said it
    #[arg(short, long)]
    pub speaker: Option<String>,

    /// The speaker's role
    #[arg(short, long)]
    pub role: Option<String>,

    /// Identifier of the source transcript or meeting
    #[arg(long)]
    pub source_id: Option<String>,

    /// Title of the source transcript or meeting
    #[arg(long)]
    pub source_title: Option<String>,

    /// Date of the source transcript or meeting
    #[arg(long)]
    pub source_date: Option<String>,

    /// Initial note
    #[arg(short, long)]
    pub note: Option<String>,
}

/// Unlink command arguments.
#[derive(Debug, Args)]
pub struct UnlinkCommand {
    /// Objective identifier
    pub objective: String,

    /// Quote identifier
    pub quote_id: String,
}

/// Note command arguments.
#[derive(Debug, Args)]
pub struct NoteCommand {
    /// Objective identifier
    pub objective: String,

    /// Quote identifier
    pub quote_id: String,

    /// The new note (replaces the old one; pass "" to clear)
    pub note: String,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Only show this objective
    pub objective: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Transcript commands.
#[derive(Debug, Subcommand)]
pub enum TranscriptCommand {
    /// Store a transcript from a text file
    Add {
        /// Path to the transcript text ("-" for stdin)
        file: PathBuf,

        /// Meeting title
        #[arg(short, long)]
        title: Option<String>,

        /// Meeting date
        #[arg(short, long)]
        date: Option<String>,

        /// Primary speaker
        #[arg(short, long)]
        speaker: Option<String>,

        /// Short summary
        #[arg(long)]
        summary: Option<String>,
    },

    /// List stored transcripts
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Print a stored transcript
    Show {
        /// Transcript identifier
        id: String,
    },

    /// Delete a stored transcript
    Delete {
        /// Transcript identifier
        id: String,
    },
}

/// Analyze command arguments.
#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Path to a transcript text file
    #[arg(required_unless_present = "transcript_id", conflicts_with = "transcript_id")]
    pub file: Option<PathBuf>,

    /// Analyze a stored transcript instead of a file
    #[arg(short = 'i', long)]
    pub transcript_id: Option<String>,

    /// Area to focus on (e.g. "Access Control")
    #[arg(long)]
    pub focus: Option<String>,

    /// Objective catalog JSON (overrides configuration)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Link the selected candidates: "all" or numbers like 1,3,5
    #[arg(long, value_name = "SELECTION")]
    pub confirm: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
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
