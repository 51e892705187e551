//! `evlink` - CLI for evidencelink
//!
//! This binary links evidence quotes to control objectives, manages stored
//! transcripts, and runs transcript analysis from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, warn};

use evidencelink::cli::{
    AnalyzeCommand, Cli, Command, ConfigCommand, OutputFormat, TranscriptCommand,
};
use evidencelink::present::{self, Action, ActionOutcome, Selection};
use evidencelink::{
    init_logging, Config, HttpAnalyzer, MappingRequest, ObjectiveCatalog, QuoteInput,
    QuoteLinker, QuoteStore, SqliteStore, TranscriptInput, TranscriptMapper, TranscriptRecord,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // Config commands must work when the config file itself is broken
    if let Command::Config(config_cmd) = cli.command {
        return handle_config(cli.config, config_cmd);
    }

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Stats(stats_cmd) => {
            let store = open_store(&config)?;
            print!(
                "{}",
                present::render_stats(&store.stats(), &store.storage_stats()?, stats_cmd.json)?
            );
            Ok(())
        }
        command => {
            let mut store = open_store(&config)?;
            let mut linker = QuoteLinker::new(&mut store, config.user_name());
            handle_evidence(&config, &mut linker, command).await
        }
    }
}

fn open_store(config: &Config) -> anyhow::Result<QuoteStore> {
    let database_path = config.database_path();
    debug!(path = %database_path.display(), "Opening evidence store");
    let backend = SqliteStore::open(&database_path)?;
    Ok(QuoteStore::open(Box::new(backend)))
}

async fn handle_evidence(
    config: &Config,
    linker: &mut QuoteLinker<'_>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Link(cmd) => {
            let mut input = QuoteInput::new(cmd.text);
            input.speaker = cmd.speaker;
            input.speaker_role = cmd.role;
            input.source_id = cmd.source_id;
            input.source_title = cmd.source_title;
            input.source_date = cmd.source_date;
            input.note = cmd.note;

            let outcome = present::apply(
                linker,
                Action::Link {
                    objective_id: cmd.objective,
                    input,
                },
            )?;
            report_outcome(&outcome);
        }
        Command::Unlink(cmd) => {
            let outcome = present::apply(
                linker,
                Action::Unlink {
                    objective_id: cmd.objective,
                    quote_id: cmd.quote_id,
                },
            )?;
            report_outcome(&outcome);
        }
        Command::Note(cmd) => {
            let outcome = present::apply(
                linker,
                Action::EditNote {
                    objective_id: cmd.objective,
                    quote_id: cmd.quote_id,
                    note: cmd.note,
                },
            )?;
            report_outcome(&outcome);
        }
        Command::Show(cmd) => {
            let rendered = match &cmd.objective {
                Some(objective_id) => present::render_quotes(
                    objective_id,
                    linker.get_quotes(objective_id),
                    cmd.format,
                )?,
                None => present::render_index(linker.index(), cmd.format)?,
            };
            print!("{rendered}");
        }
        Command::Transcript(cmd) => handle_transcript(linker, cmd)?,
        Command::Analyze(cmd) => handle_analyze(config, linker, cmd).await?,
        other => bail!("unexpected command: {other:?}"),
    }

    Ok(())
}

fn report_outcome(outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Linked(quote) => println!("Linked {}", quote.quote_id),
        ActionOutcome::NoteUpdated => println!("Note updated."),
        ActionOutcome::Unlinked => println!("Quote removed."),
        ActionOutcome::NotFound => println!("No such objective or quote; nothing changed."),
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn handle_transcript(linker: &mut QuoteLinker<'_>, cmd: TranscriptCommand) -> anyhow::Result<()> {
    match cmd {
        TranscriptCommand::Add {
            file,
            title,
            date,
            speaker,
            summary,
        } => {
            let input = TranscriptInput {
                title,
                date,
                speaker,
                summary,
                raw_text: read_text(&file)?,
            };
            match linker.add_transcript(input)? {
                Some(record) => println!("Stored transcript {}", record.id),
                None => println!("Transcript already stored; nothing changed."),
            }
        }
        TranscriptCommand::List { format } => {
            print!(
                "{}",
                present::render_transcripts(linker.transcripts(), format)?
            );
        }
        TranscriptCommand::Show { id } => {
            let Some(record) = linker.transcript(&id) else {
                bail!("no transcript with id {id}");
            };
            println!("{} ({})", record.title, record.date);
            println!();
            println!("{}", record.raw_text);
        }
        TranscriptCommand::Delete { id } => {
            if linker.delete_transcript(&id)? {
                println!("Transcript deleted.");
            } else {
                println!("No transcript with id {id}; nothing changed.");
            }
        }
    }
    Ok(())
}

async fn handle_analyze(
    config: &Config,
    linker: &mut QuoteLinker<'_>,
    cmd: AnalyzeCommand,
) -> anyhow::Result<()> {
    let selection = cmd
        .confirm
        .as_deref()
        .map(str::parse::<Selection>)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    // A file is only stored once the analysis succeeded.
    let (text, stored) = match (&cmd.file, &cmd.transcript_id) {
        (_, Some(id)) => match linker.transcript(id) {
            Some(record) => (record.raw_text.clone(), Some(record.clone())),
            None => bail!("no transcript with id {id}"),
        },
        (Some(file), None) => (read_text(file)?, None),
        (None, None) => bail!("a transcript file or --transcript-id is required"),
    };

    let catalog = match cmd.catalog.as_ref().or(config.catalog.path.as_ref()) {
        Some(path) => Some(ObjectiveCatalog::load(path)?),
        None => None,
    };

    let analyzer = HttpAnalyzer::from_config(&config.analysis)?;
    let mapper = TranscriptMapper::new(analyzer, config.analysis.min_transcript_chars);

    let mut request = MappingRequest::new(&text);
    if let Some(focus) = cmd.focus.as_deref() {
        request = request.focus_area(focus);
    }
    if let Some(catalog) = &catalog {
        request = request.catalog(catalog);
    }

    let report = mapper.map(&request).await?;
    print!("{}", present::render_candidates(&report, cmd.format)?);

    let source = match stored {
        Some(record) => record,
        None => store_transcript(linker, text)?,
    };

    let Some(selection) = selection else {
        return Ok(());
    };
    if report.unparseable.is_some() {
        warn!("Analysis response could not be read; nothing to confirm");
        return Ok(());
    }

    for candidate in selection.pick(&report) {
        let outcome = present::apply(
            linker,
            Action::ConfirmCandidate {
                candidate: candidate.clone(),
                source: Some(source.clone()),
            },
        )?;
        if cmd.format != OutputFormat::Json {
            report_outcome(&outcome);
        }
    }
    Ok(())
}

/// Store analyzed text, or find the identical transcript already stored.
fn store_transcript(linker: &mut QuoteLinker<'_>, raw_text: String) -> anyhow::Result<TranscriptRecord> {
    let fingerprint = TranscriptRecord::compute_fingerprint(&raw_text);
    let input = TranscriptInput {
        raw_text,
        ..TranscriptInput::default()
    };
    if let Some(record) = linker.add_transcript(input)? {
        debug!(id = %record.id, "Stored analyzed transcript");
        return Ok(record);
    }
    linker
        .transcripts()
        .iter()
        .find(|t| t.matches_fingerprint(&fingerprint))
        .cloned()
        .context("stored transcript not found")
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[User]");
                println!("  Name:               {}", config.user_name());
                println!();
                println!("[Analysis]");
                println!("  Endpoint:           {}", config.analysis.endpoint);
                println!("  Model:              {}", config.analysis.model);
                println!("  API key variable:   {}", config.analysis.api_key_env);
                println!("  Timeout (secs):     {}", config.analysis.timeout_secs);
                println!(
                    "  Min transcript:     {} chars",
                    config.analysis.min_transcript_chars
                );
                println!();
                println!("[Catalog]");
                match &config.catalog.path {
                    Some(path) => println!("  Path:               {}", path.display()),
                    None => println!("  Path:               (none)"),
                }
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
