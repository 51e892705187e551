//! `evidencelink` - Links interview evidence quotes to compliance control objectives
//!
//! This library keeps a per-objective index of evidence quotes and the
//! transcripts they came from, persists both as whole documents in a local
//! key-value store, and asks an external analysis service to propose
//! candidate quotes from a transcript for a person to confirm.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod linker;
pub mod logging;
pub mod mapping;
pub mod present;
pub mod quote;
pub mod storage;
pub mod store;
pub mod transcript;

pub use catalog::ObjectiveCatalog;
pub use config::Config;
pub use error::{Error, Result};
pub use linker::QuoteLinker;
pub use logging::init_logging;
pub use mapping::{HttpAnalyzer, MappingReport, MappingRequest, TranscriptMapper};
pub use quote::{EvidenceQuote, QuoteInput};
pub use storage::{DocumentStore, MemoryStore, SqliteStore, StorageStats};
pub use store::{QuoteStore, StoreStats};
pub use transcript::{TranscriptInput, TranscriptRecord};
