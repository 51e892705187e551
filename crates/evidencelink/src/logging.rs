//! Logging setup for the `evlink` binary.
//!
//! Logs go to stderr so that rendered output on stdout stays pipeable.
//! `RUST_LOG` replaces the directives built from the verbosity flags.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the CLI logs, from `-q` / `-v` / `-vv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything, including the HTTP client's own logs.
    Trace,
}

impl Verbosity {
    /// The level applied to this crate's own targets.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    ///
    /// The HTTP stack stays at `warn` below `Trace`, since its debug output
    /// drowns the analysis logs.
    #[must_use]
    pub fn directives(&self) -> String {
        let own = format!("evidencelink={}", self.to_level_filter());
        match self {
            Self::Trace => format!("{own},reqwest=trace,hyper=debug"),
            _ => format!("{own},reqwest=warn,hyper=warn"),
        }
    }
}

/// Install the stderr subscriber. Later calls are ignored.
pub fn init_logging(verbosity: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity != Verbosity::Normal),
    );

    let _ = subscriber.try_init();
}
