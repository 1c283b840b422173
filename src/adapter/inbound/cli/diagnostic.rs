//! Miette diagnostics for CLI error presentation.
//!
//! Library code returns [`crate::error::Error`]; the binary converts it
//! here into a report with source context and a help line.

use std::path::Path;

use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, ConnectionError, Error};

/// Configuration file error pointing at the offending TOML.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(pulsewire::config))]
pub struct ConfigDiagnostic {
    pub message: String,

    #[source_code]
    pub src: NamedSource<String>,

    #[label("here")]
    pub span: SourceSpan,

    #[help]
    pub help: Option<String>,
}

/// Error without source context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(pulsewire::error))]
pub struct PlainDiagnostic {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl PlainDiagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Convert a crate error into a renderable report.
///
/// `config_path` is re-read for TOML parse errors so the report can show
/// the failing line.
#[must_use]
pub fn report(err: Error, config_path: &Path) -> Report {
    if let Error::Config(ConfigError::Parse(parse)) = &err {
        if let (Some(span), Ok(content)) = (parse.span(), std::fs::read_to_string(config_path)) {
            return Report::new(ConfigDiagnostic {
                message: format!("invalid configuration: {}", parse.message()),
                src: NamedSource::new(config_path.display().to_string(), content),
                span: (span.start, span.end.saturating_sub(span.start)).into(),
                help: Some("see the [logging], [database], [connection], [stream] and [retention] sections".into()),
            });
        }
    }

    let help = help_for(&err);
    let mut diagnostic = PlainDiagnostic::new(err.to_string());
    if let Some(help) = help {
        diagnostic = diagnostic.with_help(help);
    }
    Report::new(diagnostic)
}

fn help_for(err: &Error) -> Option<String> {
    match err {
        Error::Config(ConfigError::InvalidValue { field, .. } | ConfigError::MissingField { field }) => {
            Some(format!("fix `{field}` in the configuration file or environment"))
        }
        Error::Config(ConfigError::ReadFile(_)) => {
            Some("pass --config with the path to pulsewire.toml".into())
        }
        Error::Connection(ConnectionError::ExhaustedRetries { .. }) => {
            Some("the feed stayed unreachable; check the address and run the command again".into())
        }
        Error::Connection(_) => Some("check the [connection] url and that the feed is reachable".into()),
        Error::Stream(_) => Some("run with -v to see the storage errors".into()),
        Error::Pool(_) | Error::Database(_) => {
            Some("check [database] url and that the file is writable".into())
        }
        Error::Aggregate { source, .. } | Error::Cleanup { source, .. } => help_for(source),
        _ => None,
    }
}
