//! Error type shared by every stage of a split run.

use quick_xml::events::attributes::AttrError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running a split.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] AttrError),

    #[error("Parse error at {context}: {message}")]
    Parse { context: String, message: String },

    #[error("Invalid config at line {line}: {message}")]
    Config { line: usize, message: String },

    #[error("No extracts configured")]
    NoExtracts,

    #[error("Invalid polygon file {}: {message}", path.display())]
    Polygon { path: PathBuf, message: String },

    #[error("Input not ordered: {0}")]
    Order(String),

    #[error("Input cannot be read twice: {0}")]
    NotRewindable(String),

    #[error("Unexpected stream signal: {0}")]
    State(String),
}

impl SplitError {
    pub(crate) fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        SplitError::Parse {
            context: context.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
