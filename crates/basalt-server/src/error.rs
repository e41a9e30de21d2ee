//! Error types for the server client.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by `BasaltClient` methods.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach server at {}: {source}", path.display())]
    Unreachable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("server disconnected")]
    Disconnected,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {kind}: {message}")]
    Server {
        kind: ServerErrorKind,
        message: String,
    },
}

impl ClientError {
    /// Whether this is the server reporting an unknown table.
    pub fn is_table_not_found(&self) -> bool {
        matches!(
            self,
            ClientError::Server {
                kind: ServerErrorKind::TableNotFound,
                ..
            }
        )
    }

    /// Whether this is the server reporting a duplicate table.
    pub fn is_table_already_exists(&self) -> bool {
        matches!(
            self,
            ClientError::Server {
                kind: ServerErrorKind::TableAlreadyExists,
                ..
            }
        )
    }
}

/// Error kinds reported by the server, as they appear on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    TableNotFound,
    TableAlreadyExists,
    TableNotDisabled,
    TableNotEnabled,
    FamilyNotFound,
    FamilyAlreadyExists,
    InvalidName,
    NoFamilies,
    EmptyPut,
    EmptyRowKey,
    RowKeyTooLarge,
    InvalidFilter,
    ScannerNotFound,
    ParseError,
    InternalError,
    /// Any kind this client version does not know about.
    Other(String),
}

impl ServerErrorKind {
    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "TableNotFound" => Self::TableNotFound,
            "TableAlreadyExists" => Self::TableAlreadyExists,
            "TableNotDisabled" => Self::TableNotDisabled,
            "TableNotEnabled" => Self::TableNotEnabled,
            "FamilyNotFound" => Self::FamilyNotFound,
            "FamilyAlreadyExists" => Self::FamilyAlreadyExists,
            "InvalidName" => Self::InvalidName,
            "NoFamilies" => Self::NoFamilies,
            "EmptyPut" => Self::EmptyPut,
            "EmptyRowKey" => Self::EmptyRowKey,
            "RowKeyTooLarge" => Self::RowKeyTooLarge,
            "InvalidFilter" => Self::InvalidFilter,
            "ScannerNotFound" => Self::ScannerNotFound,
            "ParseError" => Self::ParseError,
            "InternalError" => Self::InternalError,
            other => Self::Other(other.to_string()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::TableNotFound => "TableNotFound",
            Self::TableAlreadyExists => "TableAlreadyExists",
            Self::TableNotDisabled => "TableNotDisabled",
            Self::TableNotEnabled => "TableNotEnabled",
            Self::FamilyNotFound => "FamilyNotFound",
            Self::FamilyAlreadyExists => "FamilyAlreadyExists",
            Self::InvalidName => "InvalidName",
            Self::NoFamilies => "NoFamilies",
            Self::EmptyPut => "EmptyPut",
            Self::EmptyRowKey => "EmptyRowKey",
            Self::RowKeyTooLarge => "RowKeyTooLarge",
            Self::InvalidFilter => "InvalidFilter",
            Self::ScannerNotFound => "ScannerNotFound",
            Self::ParseError => "ParseError",
            Self::InternalError => "InternalError",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
