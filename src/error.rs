//! Crate-level error type and the failure taxonomy

use crate::engine::EngineError;
use crate::query::TranslateError;
use crate::schema::SchemaError;
use crate::value::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Failure categories reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Invalid path, or the engine cannot be opened or is gone
    Connection,
    /// Table or schema definition rejected
    Ddl,
    /// Insert, update or delete rejected
    Write,
    /// Malformed query or undecodable result
    Read,
    /// Native value without a generic counterpart
    UnsupportedType,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Connection => "connection",
            FailureKind::Ddl => "ddl",
            FailureKind::Write => "write",
            FailureKind::Read => "read",
            FailureKind::UnsupportedType => "unsupported type",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum NoteGraphError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No note graph is selected")]
    NoActiveGraph,

    #[error("Unknown note graph: {0}")]
    UnknownGraph(Uuid),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Read failed: {0}")]
    Read(String),
}

impl NoteGraphError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NoteGraphError::Codec(CodecError::Unsupported(_)) => FailureKind::UnsupportedType,
            NoteGraphError::Codec(CodecError::Coercion { .. }) => FailureKind::Write,
            NoteGraphError::Schema(_) => FailureKind::Ddl,
            NoteGraphError::Engine(e) => e.kind(),
            NoteGraphError::Translate(TranslateError::Codec(CodecError::Unsupported(_))) => {
                FailureKind::UnsupportedType
            }
            NoteGraphError::Translate(TranslateError::InvalidIdentifier(_)) => FailureKind::Ddl,
            NoteGraphError::Translate(_) => FailureKind::Write,
            NoteGraphError::Io(_) | NoteGraphError::NoActiveGraph | NoteGraphError::UnknownGraph(_) => {
                FailureKind::Connection
            }
            NoteGraphError::Write(_) => FailureKind::Write,
            NoteGraphError::Read(_) => FailureKind::Read,
        }
    }
}

pub type NoteGraphResult<T> = Result<T, NoteGraphError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyType;

    #[test]
    fn test_failure_kinds() {
        let unsupported = NoteGraphError::from(CodecError::Unsupported("UNION".into()));
        assert_eq!(unsupported.kind(), FailureKind::UnsupportedType);

        let coercion = NoteGraphError::from(CodecError::Coercion {
            expected: PropertyType::Number,
            found: "STRING".into(),
        });
        assert_eq!(coercion.kind(), FailureKind::Write);

        let schema = NoteGraphError::from(SchemaError::DuplicateTypeName("Person".into()));
        assert_eq!(schema.kind(), FailureKind::Ddl);

        let engine = NoteGraphError::from(EngineError::Constraint("duplicate".into()));
        assert_eq!(engine.kind(), FailureKind::Write);

        assert_eq!(NoteGraphError::NoActiveGraph.kind(), FailureKind::Connection);
    }
}
