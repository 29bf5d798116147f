//! Error taxonomy for the IR core and the adapter boundary
//!
//! Unresolved types are deliberately absent: failing to infer a type is the
//! engine's normal fallback path (`any`, confidence 0), never an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal for the file being parsed; raised by adapters, not by the core.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// A generator found an IR node with no target-language rendering and
    /// strict mode was requested. The lenient default emits a placeholder
    /// comment and continues instead.
    #[error("unsupported construct `{node_kind}` for target `{target}`")]
    UnsupportedConstruct {
        node_kind: &'static str,
        target: String,
    },

    /// Malformed IR tree or derived structure out of sync with the IR.
    /// Indicates an adapter bug; never swallowed.
    #[error("internal invariant violated: {detail}")]
    InvariantViolation { detail: String },

    /// Wire-encoded IR that does not decode back into a valid tree.
    #[error("cannot decode wire node `{node_kind}`: {detail}")]
    Decode { node_kind: String, detail: String },
}

impl Error {
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        Error::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn invariant(detail: impl Into<String>) -> Self {
        Error::InvariantViolation {
            detail: detail.into(),
        }
    }

    pub fn decode(node_kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Decode {
            node_kind: node_kind.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
