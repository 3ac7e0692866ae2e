//! Unified error type for the ortholog-distance engine.
//!
//! Library code returns `Result<T, EngineError>`; the binary maps this to an
//! exit code and a message on stderr via `anyhow`'s `Context`. Only the
//! fatal error kinds from the error-handling design have a variant here —
//! restriction-empty, graph-inconsistency, and insufficient-ideal-components
//! are non-fatal and surface as logged warnings or `None` similarity values
//! instead, per their "engine continues" semantics.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not parse transcript id in sample {sample:?}: {reason} (header: {header:?})")]
    InputParse {
        sample: String,
        header: String,
        reason: String,
    },

    #[error("aligner failed for pair ({query_sample:?}, {subject_sample:?}): {message}")]
    Aligner {
        query_sample: String,
        subject_sample: String,
        message: String,
    },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize artifact at {path:?}: {message}")]
    Serialization { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EngineError::Serialization {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors for a single pair comparison, aggregated by the orchestrator
/// rather than aborting the whole run (§5, §7 propagation rules).
#[derive(Debug, Error)]
#[error("pair ({sample_a}, {sample_b}) failed: {source}")]
pub struct PairError {
    pub sample_a: String,
    pub sample_b: String,
    #[source]
    pub source: EngineError,
}
