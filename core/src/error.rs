use std::path::PathBuf;
use thiserror::Error;

/// Failure modes surfaced by the retrieval core.
///
/// Term lookups that miss the vocabulary are not errors; they are recovered
/// through spelling correction or produce an empty result.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed Boolean query: unbalanced parentheses, missing operands,
    /// or an operator the grammar does not know.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The requested (corpus, configuration) pair was never built or loaded.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The corpus could not be read or parsed at build time.
    #[error("corpus error at {path}: {reason}")]
    CorpusIo { path: PathBuf, reason: String },

    /// A persisted index is unreadable, corrupt, or from another schema.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Relevance feedback merged across two different original queries.
    #[error("relevance feedback mismatch: {0}")]
    FeedbackMismatch(String),

    /// A configuration-space build task panicked.
    #[error("build task failed: {0}")]
    BuildTask(String),

    #[error("unknown document: {0}")]
    UnknownDocument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corpus_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::CorpusIo { path: path.into(), reason: reason.to_string() }
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
