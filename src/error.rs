//! Error types for job-broker.
//!
//! Display strings double as the client-facing message for the HTTP layer,
//! so keep them short and free of internal detail.

use thiserror::Error;

use crate::model::Stage;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field was missing or empty. `field` uses the wire name.
    #[error("{field} not available")]
    Validation { field: &'static str },

    /// The request body could not be read as a JSON object or form.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request already in queue")]
    Duplicate { id: String },

    /// The id is not tracked by any collection.
    #[error("No request found with id: {id}")]
    NotFound { id: String },

    /// A report arrived for an id that is not in progress.
    #[error("No request found for queuing with this id:{id}")]
    NotInProgress { id: String },

    #[error("Sit back and relax, no requests for now")]
    EmptyQueue,

    #[error("Request is being processed, Please check back later")]
    StillProcessing { id: String },

    #[error("Request is still waiting for its turn")]
    StillQueued { id: String },

    #[error("invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Informational outcomes that only ask the caller to poll again.
    pub fn is_retry_later(&self) -> bool {
        matches!(self, Error::StillProcessing { .. } | Error::StillQueued { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
