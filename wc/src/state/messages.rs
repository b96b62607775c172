//! State manager messages
//!
//! Commands and responses for the actor pattern.

use docstore::{Document, Filter, StoreError, Update};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Channel error")]
    ChannelError,
}

impl From<StoreError> for StateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => Self::DeserializationError(e.to_string()),
            other => Self::StoreError(other.to_string()),
        }
    }
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor, one per store operation
#[derive(Debug)]
pub enum StateCommand {
    Insert {
        collection: String,
        doc: Document,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    InsertMany {
        collection: String,
        docs: Vec<Document>,
        reply: oneshot::Sender<StateResponse<Vec<String>>>,
    },
    Find {
        collection: String,
        filters: Vec<Filter>,
        reply: oneshot::Sender<StateResponse<Vec<Document>>>,
    },
    FindOneAndUpdate {
        collection: String,
        filters: Vec<Filter>,
        update: Update,
        reply: oneshot::Sender<StateResponse<Option<Document>>>,
    },
    UpdateOne {
        collection: String,
        filters: Vec<Filter>,
        update: Update,
        reply: oneshot::Sender<StateResponse<bool>>,
    },
    DeleteMany {
        collection: String,
        filters: Vec<Filter>,
        reply: oneshot::Sender<StateResponse<usize>>,
    },

    // Shutdown
    Shutdown,
}
