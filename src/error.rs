use thiserror::Error;

use crate::filter::FilterError;
use crate::model::CollectionKind;
use crate::store::StoreError;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("{kind} '{code}' not found")]
    NotFound { kind: CollectionKind, code: String },

    #[error("{kind} '{code}' already exists")]
    Duplicate { kind: CollectionKind, code: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("a {found} record cannot be stored in {expected}")]
    WrongCollection { expected: CollectionKind, found: CollectionKind },

    #[error("record code '{body}' does not match '{path}'")]
    CodeMismatch { path: String, body: String },

    #[error("poisoned lock")]
    Poisoned,

    #[error("snapshot encoding: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeskError {
    pub fn from_store(kind: CollectionKind, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(code) => DeskError::NotFound { kind, code },
            StoreError::Duplicate(code) => DeskError::Duplicate { kind, code },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DeskError::NotFound { .. })
    }
}

pub type DeskResult<T> = Result<T, DeskError>;
