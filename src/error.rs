use std::fmt;
use thiserror::Error;

/// Which side of the rating matrix an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => f.write_str("user"),
            EntityKind::Item => f.write_str("item"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CfError {
    #[error("unknown {kind} `{id}`")]
    UnknownEntity { kind: EntityKind, id: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("index {index} out of range for {len} identifiers")]
    OutOfRange { index: usize, len: usize },

    #[error("latent vector of {kind} `{id}` is not finite")]
    NonFinite { kind: EntityKind, id: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CfError {
    pub(crate) fn unknown_user(id: &str) -> Self {
        CfError::UnknownEntity {
            kind: EntityKind::User,
            id: id.to_string(),
        }
    }

    pub(crate) fn unknown_item(id: &str) -> Self {
        CfError::UnknownEntity {
            kind: EntityKind::Item,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CfError>;
