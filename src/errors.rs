//! Error types shared by every layer of the store
//!
//! Every fallible operation returns [`Result`]. Lower-layer errors are propagated
//! unchanged: the object model never replaces a database error with a more generic
//! one, and the repository never replaces either.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across variants that carry
/// different payloads (e.g. a missing object and a missing reference are both
/// [`ErrorKind::NotFound`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    TypeMismatch,
    ParseError,
    Corrupt,
    InvalidIdentifier,
    InvalidReferenceName,
    Ambiguous,
    ResolutionLoop,
    AlreadyExists,
    NotARepository,
    InvalidLayout,
    StorageError,
    UseAfterClose,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("no object matches the prefix '{0}'")]
    PrefixNotFound(String),

    #[error("reference '{0}' not found")]
    ReferenceNotFound(String),

    #[error("object {id} is a {actual}, expected a {expected}")]
    TypeMismatch {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("malformed {subject}: {reason}")]
    Parse { subject: String, reason: String },

    #[error("object {id} is corrupt: {reason}")]
    Corrupt { id: ObjectId, reason: String },

    #[error("invalid object identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("invalid reference name '{0}'")]
    InvalidReferenceName(String),

    #[error("prefix '{prefix}' is ambiguous ({} candidates)", .candidates.len())]
    Ambiguous {
        prefix: String,
        candidates: Vec<ObjectId>,
    },

    #[error("resolving '{start}' exceeded the limit of {limit} levels")]
    ResolutionLoop { start: String, limit: usize },

    #[error("a repository already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("could not find a repository at {}", .0.display())]
    NotARepository(PathBuf),

    #[error("invalid repository layout at {}: {reason}", .path.display())]
    InvalidLayout { path: PathBuf, reason: String },

    #[error("{context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("repository handle used after close")]
    UseAfterClose,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ObjectNotFound(_) | Error::PrefixNotFound(_) | Error::ReferenceNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Parse { .. } => ErrorKind::ParseError,
            Error::Corrupt { .. } => ErrorKind::Corrupt,
            Error::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            Error::InvalidReferenceName(_) => ErrorKind::InvalidReferenceName,
            Error::Ambiguous { .. } => ErrorKind::Ambiguous,
            Error::ResolutionLoop { .. } => ErrorKind::ResolutionLoop,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotARepository(_) => ErrorKind::NotARepository,
            Error::InvalidLayout { .. } => ErrorKind::InvalidLayout,
            Error::Storage { .. } => ErrorKind::StorageError,
            Error::UseAfterClose => ErrorKind::UseAfterClose,
        }
    }

    pub(crate) fn parse(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(id: ObjectId, reason: impl Into<String>) -> Self {
        Error::Corrupt {
            id,
            reason: reason.into(),
        }
    }
}

/// Attach a human-readable context to a failed filesystem operation.
pub(crate) trait StorageContext<T> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> StorageContext<T> for std::io::Result<T> {
    fn with_context<C, F>(self, context: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|source| Error::Storage {
            context: context().into(),
            source,
        })
    }
}
