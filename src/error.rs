//! Construction-time errors.
//!
//! Every other operation in this crate reports a miss through `Option` or
//! `bool`; only building a map from bad parameters fails.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

impl MapError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MapError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, MapError>;
