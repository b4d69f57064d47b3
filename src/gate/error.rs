//! Gate and admin command errors.

use crate::store::StoreError;
use crate::whitelist::{CacheError, IdentityKey, IdentityKeyError};

pub type GateResult<T> = Result<T, GateError>;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("missing argument: <{0}>")]
    MissingArgument(&'static str),

    #[error("invalid argument <{name}>: {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: IdentityKeyError,
    },

    #[error("{0} is already whitelisted")]
    AlreadyWhitelisted(IdentityKey),

    #[error("{0} is not whitelisted")]
    NotWhitelisted(IdentityKey),

    #[error("whitelist store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The store write went through but the cache refused the follow-up
    /// write. The store stays authoritative; a restart reconciles.
    #[error("membership cache out of sync: {0}")]
    CacheInconsistent(#[from] CacheError),

    #[error("only administrators may use this command")]
    Unauthorized,

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl GateError {
    /// Map a key validation failure for argument `name`.
    pub fn from_key_error(name: &'static str, err: IdentityKeyError) -> Self {
        match err {
            IdentityKeyError::Empty => GateError::MissingArgument(name),
            reason => GateError::InvalidArgument { name, reason },
        }
    }
}
