//! Error taxonomy shared by every operation

use crate::subscription::SubscriptionId;
use thiserror::Error;

pub const EIO: i64 = 5;
pub const ENOENT: i64 = 2;
pub const ENOMEM: i64 = 12;
pub const EACCES: i64 = 13;
pub const EINVAL: i64 = 22;
pub const EIDRM: i64 = 43;

/// Errors returned by registry, store and control-plane operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or unreadable caller-supplied data
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Allocation or capacity failure; no state was changed
    #[error("out of memory")]
    OutOfMemory,
    /// The subscription id is not live
    #[error("subscription {0} not found")]
    NotFound(SubscriptionId),
    /// Caller lacks the privilege for the operation
    #[error("permission denied")]
    PermissionDenied,
    /// The acceleration source failed
    #[error("sensor error: {0}")]
    Sensor(String),
}

impl Error {
    /// Negative errno returned across the control plane.
    pub fn errno(&self) -> i64 {
        match self {
            Error::InvalidArgument(_) => -EINVAL,
            Error::OutOfMemory => -ENOMEM,
            Error::NotFound(_) => -ENOENT,
            Error::PermissionDenied => -EACCES,
            Error::Sensor(_) => -EIO,
        }
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(Error::InvalidArgument("x").errno(), -22);
        assert_eq!(Error::OutOfMemory.errno(), -12);
        assert_eq!(Error::NotFound(SubscriptionId(3)).errno(), -2);
        assert_eq!(Error::PermissionDenied.errno(), -13);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::NotFound(SubscriptionId(7)).to_string(),
            "subscription 7 not found"
        );
    }
}
