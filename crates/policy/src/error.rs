//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A role name did not match any known role.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

pub type Result<T> = std::result::Result<T, Error>;
