use policy::DenyReason;
use serde::Serialize;
use thiserror::Error;

/// Marketplace errors.
///
/// Every variant except [`Error::Store`] and [`Error::Internal`] is a
/// business outcome returned to the caller as-is. Infrastructure failures
/// are reported through [`Error::envelope`] without their detail.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidCredential(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// The experience is not in a bookable state.
    #[error("{0}")]
    InvalidStatus(String),

    #[error("you have already booked this experience")]
    AlreadyBooked,

    /// The requested transition is not allowed from the current state.
    #[error("{0}")]
    InvalidState(String),

    #[error("email already registered")]
    UserExists,

    #[error("invalid email or password")]
    InvalidLogin,

    #[error(transparent)]
    Store(#[from] storage::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<DenyReason> for Error {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => Error::Unauthenticated(reason.to_string()),
            DenyReason::Forbidden { .. } => Error::Forbidden(reason.to_string()),
        }
    }
}

/// Wire shape of an error: `{"error": {"code", "message", "details"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: Vec<String>,
}

impl Error {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "UNAUTHENTICATED",
            Error::InvalidCredential(_) => "INVALID_TOKEN",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::InvalidStatus(_) => "INVALID_STATUS",
            Error::AlreadyBooked => "ALREADY_BOOKED",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::UserExists => "USER_EXISTS",
            Error::InvalidLogin => "INVALID_CREDENTIALS",
            Error::Store(_) | Error::Internal(_) => "SERVER_ERROR",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthenticated(_) | Error::InvalidCredential(_) | Error::InvalidLogin => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Validation(_)
            | Error::InvalidStatus(_)
            | Error::AlreadyBooked
            | Error::UserExists => 400,
            Error::InvalidState(_) => 409,
            Error::Store(_) | Error::Internal(_) => 500,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Internal(_))
    }

    /// Build the caller-facing envelope. Internal failures are logged here
    /// and replaced by a generic message.
    pub fn envelope(&self) -> ErrorEnvelope {
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message,
                details: Vec::new(),
            },
        }
    }
}
