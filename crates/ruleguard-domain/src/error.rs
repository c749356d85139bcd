//! Error taxonomy shared by every layer of ruleguard.

use thiserror::Error;

/// Result type alias for fallible ruleguard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The single error type returned by domain, application, and adapter code.
///
/// Variant names track the error *kinds* named in the behavioral contract
/// (`NotFound`, `AlreadyExists`, `InvalidArgument`, `FailedPrecondition`,
/// `Internal`); the remaining variants are lower-level causes that
/// `#[from]`-convert into `Internal`-shaped handling at the call site.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced rule or record does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the missing resource (e.g. `"rule:my-rule"`).
        resource: String,
    },

    /// Create was attempted for an id that is already present.
    #[error("already exists: {id}")]
    AlreadyExists {
        /// The id that already exists.
        id: String,
    },

    /// Field validation, expression compilation, malformed span, or an
    /// oversized/invalid batch.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what failed validation.
        message: String,
    },

    /// The FSM rejected the requested transition for the rule's current state.
    #[error("failed precondition: {message}")]
    FailedPrecondition {
        /// Description of the rejected transition.
        message: String,
    },

    /// Store I/O failure, unexpected FSM transition failure, or an
    /// unrecoverable engine error.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal failure.
        message: String,
    },

    /// Underlying SQLite store failure.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Rule expression failed to compile or evaluate.
    #[error("expression error: {0}")]
    Expression(#[from] evalexpr::EvalexprError),

    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

impl Error {
    /// Build a [`Error::NotFound`].
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Build an [`Error::AlreadyExists`].
    pub fn already_exists<S: Into<String>>(id: S) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Build an [`Error::InvalidArgument`].
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build an [`Error::FailedPrecondition`].
    pub fn failed_precondition<S: Into<String>>(message: S) -> Self {
        Self::FailedPrecondition {
            message: message.into(),
        }
    }

    /// Build an [`Error::Internal`].
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Build an [`Error::Config`].
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// `true` if this error kind corresponds to the `NotFound` contract kind.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
