//! Error types for jobdash.
//!
//! `BackendError` covers everything that can go wrong talking to the hosted
//! auth/data service. `Error` covers local validation and configuration and
//! wraps backend failures. Messages are written to be shown to the user as-is.

use thiserror::Error;

/// A failure reported by, or while reaching, the hosted backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The service answered with an error status. `message` is the raw text it sent.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never completed.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with something we could not interpret.
    #[error("unexpected response from backend: {0}")]
    InvalidResponse(String),

    /// Reading or writing the local session file failed.
    #[error("session storage error: {0}")]
    SessionStore(String),

    /// A call that needs a session was made without one.
    #[error("Not signed in")]
    NotSignedIn,
}

/// The main error type for jobdash operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Backend(#[from] BackendError),

    // === Form and auth validation ===
    #[error("Please fill all required fields")]
    MissingRequiredFields,

    #[error("Please fill all fields")]
    MissingCredentials,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("An account with this email already exists")]
    AccountExists,

    #[error(
        "Unknown status '{0}' (expected one of: applied, interview, review, offer, rejected, archived)"
    )]
    UnknownStatus(String),

    #[error("Unknown priority '{0}' (expected one of: low, medium, high)")]
    UnknownPriority(String),

    #[error("Invalid applied date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),

    // === Configuration ===
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    ConfigValidation { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::ConfigLoad(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
