use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for repository operations.
///
/// Each kind names one category of failure so callers can branch on
/// [RepoError::kind] instead of parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{RepoError, ErrorKind, RepoResult};
///
/// fn example() -> RepoResult<()> {
///     Err(RepoError::new("sequence update was not acknowledged", ErrorKind::AllocationFailure))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Sequence Errors
    /// The atomic sequence increment could not complete; no ids were reserved
    AllocationFailure,

    // Translation Errors
    /// A projection selector was not shaped as a record of entity fields
    InvalidProjectionExpression,
    /// Error during filter evaluation or construction
    FilterError,
    /// Error during update construction or application
    UpdateError,

    // Store Errors
    /// Driver or network level failure while talking to the store
    StoreFailure,
    /// A document with the same `_id` already exists
    DuplicateKey,
    /// An operation attempted to change an immutable field such as `_id`
    ImmutableField,

    // ID and Identity Errors
    /// The provided identity value is invalid or missing
    InvalidId,

    // Data Encoding Errors
    /// Error mapping an entity to or from a document
    ObjectMappingError,

    // Operation Errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Generic validation error
    ValidationError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::AllocationFailure => write!(f, "Allocation failure"),
            ErrorKind::InvalidProjectionExpression => write!(f, "Invalid projection expression"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::UpdateError => write!(f, "Update error"),
            ErrorKind::StoreFailure => write!(f, "Store failure"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::ImmutableField => write!(f, "Immutable field"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the repository layer.
///
/// `RepoError` carries a message, a [ErrorKind], an optional cause and the
/// backtrace captured where it was created. Store errors are surfaced as-is:
/// nothing in this crate retries or suppresses a failure.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{RepoError, ErrorKind};
///
/// let cause = RepoError::new("connection reset", ErrorKind::StoreFailure);
/// let err = RepoError::new_with_cause("failed to reserve ids", ErrorKind::AllocationFailure, cause);
/// ```
#[derive(Clone)]
pub struct RepoError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<RepoError>>,
    backtrace: Atomic<Backtrace>,
}

impl RepoError {
    /// Creates a new `RepoError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `RepoError` that wraps an underlying cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: RepoError) -> Self {
        RepoError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&RepoError> {
        self.cause.as_deref()
    }

    /// Walks the cause chain and returns the innermost error.
    pub fn root_cause(&self) -> &RepoError {
        let mut current = self;
        while let Some(cause) = current.cause.as_deref() {
            current = cause;
        }
        current
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(feature = "serde")]
impl serde::de::Error for RepoError {
    fn custom<T: Display>(msg: T) -> Self {
        RepoError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for RepoError {
    fn custom<T: Display>(msg: T) -> Self {
        RepoError::new(&msg.to_string(), ErrorKind::ObjectMappingError)
    }
}

impl From<regex::Error> for RepoError {
    fn from(err: regex::Error) -> Self {
        RepoError::new(&format!("Invalid regex pattern: {}", err), ErrorKind::FilterError)
    }
}

impl From<hex::FromHexError> for RepoError {
    fn from(err: hex::FromHexError) -> Self {
        RepoError::new(&format!("Invalid object id: {}", err), ErrorKind::InvalidId)
    }
}

impl From<std::fmt::Error> for RepoError {
    fn from(err: std::fmt::Error) -> Self {
        RepoError::new(&format!("Formatting error: {}", err), ErrorKind::InternalError)
    }
}

impl From<String> for RepoError {
    fn from(msg: String) -> Self {
        RepoError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for RepoError {
    fn from(msg: &str) -> Self {
        RepoError::new(msg, ErrorKind::InternalError)
    }
}
