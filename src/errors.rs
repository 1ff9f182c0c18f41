use std::fmt;
use thiserror::Error;

/// Classification of a repository error, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ShapeMismatch,
    TypeMismatch,
    Frozen,
    ReservedName,
    InefficientAction,
    ParseError,
    InvalidParameter,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::ShapeMismatch => "ShapeMismatch",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::Frozen => "Frozen",
            ErrorKind::ReservedName => "ReservedName",
            ErrorKind::InefficientAction => "InefficientAction",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::InvalidParameter => "InvalidParameter",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Crate-wide error type.
///
/// The message accumulates domain context: each layer that forwards an error
/// prepends one `for the X: ...` line via [`AxialError::for_context`], so the
/// final rendering reads as a stack of contexts with the innermost cause last.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct AxialError {
    kind: ErrorKind,
    message: String,
}

pub type AxialResult<T> = Result<T, AxialError>;

impl AxialError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prepend one `for the {what}: {which}` context line.
    #[must_use]
    pub fn for_context(mut self, what: &str, which: impl fmt::Display) -> Self {
        self.message = format!("for the {}: {}\n{}", what, which, self.message);
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShapeMismatch, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn frozen(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Frozen, message)
    }

    pub fn reserved_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReservedName, message)
    }

    pub fn inefficient_action(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InefficientAction, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }
}
