//! Error types for the plotline system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

/// The main error type for plotline operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }

    /// Creates a block-not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(id.into()))
    }

    /// Creates an error for an operation the block's status does not allow.
    #[must_use]
    pub fn invalid_state(
        block: impl Into<String>,
        status: impl fmt::Display,
        operation: &'static str,
    ) -> Self {
        Self::new(ErrorKind::InvalidState {
            block: block.into(),
            status: status.to_string(),
            operation,
        })
    }

    /// Creates an error for a structural edit aimed at the super-root.
    #[must_use]
    pub fn cannot_perform_on_root(operation: impl Into<String>) -> Self {
        Self::new(ErrorKind::CannotPerformOnRoot(operation.into()))
    }

    /// Creates an error for a move that would create a cycle.
    #[must_use]
    pub fn cyclic(block: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(ErrorKind::CyclicOperation {
            block: block.into(),
            target: target.into(),
        })
    }

    /// Creates a malformed-request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest(message.into()))
    }

    /// Creates an unexpected internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No block with this id exists.
    #[error("block not found: {0}")]
    NotFound(String),

    /// The block's current status does not permit the operation.
    #[error("block {block} is {status}; cannot {operation}")]
    InvalidState {
        /// The block that was addressed.
        block: String,
        /// The status the block was in.
        status: String,
        /// The operation that was refused.
        operation: &'static str,
    },

    /// Structural edits never apply to the super-root.
    #[error("cannot {0} the root block")]
    CannotPerformOnRoot(String),

    /// The edit would make a block its own ancestor.
    #[error("moving {block} under {target} would create a cycle")]
    CyclicOperation {
        /// The block being moved.
        block: String,
        /// The requested new parent.
        target: String,
    },

    /// The request is malformed or incomplete.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Reading or writing a stream failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// Maps this kind onto the stable code an API layer reports.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::CannotPerformOnRoot(_) => ErrorCode::CannotPerformOnRoot,
            Self::CyclicOperation { .. } => ErrorCode::CyclicOperation,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Serialization(_) | Self::Io(_) | Self::Internal(_) => ErrorCode::Error,
        }
    }
}

/// Stable, field-less error codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Block id unknown.
    NotFound,
    /// Operation not permitted in the block's status.
    InvalidState,
    /// Structural edit targets the super-root.
    CannotPerformOnRoot,
    /// Move would create a cycle.
    CyclicOperation,
    /// Malformed input.
    BadRequest,
    /// Unexpected failure.
    Error,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::InvalidState => "InvalidState",
            Self::CannotPerformOnRoot => "CannotPerformOnRoot",
            Self::CyclicOperation => "CyclicOperation",
            Self::BadRequest => "BadRequest",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Name of the manager operation that failed.
    pub operation: Option<String>,
    /// Block the operation addressed.
    pub block: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the block id.
    #[must_use]
    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "in {operation}")?;
        }
        if let Some(block) = &self.block {
            if self.operation.is_some() {
                write!(f, " ")?;
            }
            write!(f, "on block {block}")?;
        }
        Ok(())
    }
}
