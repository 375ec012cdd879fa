use std::fmt;

/// Coarse error taxonomy shared by every public error in the crate.
///
/// The API layer maps each kind onto a distinct response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request: bad amount, self-transfer, missing field.
    Validation,
    /// Referenced account does not exist.
    NotFound,
    /// Request is well formed but conflicts with current state (insufficient funds).
    Conflict,
    /// Transient resource problem: lock timeout, store unavailable, cancellation.
    Resource,
    /// Unique owner identity already taken.
    Duplicate,
    /// Credentials did not match.
    Unauthorized,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 422,
            ErrorKind::Duplicate => 409,
            ErrorKind::Resource => 503,
        }
    }

    /// Only resource errors are worth retrying, and only by the caller.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Resource)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Resource => "resource",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Unauthorized => "unauthorized",
        };
        f.write_str(name)
    }
}
