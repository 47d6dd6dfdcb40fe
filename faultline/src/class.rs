//! Error classes for faultline errors

use std::fmt;

use serde::Serialize;

/// The class of error that occurred.
///
/// The class is the routing taxonomy: callers match on it to decide how a
/// failure is surfaced (for example which HTTP status a handler returns).
/// Retry decisions are made separately through the retryable hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[non_exhaustive]
pub enum ErrorClass {
    // =========================================================================
    // Client errors
    // =========================================================================
    /// Input failed validation
    Validation,

    /// Caller is not authenticated
    Unauthenticated,

    /// Caller is authenticated but not allowed
    PermissionDenied,

    /// The requested entity does not exist
    NotFound,

    /// The entity being created already exists
    AlreadyExists,

    /// The request conflicts with current state
    Conflict,

    /// A precondition on the request was not met
    PreconditionFailed,

    /// Too many requests
    RateLimited,

    // =========================================================================
    // Server errors
    // =========================================================================
    /// Unexpected failure - also the default when no class is set
    Internal,

    /// The operation is not implemented
    NotImplemented,

    /// A dependency is unavailable
    Unavailable,

    /// The operation timed out
    Timeout,
}

impl ErrorClass {
    /// Returns the class as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "Validation",
            ErrorClass::Unauthenticated => "Unauthenticated",
            ErrorClass::PermissionDenied => "PermissionDenied",
            ErrorClass::NotFound => "NotFound",
            ErrorClass::AlreadyExists => "AlreadyExists",
            ErrorClass::Conflict => "Conflict",
            ErrorClass::PreconditionFailed => "PreconditionFailed",
            ErrorClass::RateLimited => "RateLimited",
            ErrorClass::Internal => "Internal",
            ErrorClass::NotImplemented => "NotImplemented",
            ErrorClass::Unavailable => "Unavailable",
            ErrorClass::Timeout => "Timeout",
        }
    }

    /// Conventional HTTP status code for this class
    pub fn http_code(&self) -> u16 {
        match self {
            ErrorClass::Validation => 400,
            ErrorClass::Unauthenticated => 401,
            ErrorClass::PermissionDenied => 403,
            ErrorClass::NotFound => 404,
            ErrorClass::AlreadyExists | ErrorClass::Conflict => 409,
            ErrorClass::PreconditionFailed => 412,
            ErrorClass::RateLimited => 429,
            ErrorClass::Internal => 500,
            ErrorClass::NotImplemented => 501,
            ErrorClass::Unavailable => 503,
            ErrorClass::Timeout => 504,
        }
    }

    /// Short lowercase description, used when an error has no message at all
    pub fn description(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation failed",
            ErrorClass::Unauthenticated => "unauthenticated",
            ErrorClass::PermissionDenied => "permission denied",
            ErrorClass::NotFound => "not found",
            ErrorClass::AlreadyExists => "already exists",
            ErrorClass::Conflict => "conflict",
            ErrorClass::PreconditionFailed => "precondition failed",
            ErrorClass::RateLimited => "rate limited",
            ErrorClass::Internal => "internal error",
            ErrorClass::NotImplemented => "not implemented",
            ErrorClass::Unavailable => "unavailable",
            ErrorClass::Timeout => "timed out",
        }
    }
}

impl Default for ErrorClass {
    fn default() -> Self {
        ErrorClass::Internal
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_display() {
        assert_eq!(ErrorClass::NotFound.to_string(), "NotFound");
        assert_eq!(ErrorClass::PermissionDenied.to_string(), "PermissionDenied");
    }

    #[test]
    fn test_http_codes() {
        assert_eq!(ErrorClass::Validation.http_code(), 400);
        assert_eq!(ErrorClass::PermissionDenied.http_code(), 403);
        assert_eq!(ErrorClass::NotFound.http_code(), 404);
        assert_eq!(ErrorClass::AlreadyExists.http_code(), 409);
        assert_eq!(ErrorClass::Internal.http_code(), 500);
        assert_eq!(ErrorClass::default().http_code(), 500);
    }
}
