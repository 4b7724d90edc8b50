use thiserror::Error;

/// Malformed local input, rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("line {line}: expected login:password")]
    MalformedAccountLine { line: usize },
    #[error("account list contains no login:password entries")]
    NoAccounts,
    #[error("login must not be empty")]
    EmptyLogin,
    #[error("password for {login} must not be empty")]
    EmptyPassword { login: String },
    #[error("invalid {field} range: {reason}")]
    InvalidRange { field: &'static str, reason: String },
    #[error("search mode requires a search term")]
    MissingSearchTerm,
    #[error("slug mode requires a book slug")]
    MissingSlug,
}
