use std::{error, fmt};

/// Failure conditions surfaced to callers of the parsing and accessor layers.
///
/// Absence of a header or cookie is an ordinary, recoverable condition a route
/// handler decides how to treat; it is reported as a value instead of
/// unwinding. Configuration misuse (delimiter capacity overflows, flushing a
/// responder that was never sent) is a programmer error and panics at the
/// call site instead of appearing here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The named header field is not present in the request.
    FieldNotFound,
    /// The named cookie is not present in the `Cookie` header.
    CookieNotFound,
    /// The request-line method token is not a recognized HTTP method.
    InvalidMethod,
    /// The request-line version token is not `HTTP/1.0` or `HTTP/1.1`.
    InvalidVersion,
}

impl error::Error for ErrorKind {}
impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
