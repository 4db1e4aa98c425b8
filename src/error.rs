//! Unified error type.
//!
//! Errors travel up the layer stack as plain `Err` values. Nothing in the
//! pipeline catches them: whichever layer wants to turn an error into a
//! response does so (see [`middleware::catch_errors`](crate::middleware::catch_errors)).

use std::sync::Arc;

use http::StatusCode;

/// Boxed error produced by the body stream of the transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by layers and by shallot's fallible operations.
///
/// `Clone` because a failed body parse is memoized: every layer asking for
/// the body of that request receives the same error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The body is malformed for a media type we know how to parse.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The body was requested but its media type is missing or unknown.
    #[error("unsupported media type")]
    UnsupportedMediaType,

    #[error("not found")]
    NotFound,

    /// Catch-all for unexpected backend conditions.
    #[error("internal server error: {0}")]
    InternalServerError(String),

    /// The request body stream failed before it was fully read.
    #[error("transport: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// Binding to a port or accepting a connection failed.
    #[error("io: {0}")]
    Io(Arc<std::io::Error>),
}

impl Error {
    /// The HTTP status an error-handling layer should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_)          => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType   => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound               => StatusCode::NOT_FOUND,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transport(_)           => StatusCode::BAD_REQUEST,
            Self::Io(_)                  => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn transport(e: impl Into<BoxError>) -> Self {
        Self::Transport(Arc::from(e.into()))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(Arc::new(e))
    }
}

/// Failure to compile a path pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("unclosed `{{` in pattern `{0}`")]
    UnclosedParameter(String),

    #[error("invalid parameter name `{name}` in pattern `{pattern}`")]
    InvalidParameter { pattern: String, name: String },

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(Error::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::UnsupportedMediaType.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            Error::InternalServerError("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "io: taken");
    }
}
