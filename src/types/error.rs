use thiserror::Error;

/// pharmwatch error types
#[derive(Error, Debug)]
pub enum PharmwatchError {
    /// One or more data store queries failed
    #[error("fetch error: {0}")]
    Fetch(String),

    /// AI service call failed or returned unusable output
    #[error("ai service error: {0}")]
    Ai(String),

    /// Sign-in rejected or no session available
    #[error("auth error: {0}")]
    Auth(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Failed to parse JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// Transport-level HTTP failure
    #[error("http error: {0}")]
    Http(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pharmwatch
pub type Result<T> = std::result::Result<T, PharmwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PharmwatchError::Parse("invalid json".into());
        assert_eq!(err.to_string(), "parse error: invalid json");
    }

    #[test]
    fn test_fetch_error_display() {
        let err = PharmwatchError::Fetch("medicines: HTTP 500".into());
        assert_eq!(err.to_string(), "fetch error: medicines: HTTP 500");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PharmwatchError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }
}
