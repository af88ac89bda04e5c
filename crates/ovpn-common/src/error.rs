use serde::{Deserialize, Serialize};

/// Machine-readable error codes shared by every caller-facing surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidName,
    NotFound,
    Conflict,
    CommandFailed,
    Cancelled,
    IoError,
}

impl ErrorCode {
    /// Suggested HTTP status code for this error.
    /// Transport-agnostic (returns u16, not a framework type).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidName => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Cancelled => 503,
            Self::CommandFailed | Self::IoError => 500,
        }
    }

    /// Whether the caller caused this error (bad input, unknown name,
    /// conflicting state) rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidName | Self::NotFound | Self::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adding a new ErrorCode variant forces a compile error here until the
    /// mapping is explicitly verified.
    #[test]
    fn all_error_code_variants_map_to_expected_http_status() {
        let cases: Vec<(ErrorCode, u16)> = vec![
            (ErrorCode::InvalidName, 400),
            (ErrorCode::NotFound, 404),
            (ErrorCode::Conflict, 409),
            (ErrorCode::CommandFailed, 500),
            (ErrorCode::IoError, 500),
            (ErrorCode::Cancelled, 503),
        ];
        for (code, expected_status) in &cases {
            assert_eq!(
                code.http_status(),
                *expected_status,
                "{code:?} should map to HTTP {expected_status}"
            );
        }
    }

    #[test]
    fn client_errors_are_the_4xx_codes() {
        assert!(ErrorCode::InvalidName.is_client_error());
        assert!(ErrorCode::NotFound.is_client_error());
        assert!(ErrorCode::Conflict.is_client_error());
        assert!(!ErrorCode::CommandFailed.is_client_error());
        assert!(!ErrorCode::IoError.is_client_error());
        assert!(!ErrorCode::Cancelled.is_client_error());
    }

    #[test]
    fn error_code_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorCode::InvalidName).unwrap(),
            "invalid_name"
        );
        assert_eq!(
            serde_json::to_value(ErrorCode::CommandFailed).unwrap(),
            "command_failed"
        );
        assert_eq!(serde_json::to_value(ErrorCode::IoError).unwrap(), "io_error");
    }
}
