//! Client lifecycle error types.

use std::path::PathBuf;

use ovpn_common::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid client name")]
    InvalidIdentity,

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("client already revoked: {0}")]
    AlreadyRevoked(String),

    #[error("easyrsa {args:?} failed ({status}): {output}")]
    CommandFailed {
        args: Vec<String>,
        status: String,
        output: String,
    },

    /// The caller's cancellation token fired; carries what was interrupted.
    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Message safe to hand back to a caller.
    ///
    /// Client errors keep their text; operational errors collapse to an
    /// opaque string so paths and captured tool output stay in the logs.
    pub fn public_message(&self) -> String {
        if ErrorCode::from(self).is_client_error() {
            self.to_string()
        } else {
            "internal error".to_string()
        }
    }
}

impl From<&ClientError> for ErrorCode {
    fn from(e: &ClientError) -> Self {
        match e {
            ClientError::InvalidIdentity => ErrorCode::InvalidName,
            ClientError::ClientNotFound(_) => ErrorCode::NotFound,
            ClientError::AlreadyRevoked(_) => ErrorCode::Conflict,
            ClientError::CommandFailed { .. } => ErrorCode::CommandFailed,
            ClientError::Cancelled(_) => ErrorCode::Cancelled,
            ClientError::Io { .. } => ErrorCode::IoError,
        }
    }
}
