//! easyrsa `index.txt` lookups.
//!
//! The ledger is owned by easyrsa and only ever read here. Each record
//! starts with a one-character status flag and carries the subject DN
//! (`.../CN=<name>`). A name can appear several times after re-issuance;
//! the last matching record in file order is authoritative.

use std::path::Path;

use crate::error::ClientError;
use crate::identity::ClientName;

/// Certificate status as recorded by easyrsa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Valid,
    Revoked,
    /// Any other flag easyrsa writes (for example `E`, expired).
    Other(char),
}

impl CertStatus {
    pub fn from_flag(flag: char) -> Self {
        match flag {
            'V' => Self::Valid,
            'R' => Self::Revoked,
            other => Self::Other(other),
        }
    }
}

/// How a ledger line is matched against a client name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CnMatch {
    /// The line contains `/CN=<name>` anywhere. `alice` also matches a
    /// record for `alice2`.
    #[default]
    Substring,
    /// `/CN=<name>` must be followed by end of line or another `/` field.
    Anchored,
}

impl CnMatch {
    fn matches(self, line: &str, needle: &str) -> bool {
        match self {
            Self::Substring => line.contains(needle),
            Self::Anchored => line.match_indices(needle).any(|(idx, _)| {
                let rest = &line[idx + needle.len()..];
                rest.is_empty() || rest.starts_with('/')
            }),
        }
    }
}

/// Find the status of `name` in the ledger at `index_path`.
///
/// A missing ledger means no client has ever been issued, so it reports
/// `ClientNotFound` like an unknown name does.
pub fn lookup_status(
    index_path: &Path,
    name: &ClientName,
    mode: CnMatch,
) -> Result<CertStatus, ClientError> {
    let data = match std::fs::read_to_string(index_path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %index_path.display(), "Ledger does not exist yet");
            return Err(ClientError::ClientNotFound(name.to_string()));
        }
        Err(e) => return Err(ClientError::io(index_path, e)),
    };

    match status_in(&data, name, mode) {
        Some(status) => Ok(status),
        None => {
            tracing::debug!(client = %name, "Client not present in ledger");
            Err(ClientError::ClientNotFound(name.to_string()))
        }
    }
}

/// Status of the last record for `name` in ledger text.
pub fn status_in(data: &str, name: &ClientName, mode: CnMatch) -> Option<CertStatus> {
    let needle = format!("/CN={name}");

    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| mode.matches(line, &needle))
        .last()
        .and_then(|line| line.chars().next())
        .map(CertStatus::from_flag)
}
