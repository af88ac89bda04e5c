//! Append-only audit trail of certificate lifecycle events.
//!
//! Format: `2026-02-11T10:30:00Z | client_issued | client=alice`

use std::io::Write;
use std::path::Path;

use chrono::Utc;

/// Append an entry with the given event name and key=value fields.
pub fn append_entry(path: &Path, event: &str, fields: &[(&str, &str)]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut line = format!("{timestamp} | {event}");
    for (key, value) in fields {
        line.push_str(&format!(" | {key}={value}"));
    }
    line.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())?;

    tracing::debug!(event, "Audit log entry written");
    Ok(())
}

/// Record an event if an audit log is configured. Failures are logged and
/// otherwise ignored; the certificate operation has already happened.
pub(crate) fn record(path: Option<&Path>, event: &str, fields: &[(&str, &str)]) {
    let Some(path) = path else {
        return;
    };
    if let Err(e) = append_entry(path, event, fields) {
        tracing::warn!(
            path = %path.display(),
            event,
            error = %e,
            "Failed to write audit log entry"
        );
    }
}
