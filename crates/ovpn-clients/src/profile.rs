//! Client profile (`.ovpn`) assembly.
//!
//! A profile is the shared `client-common.txt` followed by four inline
//! sections: `<ca>`, `<cert>`, `<key>` and `<tls-crypt>`. easyrsa prefixes
//! issued certificates with a text dump, so the cert and tls-crypt
//! sections start at their PEM header.

use std::path::Path;

use crate::config::ManagerConfig;
use crate::error::ClientError;
use crate::identity::ClientName;

pub const CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";
pub const STATIC_KEY_MARKER: &str = "-----BEGIN OpenVPN Static key-----";

/// Build the profile for `name` from the artifacts currently on disk.
///
/// Every input must exist. A missing file here means the ledger and the
/// PKI directory disagree, and is reported as an I/O error on that path.
pub fn compose(config: &ManagerConfig, name: &ClientName) -> Result<String, ClientError> {
    let mut out = String::new();

    push_segment(&mut out, &read(&config.client_common_path())?);
    push_section(&mut out, "ca", &read(&config.ca_cert_path())?, None);
    push_section(
        &mut out,
        "cert",
        &read(&config.issued_cert_path(name))?,
        Some(CERTIFICATE_MARKER),
    );
    push_section(&mut out, "key", &read(&config.private_key_path(name))?, None);
    push_section(
        &mut out,
        "tls-crypt",
        &read(&config.tls_crypt_key_path())?,
        Some(STATIC_KEY_MARKER),
    );

    Ok(out)
}

fn read(path: &Path) -> Result<String, ClientError> {
    std::fs::read_to_string(path).map_err(|e| ClientError::io(path, e))
}

/// Slice of `data` starting at `marker`, or all of it when absent.
pub fn tail_from_marker<'a>(data: &'a str, marker: &str) -> &'a str {
    data.find(marker).map_or(data, |idx| &data[idx..])
}

fn push_segment(out: &mut String, data: &str) {
    out.push_str(data);
    if !data.ends_with('\n') {
        out.push('\n');
    }
}

fn push_section(out: &mut String, tag: &str, data: &str, marker: Option<&str>) {
    let body = match marker {
        Some(marker) => tail_from_marker(data, marker),
        None => data,
    };

    out.push('<');
    out.push_str(tag);
    out.push_str(">\n");
    push_segment(out, body);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}
