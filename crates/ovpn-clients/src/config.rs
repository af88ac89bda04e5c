//! Filesystem layout of an openvpn-install style server.
//!
//! Everything hangs off two roots: the server directory (easy-rsa PKI,
//! shared settings, published CRL) and the client output directory
//! (composed `.ovpn` profiles).

use std::path::PathBuf;

use crate::identity::ClientName;
use crate::ledger::CnMatch;

const EASYRSA_DIR: &str = "easy-rsa";
const PKI_DIR: &str = "pki";
const CLIENT_COMMON_FILENAME: &str = "client-common.txt";
const TLS_CRYPT_FILENAME: &str = "tc.key";
const CRL_FILENAME: &str = "crl.pem";
const PROFILE_EXTENSION: &str = "ovpn";

/// Default program name, resolved relative to the easy-rsa directory.
pub const DEFAULT_EASYRSA_PROGRAM: &str = "./easyrsa";

/// Validity passed to easyrsa for client certificates and the CRL.
pub const DEFAULT_VALIDITY_DAYS: u32 = 3650;

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub base_dir: PathBuf,
    pub output_dir: PathBuf,
    /// easyrsa executable. Relative paths resolve against `easyrsa_dir()`.
    pub easyrsa_program: PathBuf,
    pub validity_days: u32,
    pub cn_match: CnMatch,
    /// Append-only audit trail of issue/revoke events, if set.
    pub audit_log: Option<PathBuf>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            base_dir: ovpn_common::paths::default_base_dir(),
            output_dir: ovpn_common::paths::default_output_dir(),
            easyrsa_program: PathBuf::from(DEFAULT_EASYRSA_PROGRAM),
            validity_days: DEFAULT_VALIDITY_DAYS,
            cn_match: CnMatch::default(),
            audit_log: None,
        }
    }
}

impl ManagerConfig {
    pub fn new(base_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Working directory for every easyrsa invocation.
    pub fn easyrsa_dir(&self) -> PathBuf {
        self.base_dir.join(EASYRSA_DIR)
    }

    pub fn pki_dir(&self) -> PathBuf {
        self.easyrsa_dir().join(PKI_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.pki_dir().join("index.txt")
    }

    pub fn issued_cert_path(&self, name: &ClientName) -> PathBuf {
        self.pki_dir().join("issued").join(format!("{name}.crt"))
    }

    pub fn private_key_path(&self, name: &ClientName) -> PathBuf {
        self.pki_dir().join("private").join(format!("{name}.key"))
    }

    pub fn request_path(&self, name: &ClientName) -> PathBuf {
        self.pki_dir().join("reqs").join(format!("{name}.req"))
    }

    pub fn ca_cert_path(&self) -> PathBuf {
        self.pki_dir().join("ca.crt")
    }

    /// CRL as written by `easyrsa gen-crl`.
    pub fn crl_source_path(&self) -> PathBuf {
        self.pki_dir().join(CRL_FILENAME)
    }

    /// CRL read by the running OpenVPN server.
    pub fn crl_target_path(&self) -> PathBuf {
        self.base_dir.join(CRL_FILENAME)
    }

    pub fn client_common_path(&self) -> PathBuf {
        self.base_dir.join(CLIENT_COMMON_FILENAME)
    }

    pub fn tls_crypt_key_path(&self) -> PathBuf {
        self.base_dir.join(TLS_CRYPT_FILENAME)
    }

    pub fn client_config_path(&self, name: &ClientName) -> PathBuf {
        self.output_dir.join(format!("{name}.{PROFILE_EXTENSION}"))
    }

    /// Per-client files easyrsa creates on `build-client-full`.
    pub fn artifact_paths(&self, name: &ClientName) -> [PathBuf; 3] {
        [
            self.issued_cert_path(name),
            self.private_key_path(name),
            self.request_path(name),
        ]
    }
}
