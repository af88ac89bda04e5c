//! OpenVPN client lifecycle.
//!
//! Produces ready-to-use `.ovpn` profiles for named clients, issuing a
//! certificate through easyrsa on first use, caching the composed profile
//! on disk, and revoking clients with a CRL refresh. All state lives in the
//! easy-rsa PKI directory and the client output directory; this crate only
//! sequences the transitions.
//!
//! Every operation runs under one manager-wide lock. easyrsa and the
//! shared ledger/CRL files are not safe under concurrent invocation.

pub mod audit;
pub mod config;
pub mod crl;
pub mod easyrsa;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod profile;

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

pub use config::ManagerConfig;
pub use easyrsa::{CaCommand, CaTool, EasyRsa};
pub use error::ClientError;
pub use identity::ClientName;
pub use ledger::{CertStatus, CnMatch};

use ovpn_common::error::ErrorCode;

/// Mode for composed profiles: they embed the client's private key.
const PROFILE_MODE: u32 = 0o600;
const PROFILE_DIR_MODE: u32 = 0o700;

/// Derived per-client state. Nothing stores this; it is read from the
/// profile cache and the ledger on each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    /// No ledger record and no cached profile.
    Unknown,
    /// A composed profile is cached.
    Cached,
    /// The ledger says valid but no profile is cached yet.
    Valid,
    Revoked,
    /// Any other ledger flag, e.g. `E` for expired.
    Other(char),
}

/// A token that cancels itself after `timeout`.
///
/// Must be called from within a Tokio runtime.
pub fn deadline(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(timeout) => trigger.cancel(),
            () = trigger.cancelled() => {}
        }
    });
    token
}

/// ClientManager — the lifecycle facade.
///
/// Generic over the CA capability so tests can substitute a fake for the
/// easyrsa subprocess.
pub struct ClientManager<T = EasyRsa> {
    config: ManagerConfig,
    tool: T,
    lock: Mutex<()>,
}

impl ClientManager<EasyRsa> {
    /// Manager that drives the real easyrsa found via `config`.
    pub fn new(config: ManagerConfig) -> Self {
        let tool = EasyRsa::from_config(&config);
        Self::with_tool(config, tool)
    }
}

impl<T: CaTool> ClientManager<T> {
    pub fn with_tool(config: ManagerConfig, tool: T) -> Self {
        Self {
            config,
            tool,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Return the client profile for `raw_name`, issuing a certificate if
    /// the client has none (or only a revoked one).
    ///
    /// A cached profile is returned as-is without touching the ledger or
    /// easyrsa, so repeated calls for a valid client run easyrsa once.
    pub async fn ensure_client_config(
        &self,
        cancel: &CancellationToken,
        raw_name: &str,
    ) -> Result<String, ClientError> {
        let name = parse_name(raw_name)?;
        let result = self.ensure_inner(cancel, &name).await;
        log_failure("ensure", &name, &result);
        result
    }

    /// Revoke `raw_name`'s certificate, publish a fresh CRL and drop the
    /// cached profile.
    ///
    /// Issued artifacts stay on disk until the next `ensure_client_config`
    /// rebuilds them. Revoking a revoked client returns `AlreadyRevoked`
    /// without running easyrsa.
    pub async fn revoke_client(
        &self,
        cancel: &CancellationToken,
        raw_name: &str,
    ) -> Result<(), ClientError> {
        let name = parse_name(raw_name)?;
        let result = self.revoke_inner(cancel, &name).await;
        log_failure("revoke", &name, &result);
        result
    }

    /// Regenerate and publish the CRL without revoking anyone.
    ///
    /// Repairs a stale published CRL after a revocation whose `gen-crl`
    /// step failed; the ledger already records the revocation, so
    /// `revoke_client` would answer `AlreadyRevoked`.
    pub async fn publish_crl(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        let _guard = self.acquire(cancel, "publish crl").await?;

        let result = self.gen_and_publish_crl(cancel).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "CRL publication failed");
        }
        result
    }

    /// Current state of `raw_name`. Never runs easyrsa.
    pub async fn client_state(&self, raw_name: &str) -> Result<ClientState, ClientError> {
        let name = parse_name(raw_name)?;
        let _guard = self.lock.lock().await;

        if self.config.client_config_path(&name).exists() {
            return Ok(ClientState::Cached);
        }

        match ledger::lookup_status(&self.config.index_path(), &name, self.config.cn_match) {
            Ok(CertStatus::Valid) => Ok(ClientState::Valid),
            Ok(CertStatus::Revoked) => Ok(ClientState::Revoked),
            Ok(CertStatus::Other(flag)) => Ok(ClientState::Other(flag)),
            Err(ClientError::ClientNotFound(_)) => Ok(ClientState::Unknown),
            Err(e) => Err(e),
        }
    }

    async fn ensure_inner(
        &self,
        cancel: &CancellationToken,
        name: &ClientName,
    ) -> Result<String, ClientError> {
        let _guard = self.acquire(cancel, "ensure").await?;

        let profile_path = self.config.client_config_path(name);
        match std::fs::read_to_string(&profile_path) {
            Ok(cached) => {
                tracing::debug!(client = %name, "Returning cached client profile");
                return Ok(cached);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ClientError::io(&profile_path, e)),
        }

        // An unknown client is the normal signal to issue one.
        let status =
            match ledger::lookup_status(&self.config.index_path(), name, self.config.cn_match) {
                Ok(status) => Some(status),
                Err(ClientError::ClientNotFound(_)) => None,
                Err(e) => return Err(e),
            };

        if status == Some(CertStatus::Revoked) {
            self.remove_artifacts(name)?;
        }

        if status != Some(CertStatus::Valid) {
            self.run(cancel, CaCommand::BuildClientFull(name.clone())).await?;
            audit::record(
                self.config.audit_log.as_deref(),
                "client_issued",
                &[("client", name.as_str())],
            );
        }

        let text = profile::compose(&self.config, name)?;
        self.write_profile(name, &text)?;

        tracing::info!(client = %name, "Client profile prepared");
        Ok(text)
    }

    async fn revoke_inner(
        &self,
        cancel: &CancellationToken,
        name: &ClientName,
    ) -> Result<(), ClientError> {
        let _guard = self.acquire(cancel, "revoke").await?;

        let status = ledger::lookup_status(&self.config.index_path(), name, self.config.cn_match)?;
        if status == CertStatus::Revoked {
            tracing::warn!(client = %name, "Client already revoked");
            return Err(ClientError::AlreadyRevoked(name.to_string()));
        }

        self.run(cancel, CaCommand::Revoke(name.clone())).await?;
        self.gen_and_publish_crl(cancel).await?;

        let profile_path = self.config.client_config_path(name);
        ovpn_common::persist::remove_if_exists(&profile_path)
            .map_err(|e| ClientError::io(&profile_path, e))?;

        audit::record(
            self.config.audit_log.as_deref(),
            "client_revoked",
            &[("client", name.as_str())],
        );
        tracing::info!(client = %name, "Client revoked");
        Ok(())
    }

    async fn gen_and_publish_crl(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        self.run(cancel, CaCommand::GenCrl).await?;
        crl::refresh(&self.config.crl_source_path(), &self.config.crl_target_path())
    }

    /// Take the manager lock unless the caller gives up first.
    async fn acquire(
        &self,
        cancel: &CancellationToken,
        operation: &str,
    ) -> Result<MutexGuard<'_, ()>, ClientError> {
        tokio::select! {
            guard = self.lock.lock() => Ok(guard),
            () = cancel.cancelled() => {
                Err(ClientError::Cancelled(format!("{operation}: waiting for lock")))
            }
        }
    }

    async fn run(&self, cancel: &CancellationToken, command: CaCommand) -> Result<(), ClientError> {
        let args = command.args(self.config.validity_days);
        self.tool.run(&args, cancel).await
    }

    /// Delete a revoked client's cert, key and request so easyrsa can
    /// issue a fresh set under the same name.
    fn remove_artifacts(&self, name: &ClientName) -> Result<(), ClientError> {
        for path in self.config.artifact_paths(name) {
            let removed = ovpn_common::persist::remove_if_exists(&path)
                .map_err(|e| ClientError::io(&path, e))?;
            if removed {
                tracing::debug!(client = %name, path = %path.display(), "Removed revoked artifact");
            }
        }
        audit::record(
            self.config.audit_log.as_deref(),
            "client_artifacts_removed",
            &[("client", name.as_str())],
        );
        Ok(())
    }

    fn write_profile(&self, name: &ClientName, text: &str) -> Result<(), ClientError> {
        let path = self.config.client_config_path(name);
        ovpn_common::persist::create_dir_all_with_mode(&self.config.output_dir, PROFILE_DIR_MODE)
            .map_err(|e| ClientError::io(&self.config.output_dir, e))?;
        ovpn_common::persist::write_atomic(&path, text.as_bytes(), PROFILE_MODE)
            .map_err(|e| ClientError::io(&path, e))
    }
}

fn parse_name(raw_name: &str) -> Result<ClientName, ClientError> {
    ClientName::parse(raw_name).inspect_err(|_| {
        tracing::warn!(raw = raw_name, "Rejected client name");
    })
}

fn log_failure<R>(operation: &str, name: &ClientName, result: &Result<R, ClientError>) {
    let Err(e) = result else {
        return;
    };
    if ErrorCode::from(e).is_client_error() {
        tracing::debug!(operation, client = %name, error = %e, "Client request rejected");
    } else {
        tracing::error!(operation, client = %name, error = %e, "Client operation failed");
    }
}
