//! easyrsa invocation.
//!
//! The CA tool is the only component that touches key material. It is
//! modelled as the [`CaTool`] capability so the lifecycle logic can run
//! against a fake in tests; [`EasyRsa`] is the subprocess implementation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio_util::sync::CancellationToken;

use crate::config::ManagerConfig;
use crate::error::ClientError;
use crate::identity::ClientName;

/// Something that can execute easyrsa argument lists.
///
/// Success is reported purely through the return value; the effects
/// (ledger records, issued files, CRL) land on disk.
pub trait CaTool: Send + Sync {
    fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// The easyrsa subcommands the lifecycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaCommand {
    /// Issue a client certificate and key without a passphrase.
    BuildClientFull(ClientName),
    Revoke(ClientName),
    GenCrl,
}

impl CaCommand {
    pub fn args(&self, validity_days: u32) -> Vec<String> {
        let days = format!("--days={validity_days}");
        let args: Vec<&str> = match self {
            Self::BuildClientFull(name) => {
                vec!["--batch", days.as_str(), "build-client-full", name.as_str(), "nopass"]
            }
            Self::Revoke(name) => vec!["--batch", "revoke", name.as_str()],
            Self::GenCrl => vec!["--batch", days.as_str(), "gen-crl"],
        };
        args.into_iter().map(String::from).collect()
    }
}

/// Runs easyrsa as a child process inside the easy-rsa directory.
#[derive(Debug, Clone)]
pub struct EasyRsa {
    program: PathBuf,
    workdir: PathBuf,
}

impl EasyRsa {
    pub fn new(program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.easyrsa_program.clone(), config.easyrsa_dir())
    }

    /// Program path actually executed.
    ///
    /// `./easyrsa` style paths resolve against the working directory; bare
    /// names go through `PATH`.
    pub fn resolved_program(&self) -> PathBuf {
        resolve_program(&self.program, &self.workdir)
    }
}

fn resolve_program(program: &Path, workdir: &Path) -> PathBuf {
    if program.is_relative() && program.components().count() > 1 {
        workdir.join(program)
    } else {
        program.to_path_buf()
    }
}

fn describe(args: &[String]) -> String {
    format!("easyrsa {}", args.join(" "))
}

impl CaTool for EasyRsa {
    async fn run(&self, args: &[String], cancel: &CancellationToken) -> Result<(), ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled(describe(args)));
        }

        let program = self.resolved_program();
        tracing::info!(args = ?args, "Running easyrsa");

        let mut command = tokio::process::Command::new(&program);
        command
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // easyrsa is a shell script; its openssl children share the group.
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|e| ClientError::io(&program, e))?;
        let pid = child.id();

        // Dropping the wait future drops the child, and kill_on_drop
        // terminates it.
        let output = tokio::select! {
            result = child.wait_with_output() => {
                result.map_err(|e| ClientError::io(&program, e))?
            }
            () = cancel.cancelled() => {
                tracing::warn!(args = ?args, "easyrsa cancelled, killing its process group");
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                return Err(ClientError::Cancelled(describe(args)));
            }
        };

        let combined = String::from_utf8_lossy(&output.stdout).to_string()
            + &String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            tracing::debug!(args = ?args, "easyrsa succeeded");
            Ok(())
        } else {
            // Logged with the full output by the operation that ran it.
            tracing::debug!(
                args = ?args,
                status = %output.status,
                "easyrsa exited unsuccessfully"
            );
            Err(ClientError::CommandFailed {
                args: args.to_vec(),
                status: output.status.to_string(),
                output: combined,
            })
        }
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = signal::kill(Pid::from_raw(-raw), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            tracing::warn!(pid, error = ?e, "SIGKILL to easyrsa process group failed");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
