mod cli;
mod config;

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ovpn_clients::{ClientError, ClientManager};
use ovpn_common::api::error_body;
use ovpn_common::error::ErrorCode;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Hold the non-blocking guards for the lifetime of main so logs flush on exit.
    let _log_guards = init_logging(env_filter, cli.log_file.as_deref())?;

    if let Command::Version = cli.command {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })
            );
        } else {
            println!("ovpn {}", env!("CARGO_PKG_VERSION"));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = config::from_cli(&cli)?;
    tracing::debug!(
        base_dir = %config.base_dir.display(),
        output_dir = %config.output_dir.display(),
        easyrsa = %config.easyrsa_program.display(),
        "Configuration resolved"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(cli, ClientManager::new(config)))
}

async fn async_main(cli: Cli, manager: ClientManager) -> anyhow::Result<ExitCode> {
    let cancel = match cli.timeout {
        Some(secs) if secs > 0 => ovpn_clients::deadline(Duration::from_secs(secs)),
        _ => CancellationToken::new(),
    };

    // Ctrl-C abandons the operation; easyrsa is killed rather than orphaned.
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let outcome = match &cli.command {
        Command::Ensure { name, out } => {
            ensure(&manager, &cancel, name, out.as_deref(), cli.json).await
        }
        Command::Revoke { name } => manager.revoke_client(&cancel, name).await.map(|()| {
            if cli.json {
                println!("{}", serde_json::json!({ "client": name, "revoked": true }));
            } else {
                println!("Revoked {name}");
            }
        }),
        Command::Status { name } => manager.client_state(name).await.map(|state| {
            if cli.json {
                println!("{}", serde_json::json!({ "client": name, "state": state }));
            } else {
                println!("{name}: {}", describe_state(state));
            }
        }),
        Command::Crl => manager.publish_crl(&cancel).await.map(|()| {
            if cli.json {
                println!("{}", serde_json::json!({ "crl": "published" }));
            } else {
                println!("CRL published to {}", manager.config().crl_target_path().display());
            }
        }),
        Command::Version => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(report(&e, cli.json)),
    }
}

async fn ensure(
    manager: &ClientManager,
    cancel: &CancellationToken,
    name: &str,
    out: Option<&Path>,
    json: bool,
) -> Result<(), ClientError> {
    let profile = manager.ensure_client_config(cancel, name).await?;

    match out {
        Some(path) => {
            ovpn_common::persist::write_atomic(path, profile.as_bytes(), 0o600).map_err(|e| {
                ClientError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "client": name, "path": path.display().to_string() })
                );
            } else {
                println!("Wrote {}", path.display());
            }
        }
        None if json => {
            println!("{}", serde_json::json!({ "client": name, "profile": profile }));
        }
        None => print!("{profile}"),
    }
    Ok(())
}

fn describe_state(state: ovpn_clients::ClientState) -> String {
    use ovpn_clients::ClientState;
    match state {
        ClientState::Unknown => "unknown (no certificate issued)".to_string(),
        ClientState::Cached => "valid (profile cached)".to_string(),
        ClientState::Valid => "valid (profile not yet composed)".to_string(),
        ClientState::Revoked => "revoked".to_string(),
        ClientState::Other(flag) => format!("ledger status '{flag}'"),
    }
}

/// Print a caller-safe error and pick the exit code for its category.
fn report(e: &ClientError, json: bool) -> ExitCode {
    let code = ErrorCode::from(e);
    let message = e.public_message();

    if json {
        match serde_json::to_string(&error_body(code.clone(), message.clone())) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("Error: {message}"),
        }
    } else {
        eprintln!("Error: {message}");
    }

    ExitCode::from(exit_status(&code))
}

fn exit_status(code: &ErrorCode) -> u8 {
    match code {
        ErrorCode::InvalidName => 2,
        ErrorCode::NotFound => 3,
        ErrorCode::Conflict => 4,
        ErrorCode::Cancelled => 5,
        ErrorCode::CommandFailed | ErrorCode::IoError => 1,
    }
}

// ── Logging setup ───────────────────────────────────────────────────

/// Initialize tracing with stderr + optional file output.
/// Returns guards that must be held for the lifetime of the program.
fn init_logging(
    env_filter: tracing_subscriber::EnvFilter,
    log_file: Option<&Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    // stdout carries the profile, so logs only ever go to stderr.
    let (nb_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(nb_stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (nb_file, file_guard) = tracing_appender::non_blocking(file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(nb_file);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();

        Ok(vec![stderr_guard, file_guard])
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();

        Ok(vec![stderr_guard])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_client_errors() {
        assert_eq!(exit_status(&ErrorCode::InvalidName), 2);
        assert_eq!(exit_status(&ErrorCode::NotFound), 3);
        assert_eq!(exit_status(&ErrorCode::Conflict), 4);
        assert_eq!(exit_status(&ErrorCode::Cancelled), 5);
        assert_eq!(exit_status(&ErrorCode::IoError), 1);
    }

    #[test]
    fn describe_state_mentions_flag() {
        assert_eq!(
            describe_state(ovpn_clients::ClientState::Other('E')),
            "ledger status 'E'"
        );
    }
}
