use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ovpn",
    version,
    about = "Issue, cache and revoke OpenVPN client profiles"
)]
pub struct Cli {
    /// TOML config file with an [openvpn] table
    #[arg(long, env = "OVPN_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// OpenVPN server directory (contains easy-rsa/, tc.key, crl.pem)
    #[arg(long, env = "OVPN_BASE_DIR", value_name = "DIR", global = true)]
    pub base_dir: Option<PathBuf>,

    /// Directory for composed .ovpn profiles
    #[arg(long, env = "OVPN_OUTPUT_DIR", value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// easyrsa executable (relative paths resolve inside easy-rsa/)
    #[arg(long, env = "OVPN_EASYRSA", value_name = "PATH", global = true)]
    pub easyrsa: Option<PathBuf>,

    /// Validity in days for issued certificates and the CRL
    #[arg(long, value_name = "DAYS", global = true)]
    pub days: Option<u32>,

    /// Only match ledger records whose CN is exactly the client name
    #[arg(long, global = true)]
    pub strict_cn_match: bool,

    /// Append issue/revoke events to this audit log
    #[arg(long, env = "OVPN_AUDIT_LOG", value_name = "PATH", global = true)]
    pub audit_log: Option<PathBuf>,

    /// Give up (and kill easyrsa) after N seconds
    #[arg(long, env = "OVPN_TIMEOUT", value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "OVPN_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "OVPN_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a client's profile, issuing a certificate on first use
    Ensure {
        /// Client name (sanitized to [A-Za-z0-9_-])
        name: String,
        /// Write the profile to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Revoke a client's certificate and publish a new CRL
    Revoke {
        /// Client name
        name: String,
    },
    /// Show a client's certificate state without changing anything
    Status {
        /// Client name
        name: String,
    },
    /// Regenerate and publish the CRL
    Crl,
    /// Show version information
    Version,
}
