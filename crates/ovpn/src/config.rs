//! Settings resolution.
//!
//! Precedence: command line / environment, then the optional TOML file,
//! then built-in defaults (`/data/openvpn/server`, `/data/openvpn/clients`).

use std::path::{Path, PathBuf};

use anyhow::Context;
use ovpn_clients::{CnMatch, ManagerConfig};
use serde::Deserialize;

use crate::cli::Cli;

/// Contents of the TOML config file.
///
/// ```toml
/// [openvpn]
/// base_dir = "/etc/openvpn/server"
/// output_dir = "/etc/openvpn/clients"
/// days = 825
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub openvpn: OpenVpnSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenVpnSection {
    pub base_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub easyrsa: Option<PathBuf>,
    pub days: Option<u32>,
    pub strict_cn_match: Option<bool>,
    pub audit_log: Option<PathBuf>,
}

pub fn load_file(path: &Path) -> anyhow::Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Build the manager configuration from CLI flags and the config file
/// named by `--config`, if any.
pub fn from_cli(cli: &Cli) -> anyhow::Result<ManagerConfig> {
    let file = match &cli.config {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };
    Ok(merge(cli, file.openvpn))
}

fn merge(cli: &Cli, file: OpenVpnSection) -> ManagerConfig {
    let defaults = ManagerConfig::default();
    let strict = cli.strict_cn_match || file.strict_cn_match.unwrap_or(false);

    ManagerConfig {
        base_dir: cli
            .base_dir
            .clone()
            .or(file.base_dir)
            .unwrap_or(defaults.base_dir),
        output_dir: cli
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or(defaults.output_dir),
        easyrsa_program: cli
            .easyrsa
            .clone()
            .or(file.easyrsa)
            .unwrap_or(defaults.easyrsa_program),
        validity_days: cli.days.or(file.days).unwrap_or(defaults.validity_days),
        cn_match: if strict {
            CnMatch::Anchored
        } else {
            CnMatch::Substring
        },
        audit_log: cli.audit_log.clone().or(file.audit_log),
    }
}
