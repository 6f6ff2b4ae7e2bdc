//! Flag groups shared by deployctl commands.

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{ArgAction, Args, Command};

use crate::io::context_store::ServerConfig;

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalFlags {
    /// Plain output: no decoration.
    #[arg(long, global = true)]
    pub plain: bool,

    /// App to target. Required by single-app commands when the project
    /// declares several apps.
    #[arg(short = 'a', long, global = true)]
    pub app: Option<String>,

    /// Project to target.
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,

    /// Workspace to operate in.
    #[arg(short = 'w', long, global = true)]
    pub workspace: Option<String>,
}

/// Flags shared by operations (anything that dispatches work).
#[derive(Args, Debug, Clone, Default)]
pub struct OperationFlags {
    /// Label to set for this operation (`key=value`, repeatable).
    #[arg(long = "label", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub labels: Vec<(String, String)>,

    /// Execute on a remote runner.
    #[arg(long)]
    pub remote: bool,

    /// Override how remote runners source data, e.g. `ref=main` (repeatable).
    #[arg(long = "remote-source", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub remote_source: Vec<(String, String)>,

    /// Variable value for this operation (`name=value`, repeatable).
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// TOML or JSON file with variable values (repeatable). Files named
    /// `*.auto.vars.toml` or `*.auto.vars.json` next to deployctl.toml are
    /// loaded automatically.
    #[arg(long = "var-file", value_name = "PATH")]
    pub var_files: Vec<PathBuf>,
}

/// Manual connection settings.
#[derive(Args, Debug, Clone)]
pub struct ConnectionFlags {
    /// Address for the server.
    #[arg(long = "server-addr", value_name = "ADDR")]
    pub server_addr: Option<String>,

    /// Connect to the server via TLS.
    #[arg(long = "server-tls", default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub server_tls: bool,

    /// Skip verification of the server's TLS certificate.
    #[arg(long = "server-tls-skip-verify")]
    pub server_tls_skip_verify: bool,
}

impl Default for ConnectionFlags {
    fn default() -> Self {
        Self {
            server_addr: None,
            server_tls: true,
            server_tls_skip_verify: false,
        }
    }
}

impl ConnectionFlags {
    /// Server settings given on the command line, if an address was set.
    pub fn server(&self) -> Option<ServerConfig> {
        let address = self.server_addr.as_deref()?.trim();
        if address.is_empty() {
            return None;
        }
        Some(ServerConfig {
            address: address.to_string(),
            tls: self.server_tls,
            tls_skip_verify: self.server_tls_skip_verify,
        })
    }
}

/// Parse `key=value`. The value may be empty or contain further `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("key must not be empty in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Every flag name `cmd` accepts (long names, aliases and short names,
/// without hyphens), including flags declared on `parent`.
pub fn recognized_flag_names(parent: &Command, cmd: &Command) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for arg in parent.get_arguments().chain(cmd.get_arguments()) {
        if arg.is_positional() {
            continue;
        }
        if let Some(long) = arg.get_long() {
            names.insert(long.to_string());
        }
        if let Some(short) = arg.get_short() {
            names.insert(short.to_string());
        }
        for alias in arg.get_all_aliases().unwrap_or_default() {
            names.insert(alias.to_string());
        }
        for alias in arg.get_all_short_aliases().unwrap_or_default() {
            names.insert(alias.to_string());
        }
    }
    names
}
