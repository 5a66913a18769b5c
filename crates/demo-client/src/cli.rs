use anyhow::Context;
use clap::{Parser, Subcommand};
use fs_client_sdk::{ClientConfig, PageLocation};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "FS_CONFIG";

/// fs-client — headless sender/receiver page for the file streamer.
#[derive(Debug, Parser)]
#[command(name = "fs-client", version, about)]
pub struct Cli {
    /// Page address to act as (e.g. `http://host:8080/?id=<sender>`).
    /// Falls back to `FS_PAGE_URL`.
    #[arg(long, global = true)]
    pub page_url: Option<String>,

    /// Emit logs as JSON instead of compact text.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and stay connected until Ctrl-C (default).
    Connect,
    /// Print the resolved role and endpoint, then exit.
    Role,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `FS_CONFIG` (or
/// `fs-client.toml` by default).  A missing file means defaults.
pub fn load_config() -> anyhow::Result<(ClientConfig, String)> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "fs-client.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {config_path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing {config_path}"))?
    } else {
        ClientConfig::default()
    };

    Ok((config, config_path))
}

/// The page address from `--page-url`, else `FS_PAGE_URL`.  Without one
/// the client cannot tell which role it plays, so this is fatal.
pub fn page_location(flag: Option<&str>) -> anyhow::Result<PageLocation> {
    let location = match flag {
        Some(raw) => PageLocation::parse(raw)?,
        None => PageLocation::from_env()?,
    };
    Ok(location)
}
