//! Configuration resolution: built-in defaults, then an `ORC_CONFIG` file, then
//! `ORC_*` environment variables, then command-line flags — each layer overriding only
//! the fields it sets, ascending precedence.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct MinionConfig {
    pub id: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub minions: Vec<MinionConfig>,
    pub resync: Duration,
    pub request_timeout: Duration,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            minions: Vec::new(),
            resync: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn resolve() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let mut config = Config::default();

        let config_path = cli.config.clone().or_else(|| std::env::var("ORC_CONFIG").ok().map(PathBuf::from));
        if let Some(path) = config_path {
            apply_partial(&mut config, load_file(&path)?)?;
        }
        apply_partial(&mut config, load_env())?;
        apply_partial(&mut config, cli.into_partial()?)?;
        Ok(config)
    }
}

/// The subset of [`Config`] a single layer may override; `None` defers to the layer
/// beneath it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialConfig {
    bind_addr: Option<String>,
    minions: Option<Vec<PartialMinion>>,
    resync_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
    log_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartialMinion {
    id: String,
    address: String,
}

#[derive(Debug, Parser)]
#[command(name = "orc-server", about = "Cluster orchestrator control plane")]
struct Cli {
    /// Path to a JSON or YAML config file; equivalent to setting ORC_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind_addr: Option<String>,
    /// `id=address`, repeatable.
    #[arg(long = "minion")]
    minions: Vec<String>,
    #[arg(long)]
    resync_seconds: Option<u64>,
    #[arg(long)]
    request_timeout_seconds: Option<u64>,
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn into_partial(self) -> anyhow::Result<PartialConfig> {
        let minions = if self.minions.is_empty() {
            None
        } else {
            Some(self.minions.iter().map(|raw| parse_minion(raw)).collect::<anyhow::Result<Vec<_>>>()?)
        };
        Ok(PartialConfig {
            bind_addr: self.bind_addr,
            minions,
            resync_seconds: self.resync_seconds,
            request_timeout_seconds: self.request_timeout_seconds,
            log_filter: self.log_filter,
        })
    }
}

fn apply_partial(config: &mut Config, partial: PartialConfig) -> anyhow::Result<()> {
    if let Some(addr) = partial.bind_addr {
        config.bind_addr = addr.parse()?;
    }
    if let Some(minions) = partial.minions {
        config.minions = minions.into_iter().map(|m| MinionConfig { id: m.id, address: m.address }).collect();
    }
    if let Some(secs) = partial.resync_seconds {
        config.resync = Duration::from_secs(secs);
    }
    if let Some(secs) = partial.request_timeout_seconds {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(filter) = partial.log_filter {
        config.log_filter = filter;
    }
    Ok(())
}

fn load_file(path: &Path) -> anyhow::Result<PartialConfig> {
    let raw = std::fs::read_to_string(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Ok(serde_json::from_str(&raw)?)
    } else {
        Ok(serde_yaml::from_str(&raw)?)
    }
}

fn load_env() -> PartialConfig {
    let mut partial = PartialConfig::default();
    if let Ok(addr) = std::env::var("ORC_BIND_ADDR") {
        partial.bind_addr = Some(addr);
    }
    if let Ok(raw) = std::env::var("ORC_MINIONS") {
        partial.minions = raw.split(',').map(parse_minion).collect::<anyhow::Result<Vec<_>>>().ok();
    }
    if let Ok(secs) = std::env::var("ORC_RESYNC_SECONDS") {
        partial.resync_seconds = secs.parse().ok();
    }
    if let Ok(secs) = std::env::var("ORC_REQUEST_TIMEOUT_SECONDS") {
        partial.request_timeout_seconds = secs.parse().ok();
    }
    if let Ok(filter) = std::env::var("ORC_LOG") {
        partial.log_filter = Some(filter);
    }
    partial
}

fn parse_minion(raw: impl AsRef<str>) -> anyhow::Result<PartialMinion> {
    let raw = raw.as_ref();
    let (id, address) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid minion entry {raw:?}, expected id=address"))?;
    Ok(PartialMinion {
        id: id.to_string(),
        address: address.to_string(),
    })
}
