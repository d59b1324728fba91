//! Gateway configuration.
//!
//! Sources, highest precedence first: CLI flags, environment variables (via
//! clap's `env`), the optional YAML file given with `--config`, defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use streamgate_observability::LogConfig;

/// Which streams ledger the gateway fronts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process ledger; nothing leaves the process.
    #[default]
    Memory,
    /// JSON-RPC streams node at `rpc_url` / `streams_url`.
    Rpc,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Rpc => "rpc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub chain_id: u64,
    pub rpc_url: String,
    /// WebSocket endpoint for upstream subscriptions (`rpc` backend).
    pub streams_url: Option<String>,
    /// Address of the write identity.
    pub publisher: Option<String>,
    /// A signing key is present; writes are allowed even without a
    /// known publisher address. Never read from the YAML file.
    #[serde(skip)]
    pub signer_configured: bool,
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub remote_timeout_ms: u64,
    pub log: LogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            chain_id: 50312,
            rpc_url: "https://dream-rpc.somnia.network".into(),
            streams_url: None,
            publisher: None,
            signer_configured: false,
            data_dir: PathBuf::from("./data"),
            backend: Backend::Memory,
            remote_timeout_ms: 30_000,
            log: LogConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse a YAML document; absent keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing gateway config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Resolve the final configuration for a parsed command line.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(cli);
        Ok(config)
    }

    /// Overlay every flag or variable that was given.
    pub fn apply(&mut self, cli: &Cli) {
        if let Some(listen) = cli.listen {
            self.listen = listen;
        }
        if let Some(port) = cli.port {
            self.listen.set_port(port);
        }
        if let Some(chain_id) = cli.chain_id {
            self.chain_id = chain_id;
        }
        if let Some(url) = &cli.rpc_url {
            self.rpc_url = url.clone();
        }
        if let Some(url) = &cli.streams_url {
            self.streams_url = Some(url.clone());
        }
        if let Some(publisher) = &cli.publisher {
            self.publisher = Some(publisher.clone());
        }
        if cli.private_key.as_deref().is_some_and(|k| !k.is_empty()) {
            self.signer_configured = true;
        }
        if let Some(dir) = &cli.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(ms) = cli.remote_timeout_ms {
            self.remote_timeout_ms = ms;
        }
        if let Some(level) = &cli.log_level {
            self.log.level = level.clone();
        }
        if cli.log_json {
            self.log.json = true;
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    /// Whether set operations (publishing records) are permitted.
    pub fn has_wallet(&self) -> bool {
        self.publisher.is_some() || self.signer_configured
    }
}

#[derive(Debug, Default, Parser)]
#[command(
    name = "streamgate",
    about = "Schema registry and filtered event fan-out gateway for on-chain data streams",
    version
)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "STREAMGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Listen port; overrides the port of --listen
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// HTTP JSON-RPC endpoint of the streams node
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// WebSocket endpoint for upstream subscriptions
    #[arg(long, env = "STREAMS_URL")]
    pub streams_url: Option<String>,

    /// Address of the write identity
    #[arg(long, env = "PUBLISHER")]
    pub publisher: Option<String>,

    /// Signing key; only its presence is used, to enable writes
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Directory holding schemas.json and schemas.versions.json
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_enum, env = "STREAMGATE_BACKEND")]
    pub backend: Option<Backend>,

    /// Bound on every remote call, in milliseconds
    #[arg(long)]
    pub remote_timeout_ms: Option<u64>,

    /// Log level or filter directives, e.g. "info,streamgate_stream=debug"
    #[arg(long, env = "STREAMGATE_LOG")]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub log_json: bool,
}
