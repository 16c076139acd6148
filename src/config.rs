use std::path::PathBuf;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use clap::Parser;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::nodes::Target;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub namespace: String,
    pub service: String,
    pub nodes_file: PathBuf,
    pub peer_port: u16,
    pub api_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    pub sort_nodes: bool,
    pub skip_unchanged: bool,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: "typesense".into(),
            service: "ts".into(),
            nodes_file: "/usr/share/typesense/nodes".into(),
            peer_port: 8107,
            api_port: 8108,
            kubeconfig: None,
            sort_nodes: true,
            skip_unchanged: true,
            reconnect_initial_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

/// Command line overrides. Only flags that are given take part in the merge.
#[derive(Debug, Default, Parser, Serialize)]
#[command(version, about = "Keeps a Typesense nodes file in sync with Kubernetes endpoints")]
pub struct Args {
    /// The namespace that Typesense is installed within
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// The name of the Typesense service to use the endpoints of
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// The location of the file to write node information to
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes_file: Option<PathBuf>,

    /// Port on which the Typesense peering service listens
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_port: Option<u16>,

    /// Port on which the Typesense API service listens
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_port: Option<u16>,

    /// Explicit kubeconfig; inferred from the environment when omitted
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Sort node entries so identical membership renders identically
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_nodes: Option<bool>,

    /// Skip rewriting the nodes file when the list is unchanged
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_unchanged: Option<bool>,
}

impl Config {
    pub fn load(args: Args) -> anyhow::Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("nodes-sync.toml"))
            .merge(Json::file("nodes-sync.json"))
            .merge(Env::prefixed("NODES_SYNC_"))
            .merge(Serialized::defaults(args))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.service.is_empty() {
            anyhow::bail!("Invalid configuration: service must not be empty");
        }
        if self.nodes_file.as_os_str().is_empty() {
            anyhow::bail!("Invalid configuration: nodes_file must not be empty");
        }
        if self.reconnect_initial_ms > self.reconnect_max_ms {
            anyhow::bail!(
                "Invalid configuration: reconnect_initial_ms ({}) exceeds reconnect_max_ms ({})",
                self.reconnect_initial_ms,
                self.reconnect_max_ms
            );
        }
        Ok(())
    }

    pub fn target(&self) -> Target {
        Target {
            service: self.service.clone(),
            peer_port: self.peer_port,
            api_port: self.api_port,
        }
    }

    /// Delay policy between watch subscriptions. Never gives up.
    pub fn reconnect_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.reconnect_initial_ms))
            .with_max_interval(Duration::from_millis(self.reconnect_max_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.5)
            .with_max_elapsed_time(None)
            .build()
    }
}
