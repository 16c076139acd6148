//! Watch-driven reconciliation loop.
//!
//! Every notification from the endpoint watch triggers one full pass:
//! list the namespace, rebuild the node list, write the nodes file. Passes
//! run one at a time and a failing pass never stops the loop. When the
//! subscription ends the loop waits out an exponential backoff and
//! subscribes again.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::time::sleep;

use crate::config::Config;
use crate::error::ReconcileError;
use crate::membership::{MembershipSource, Notifications};
use crate::nodes::{NodeList, Target};
use crate::persist::{NodesFile, Written};
use crate::types::Change;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Written { nodes: usize },
    Unchanged { nodes: usize },
}

pub struct Reconciler<M> {
    source: M,
    target: Target,
    sort_nodes: bool,
    nodes_file: NodesFile,
    backoff: ExponentialBackoff,
    max_delay: Duration,
}

impl<M: MembershipSource> Reconciler<M> {
    pub fn new(source: M, config: &Config) -> Self {
        Self {
            source,
            target: config.target(),
            sort_nodes: config.sort_nodes,
            nodes_file: NodesFile::new(&config.nodes_file, config.skip_unchanged),
            backoff: config.reconnect_backoff(),
            max_delay: Duration::from_millis(config.reconnect_max_ms),
        }
    }

    /// Subscribes, consumes, and re-subscribes forever.
    pub async fn run(&mut self) {
        loop {
            match self.source.watch().await {
                Ok(notifications) => {
                    let handled = self.consume(notifications).await;
                    if handled > 0 {
                        self.backoff.reset();
                    }
                    warn!("Endpoint watch ended after {} notifications", handled);
                }
                Err(e) => {
                    error!("Failed to open endpoint watch: {}", e);
                }
            }

            let delay = self.backoff.next_backoff().unwrap_or(self.max_delay);
            info!("Re-subscribing to endpoint watch in {:?}", delay);
            sleep(delay).await;
        }
    }

    /// Runs one pass per notification until the subscription ends. Returns
    /// the number of notifications handled; bookmarks are skipped and not
    /// counted.
    pub async fn consume(&mut self, mut notifications: Notifications) -> usize {
        let mut handled = 0;
        while let Some(item) = notifications.next().await {
            let change = match item {
                Ok(change) => change,
                Err(e) => {
                    error!("Endpoint watch failed: {}", e);
                    break;
                }
            };

            match &change {
                // Resource version checkpoints, not membership changes.
                Change::Bookmark => {
                    debug!("Skipping endpoint watch bookmark");
                    continue;
                }
                Change::Error(message) => warn!("Endpoint watch reported: {}", message),
                change => debug!("Endpoint change: {}", change),
            }
            handled += 1;

            match self.reconcile().await {
                Ok(PassOutcome::Written { nodes }) => {
                    debug!("Wrote {} nodes to {}", nodes, self.nodes_file.path().display());
                }
                Ok(PassOutcome::Unchanged { nodes }) => {
                    debug!("Node list unchanged ({} nodes)", nodes);
                }
                Err(e) => {
                    error!("Reconciliation pass failed: {}", e);
                }
            }
        }
        handled
    }

    /// A single list, build, persist pass.
    pub async fn reconcile(&mut self) -> Result<PassOutcome, ReconcileError> {
        let snapshot = self.source.list().await?;

        let mut nodes = NodeList::from_snapshot(&snapshot, &self.target);
        if self.sort_nodes {
            nodes = nodes.sorted();
        }
        let content = nodes.to_string();

        match self.nodes_file.write(&content)? {
            Written::Updated => {
                if nodes.is_empty() {
                    info!("No {} endpoints found, cleared node configuration", self.target.service);
                } else {
                    info!("New {} node configuration: {}", nodes.len(), content);
                }
                Ok(PassOutcome::Written { nodes: nodes.len() })
            }
            Written::Unchanged => Ok(PassOutcome::Unchanged { nodes: nodes.len() }),
        }
    }
}
