use std::path::Path;

use async_trait::async_trait;
use futures_util::stream::StreamExt;
use k8s_openapi::api::core::v1::Endpoints;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use log::{debug, info};

use super::{MembershipSource, Notifications};
use crate::error::MembershipError;
use crate::types::{Change, EndpointResource, EndpointSnapshot};

/// Membership backed by the core/v1 `Endpoints` resources of one namespace.
pub struct KubeMembership {
    api: Api<Endpoints>,
    namespace: String,
}

impl KubeMembership {
    /// Builds a client from `kubeconfig` when given, otherwise from the
    /// local kubeconfig with a fallback to the in-cluster environment.
    pub async fn connect(
        namespace: &str,
        kubeconfig: Option<&Path>,
    ) -> Result<Self, MembershipError> {
        let config = match kubeconfig {
            Some(path) => {
                info!("Loading cluster access config from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
            }
            None => Config::infer().await?,
        };
        debug!("Using API server {}", config.cluster_url);

        let client = Client::try_from(config)?;
        Ok(Self::new(client, namespace))
    }

    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl MembershipSource for KubeMembership {
    async fn list(&self) -> Result<EndpointSnapshot, MembershipError> {
        let endpoints = self.api.list(&ListParams::default()).await?;
        Ok(endpoints
            .items
            .into_iter()
            .map(EndpointResource::from)
            .collect())
    }

    async fn watch(&self) -> Result<Notifications, MembershipError> {
        // Version "0" replays current objects as Added events, so the first
        // pass runs right after subscribing.
        let stream = self.api.watch(&watch_params(), "0").await?;
        info!("Watching endpoints in namespace {}", self.namespace);

        Ok(stream
            .map(|event| event.map(change_from_event).map_err(MembershipError::Stream))
            .boxed())
    }
}

/// Bookmarks are periodic resource version checkpoints; they carry no
/// membership change, so they are not requested.
fn watch_params() -> WatchParams {
    WatchParams::default().disable_bookmarks()
}

fn change_from_event(event: WatchEvent<Endpoints>) -> Change {
    match event {
        WatchEvent::Added(endpoints) => Change::Added(endpoints.name_any()),
        WatchEvent::Modified(endpoints) => Change::Modified(endpoints.name_any()),
        WatchEvent::Deleted(endpoints) => Change::Deleted(endpoints.name_any()),
        WatchEvent::Bookmark(_) => Change::Bookmark,
        WatchEvent::Error(e) => Change::Error(format!("{} ({}: {})", e.message, e.code, e.reason)),
    }
}
