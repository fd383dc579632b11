//! Kubernetes API client
//!
//! Resolves the kube-config context, then lists nodes, node metrics and
//! running pods. Everything is fetched sequentially, one node at a time.

use anyhow::{bail, Context, Result};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, ResourceExt};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use kres_lib::{NodeAddresses, NodeInfo, NodeUsage, PodResourceTotals, RawQuantities};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Node usage sample from `metrics.k8s.io/v1beta1`
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct NodeMetrics {
    pub metadata: ObjectMeta,
    pub timestamp: String,
    pub window: String,
    pub usage: BTreeMap<String, Quantity>,
}

impl k8s_openapi::Resource for NodeMetrics {
    type Scope = k8s_openapi::ClusterResourceScope;

    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "NodeMetrics";
    const URL_PATH_SEGMENT: &'static str = "nodes";
    const VERSION: &'static str = "v1beta1";
}

impl k8s_openapi::Metadata for NodeMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

/// Which cluster a run talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTarget {
    /// Requested context, or the cluster of the current context
    pub name: String,
    /// Cluster of the kube-config's current context
    pub active: String,
}

impl ClusterTarget {
    pub fn is_overridden(&self) -> bool {
        self.name != self.active
    }
}

/// Resolve the cluster name and check that a requested context exists
pub fn resolve_target(kubeconfig: &Kubeconfig, context: Option<&str>) -> Result<ClusterTarget> {
    if kubeconfig.contexts.is_empty() {
        bail!("Cannot find any context in kube-config file");
    }

    let active = kubeconfig
        .current_context
        .as_deref()
        .and_then(|current| kubeconfig.contexts.iter().find(|c| c.name == current))
        .and_then(|named| named.context.as_ref())
        .map(|ctx| ctx.cluster.clone())
        .unwrap_or_else(|| "default".to_string());

    let name = match context {
        Some(requested) => {
            if !kubeconfig.contexts.iter().any(|c| c.name == requested) {
                bail!("Cannot find \"{}\" context in kube-config file", requested);
            }
            requested.to_string()
        }
        None => active.clone(),
    };

    Ok(ClusterTarget { name, active })
}

fn raw_quantities(map: Option<&BTreeMap<String, Quantity>>) -> RawQuantities {
    map.map(|quantities| {
        quantities
            .iter()
            .map(|(key, quantity)| (key.clone(), quantity.0.clone()))
            .collect()
    })
    .unwrap_or_default()
}

fn list_params(label_selector: &str) -> ListParams {
    let params = ListParams::default();
    if label_selector.is_empty() {
        params
    } else {
        params.labels(label_selector)
    }
}

/// Convert a `Node` object into the report's node description
pub fn node_info(node: &Node) -> Result<NodeInfo> {
    let name = node.name_any();
    let status = node.status.as_ref();

    let mut addresses = NodeAddresses::default();
    for address in status.and_then(|s| s.addresses.as_ref()).into_iter().flatten() {
        match address.type_.as_str() {
            "InternalIP" => addresses.internal_ip = Some(address.address.clone()),
            "Hostname" => addresses.hostname = Some(address.address.clone()),
            _ => {}
        }
    }

    let allocatable = raw_quantities(status.and_then(|s| s.allocatable.as_ref()));
    let capacity = raw_quantities(status.and_then(|s| s.capacity.as_ref()));
    let labels = node.metadata.labels.clone().unwrap_or_default();

    Ok(NodeInfo::from_raw(name, addresses, &allocatable, &capacity, &labels)?)
}

/// Sum container requests and limits over a set of pods
pub fn pod_totals(node: &str, pods: &[Pod]) -> Result<PodResourceTotals> {
    let mut totals = PodResourceTotals::new();

    for pod in pods {
        let Some(spec) = pod.spec.as_ref() else {
            continue;
        };
        for container in &spec.containers {
            let resources = container.resources.as_ref();
            let requests = resources
                .and_then(|r| r.requests.as_ref())
                .map(|q| raw_quantities(Some(q)));
            let limits = resources
                .and_then(|r| r.limits.as_ref())
                .map(|q| raw_quantities(Some(q)));

            totals.add_container(node, requests.as_ref(), limits.as_ref())?;
        }
    }

    Ok(totals)
}

/// Kubernetes client bound to one kube-config context
pub struct KubeClient {
    client: Client,
    target: ClusterTarget,
}

impl KubeClient {
    /// Read the kube-config, resolve the context and build a client
    pub async fn connect(kubeconfig_path: &Path, context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(kubeconfig_path).with_context(|| {
            format!("Failed to read kube-config file {}", kubeconfig_path.display())
        })?;

        let target = resolve_target(&kubeconfig, context)?;

        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .context("Failed to load kube-config")?;
        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        info!(cluster = %target.name, "Kubernetes client configured");
        Ok(Self { client, target })
    }

    pub fn target(&self) -> &ClusterTarget {
        &self.target
    }

    /// List nodes matching the label selector
    pub async fn list_nodes(&self, label_selector: &str) -> Result<Vec<NodeInfo>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&list_params(label_selector))
            .await
            .context("Failed to list nodes")?;

        debug!(count = nodes.items.len(), "Listed nodes");
        nodes.items.iter().map(node_info).collect()
    }

    /// List node utilisation with summed pod requests and limits
    pub async fn list_node_usage(&self, label_selector: &str) -> Result<Vec<NodeUsage>> {
        let api: Api<NodeMetrics> = Api::all(self.client.clone());
        let metrics = api
            .list(&list_params(label_selector))
            .await
            .context("Failed to list node metrics, is metrics-server installed?")?;

        let mut usage = Vec::with_capacity(metrics.items.len());
        for item in &metrics.items {
            let name = item.name_any();
            let pods = self.running_pods(&name).await?;
            let totals = pod_totals(&name, &pods)?;

            debug!(node = %name, pods = pods.len(), "Summed pod requests and limits");
            usage.push(NodeUsage::from_raw(
                name,
                &raw_quantities(Some(&item.usage)),
                &item.window,
                &item.timestamp,
                totals,
            )?);
        }

        Ok(usage)
    }

    async fn running_pods(&self, node: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&format!("spec.nodeName={},status.phase=Running", node));
        let pods = api
            .list(&params)
            .await
            .with_context(|| format!("Failed to list pods on node {}", node))?;

        Ok(pods.items)
    }
}
