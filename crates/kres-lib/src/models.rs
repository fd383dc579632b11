//! Core data models for kres
//!
//! Raw quantity maps come in keyed by Kubernetes resource name
//! (`cpu`, `memory`, `ephemeral-storage`). They are converted once, at
//! construction, into canonical amounts. A resource missing from the raw
//! map is kept as `None` and contributes zero to any sum.

use crate::error::ReportError;
use crate::quantity::{memory_as_megabytes, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw quantities keyed by resource name, as reported by the API server
pub type RawQuantities = BTreeMap<String, String>;

/// Key of the ephemeral storage resource in node status maps
pub const EPHEMERAL_STORAGE: &str = "ephemeral-storage";

/// Node labels carried into the node inventory
pub const TRACKED_LABELS: [&str; 5] = [
    "application",
    "environment",
    "kubernetes.io/hostname",
    "node.kubernetes.io/instance-type",
    "topology.kubernetes.io/zone",
];

fn convert_field(
    node: &str,
    field: &'static str,
    kind: ResourceKind,
    raw: &RawQuantities,
) -> Result<Option<u64>, ReportError> {
    raw.get(kind.key())
        .map(|value| kind.convert(value))
        .transpose()
        .map_err(|source| ReportError::MalformedQuantity {
            node: node.to_string(),
            field,
            source,
        })
}

/// Canonical resource amounts: millicores for CPU, megabytes for memory and storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmounts {
    pub cpu: Option<u64>,
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_storage: Option<u64>,
}

impl ResourceAmounts {
    /// Amounts with both CPU and memory declared
    pub fn new(cpu: u64, memory: u64) -> Self {
        Self {
            cpu: Some(cpu),
            memory: Some(memory),
            ephemeral_storage: None,
        }
    }

    /// Convert a raw node status map (`allocatable` or `capacity`)
    pub fn from_raw(node: &str, field: &'static str, raw: &RawQuantities) -> Result<Self, ReportError> {
        let ephemeral_storage = raw
            .get(EPHEMERAL_STORAGE)
            .map(|value| memory_as_megabytes(value))
            .transpose()
            .map_err(|source| ReportError::MalformedQuantity {
                node: node.to_string(),
                field,
                source,
            })?;

        Ok(Self {
            cpu: convert_field(node, field, ResourceKind::Cpu, raw)?,
            memory: convert_field(node, field, ResourceKind::Memory, raw)?,
            ephemeral_storage,
        })
    }

    /// Amount for a resource kind, zero when undeclared
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.cpu.unwrap_or(0),
            ResourceKind::Memory => self.memory.unwrap_or(0),
        }
    }
}

/// Running request/limit sums over the containers of a node's running pods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodResourceTotals {
    pub requests: ResourceAmounts,
    pub limits: ResourceAmounts,
}

impl PodResourceTotals {
    pub fn new() -> Self {
        Self {
            requests: ResourceAmounts::new(0, 0),
            limits: ResourceAmounts::new(0, 0),
        }
    }

    /// Fold one container's declared requests and limits into the totals
    ///
    /// Only `cpu` and `memory` are summed. A container that declares
    /// neither contributes nothing.
    pub fn add_container(
        &mut self,
        node: &str,
        requests: Option<&RawQuantities>,
        limits: Option<&RawQuantities>,
    ) -> Result<(), ReportError> {
        if let Some(raw) = requests {
            add_declared(&mut self.requests, node, "requests", raw)?;
        }
        if let Some(raw) = limits {
            add_declared(&mut self.limits, node, "limits", raw)?;
        }
        Ok(())
    }
}

impl Default for PodResourceTotals {
    fn default() -> Self {
        Self::new()
    }
}

fn add_declared(
    totals: &mut ResourceAmounts,
    node: &str,
    field: &'static str,
    raw: &RawQuantities,
) -> Result<(), ReportError> {
    if let Some(cpu) = convert_field(node, field, ResourceKind::Cpu, raw)? {
        totals.cpu = Some(totals.cpu.unwrap_or(0) + cpu);
    }
    if let Some(memory) = convert_field(node, field, ResourceKind::Memory, raw)? {
        totals.memory = Some(totals.memory.unwrap_or(0) + memory);
    }
    Ok(())
}

/// Addresses reported in node status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddresses {
    pub internal_ip: Option<String>,
    pub hostname: Option<String>,
}

/// Static description of a node: addresses, labels, capacity and allocatable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub addresses: NodeAddresses,
    pub allocatable: ResourceAmounts,
    pub capacity: ResourceAmounts,
    pub labels: BTreeMap<String, String>,
}

impl NodeInfo {
    /// Build from raw node status, keeping only the tracked labels
    pub fn from_raw(
        name: impl Into<String>,
        addresses: NodeAddresses,
        allocatable: &RawQuantities,
        capacity: &RawQuantities,
        labels: &BTreeMap<String, String>,
    ) -> Result<Self, ReportError> {
        let name = name.into();
        let labels = labels
            .iter()
            .filter(|(key, _)| TRACKED_LABELS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            allocatable: ResourceAmounts::from_raw(&name, "allocatable", allocatable)?,
            capacity: ResourceAmounts::from_raw(&name, "capacity", capacity)?,
            name,
            addresses,
            labels,
        })
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Live utilisation sample from the metrics API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilisation {
    pub cpu: Option<u64>,
    pub memory: Option<u64>,
    pub window: String,
    pub timestamp: String,
}

impl Utilisation {
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.cpu.unwrap_or(0),
            ResourceKind::Memory => self.memory.unwrap_or(0),
        }
    }
}

/// Per-node utilisation plus summed pod requests and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUsage {
    pub name: String,
    pub utilisation: Utilisation,
    pub requests: ResourceAmounts,
    pub limits: ResourceAmounts,
}

impl NodeUsage {
    /// Build from a raw metrics usage map and the node's pod totals
    pub fn from_raw(
        name: impl Into<String>,
        usage: &RawQuantities,
        window: impl Into<String>,
        timestamp: impl Into<String>,
        pods: PodResourceTotals,
    ) -> Result<Self, ReportError> {
        let name = name.into();
        let utilisation = Utilisation {
            cpu: convert_field(&name, "usage", ResourceKind::Cpu, usage)?,
            memory: convert_field(&name, "usage", ResourceKind::Memory, usage)?,
            window: window.into(),
            timestamp: timestamp.into(),
        };

        Ok(Self {
            name,
            utilisation,
            requests: pods.requests,
            limits: pods.limits,
        })
    }
}
