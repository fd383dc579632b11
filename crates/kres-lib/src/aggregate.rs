//! Resource aggregation
//!
//! Folds per-node usage into per-node statistics and two cluster-wide
//! running totals (cpu, memory). Ratios only exist on a finalized
//! [`ResourceStat`]: a [`ResourceTotals`] accumulator has no way to expose
//! partial percentages, so they cannot be read before every node is folded.

use crate::error::{ReportError, Scope};
use crate::models::{NodeInfo, NodeUsage};
use crate::quantity::ResourceKind;
use serde::Serialize;
use std::collections::HashMap;
use std::iter::Sum;
use std::ops::Add;
use tracing::{debug, info, warn};

/// Running sums for one resource kind, in canonical units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceTotals {
    pub alloc: u64,
    pub req: u64,
    pub lim: u64,
    pub util: u64,
}

impl ResourceTotals {
    /// Totals for one resource kind of a single node
    pub fn for_node(kind: ResourceKind, info: &NodeInfo, usage: &NodeUsage) -> Self {
        Self {
            alloc: info.allocatable.get(kind),
            req: usage.requests.get(kind),
            lim: usage.limits.get(kind),
            util: usage.utilisation.get(kind),
        }
    }

    /// Derive ratios. Consumes the accumulator, so totals are final.
    pub fn finalize(self, resource: ResourceKind, scope: &Scope) -> Result<ResourceStat, ReportError> {
        let ratios = Ratios::compute(&self, resource, scope)?;
        Ok(ResourceStat {
            resource,
            totals: self,
            ratios,
        })
    }
}

impl Add for ResourceTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            alloc: self.alloc + other.alloc,
            req: self.req + other.req,
            lim: self.lim + other.lim,
            util: self.util + other.util,
        }
    }
}

impl Sum for ResourceTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Percentages derived from a complete set of totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ratios {
    pub req_per_alloc: f64,
    pub lim_per_alloc: f64,
    pub util_per_alloc: f64,
    pub util_per_req: f64,
    pub util_per_lim: f64,
}

fn percent(
    numerator: u64,
    denominator: u64,
    scope: &Scope,
    resource: ResourceKind,
    ratio: &'static str,
    denominator_name: &'static str,
) -> Result<f64, ReportError> {
    if denominator == 0 {
        return Err(ReportError::undefined(scope, resource, ratio, denominator_name));
    }
    Ok(numerator as f64 / denominator as f64 * 100.0)
}

impl Ratios {
    /// Compute all five ratios, failing on the first zero denominator
    pub fn compute(totals: &ResourceTotals, resource: ResourceKind, scope: &Scope) -> Result<Self, ReportError> {
        let t = totals;
        Ok(Self {
            req_per_alloc: percent(t.req, t.alloc, scope, resource, "req/alloc", "allocatable")?,
            lim_per_alloc: percent(t.lim, t.alloc, scope, resource, "lim/alloc", "allocatable")?,
            util_per_alloc: percent(t.util, t.alloc, scope, resource, "util/alloc", "allocatable")?,
            util_per_req: percent(t.util, t.req, scope, resource, "util/req", "requests")?,
            util_per_lim: percent(t.util, t.lim, scope, resource, "util/lim", "limits")?,
        })
    }
}

/// Finalized statistics for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceStat {
    #[serde(skip)]
    pub resource: ResourceKind,
    #[serde(flatten)]
    pub totals: ResourceTotals,
    #[serde(flatten)]
    pub ratios: Ratios,
}

/// Cluster-wide statistics for one resource kind
pub type AggregateStat = ResourceStat;

impl ResourceStat {
    /// How far requests overshoot utilisation, relative to utilisation:
    /// `(req_per_alloc - util_per_alloc) / util_per_alloc * 100`
    pub fn performance_delta(&self) -> Result<f64, ReportError> {
        if self.ratios.util_per_alloc == 0.0 {
            return Err(ReportError::undefined(
                &Scope::Cluster,
                self.resource,
                "requests performance",
                "utilisation",
            ));
        }
        Ok((self.ratios.req_per_alloc - self.ratios.util_per_alloc) / self.ratios.util_per_alloc * 100.0)
    }
}

/// Statistics for a single node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStat {
    pub name: String,
    pub cpu: ResourceStat,
    pub memory: ResourceStat,
}

impl NodeStat {
    fn new(name: &str, cpu: ResourceTotals, memory: ResourceTotals) -> Result<Self, ReportError> {
        let scope = Scope::Node(name.to_string());
        Ok(Self {
            name: name.to_string(),
            cpu: cpu.finalize(ResourceKind::Cpu, &scope)?,
            memory: memory.finalize(ResourceKind::Memory, &scope)?,
        })
    }
}

/// Result of one report run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Per-node statistics, in the order nodes were supplied
    pub rows: Vec<NodeStat>,
    pub cpu: AggregateStat,
    pub memory: AggregateStat,
}

#[derive(Default)]
struct Accumulator {
    rows: Vec<NodeStat>,
    cpu: ResourceTotals,
    memory: ResourceTotals,
}

/// Build per-node statistics and finalized cluster totals
///
/// `usage` drives the iteration: one row per entry, in order. Every entry
/// must have a matching `NodeInfo` by name. Listed nodes without a usage
/// entry are left out of rows and totals, with a warning. Any zero
/// denominator, per node or cluster-wide, aborts the whole run.
pub fn build_report(nodes: &[NodeInfo], usage: &[NodeUsage]) -> Result<Report, ReportError> {
    if usage.is_empty() {
        return Err(ReportError::EmptySelection);
    }

    let index: HashMap<&str, &NodeInfo> = nodes.iter().map(|node| (node.name.as_str(), node)).collect();

    let acc = usage.iter().try_fold(Accumulator::default(), |mut acc, node_usage| {
        let info = index
            .get(node_usage.name.as_str())
            .ok_or_else(|| ReportError::UnknownNode(node_usage.name.clone()))?;

        let cpu = ResourceTotals::for_node(ResourceKind::Cpu, info, node_usage);
        let memory = ResourceTotals::for_node(ResourceKind::Memory, info, node_usage);

        acc.rows.push(NodeStat::new(&node_usage.name, cpu, memory)?);
        acc.cpu = acc.cpu + cpu;
        acc.memory = acc.memory + memory;

        debug!(node = %node_usage.name, cpu_alloc = cpu.alloc, memory_alloc = memory.alloc, "Folded node into cluster totals");
        Ok::<_, ReportError>(acc)
    })?;

    let cpu = acc.cpu.finalize(ResourceKind::Cpu, &Scope::Cluster)?;
    let memory = acc.memory.finalize(ResourceKind::Memory, &Scope::Cluster)?;

    for node in nodes {
        if !usage.iter().any(|u| u.name == node.name) {
            warn!(node = %node.name, "Node has no metrics sample, skipped");
        }
    }

    info!(
        nodes = acc.rows.len(),
        cpu_util_per_alloc = cpu.ratios.util_per_alloc,
        memory_util_per_alloc = memory.ratios.util_per_alloc,
        "Report built"
    );

    Ok(Report {
        rows: acc.rows,
        cpu,
        memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeAddresses, ResourceAmounts, Utilisation};
    use std::collections::BTreeMap;

    fn node(name: &str, cpu: u64, memory: u64) -> NodeInfo {
        NodeInfo {
            name: name.to_string(),
            addresses: NodeAddresses::default(),
            allocatable: ResourceAmounts::new(cpu, memory),
            capacity: ResourceAmounts::new(cpu, memory),
            labels: BTreeMap::new(),
        }
    }

    fn usage(name: &str, util: (u64, u64), req: (u64, u64), lim: (u64, u64)) -> NodeUsage {
        NodeUsage {
            name: name.to_string(),
            utilisation: Utilisation {
                cpu: Some(util.0),
                memory: Some(util.1),
                window: "30s".to_string(),
                timestamp: "2024-05-01T10:00:00Z".to_string(),
            },
            requests: ResourceAmounts::new(req.0, req.1),
            limits: ResourceAmounts::new(lim.0, lim.1),
        }
    }

    fn two_node_cluster() -> (Vec<NodeInfo>, Vec<NodeUsage>) {
        let nodes = vec![node("node-a", 2000, 8192), node("node-b", 4000, 16384)];
        let usage = vec![
            usage("node-a", (500, 2048), (1000, 4096), (1500, 6144)),
            usage("node-b", (1000, 4096), (2000, 8192), (3000, 12288)),
        ];
        (nodes, usage)
    }

    #[test]
    fn test_two_node_cluster_totals() {
        let (nodes, usage) = two_node_cluster();
        let report = build_report(&nodes, &usage).unwrap();

        assert_eq!(
            report.cpu.totals,
            ResourceTotals {
                alloc: 6000,
                req: 3000,
                lim: 4500,
                util: 1500,
            }
        );
        assert_eq!(report.cpu.ratios.util_per_alloc, 25.0);
        assert_eq!(report.cpu.ratios.req_per_alloc, 50.0);
        assert_eq!(report.cpu.ratios.util_per_req, 50.0);
        assert_eq!(report.cpu.ratios.lim_per_alloc, 75.0);
    }

    #[test]
    fn test_per_node_ratios() {
        let (nodes, usage) = two_node_cluster();
        let report = build_report(&nodes, &usage).unwrap();

        let a = &report.rows[0];
        assert_eq!(a.name, "node-a");
        assert_eq!(a.cpu.ratios.util_per_alloc, 25.0);
        assert_eq!(a.cpu.ratios.req_per_alloc, 50.0);
        assert_eq!(a.cpu.ratios.lim_per_alloc, 75.0);
        assert_eq!(a.memory.ratios.util_per_req, 50.0);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let (nodes, usage) = two_node_cluster();
        let forward = build_report(&nodes, &usage).unwrap();

        let reversed_usage: Vec<_> = usage.iter().rev().cloned().collect();
        let reversed_nodes: Vec<_> = nodes.iter().rev().cloned().collect();
        let reversed = build_report(&reversed_nodes, &reversed_usage).unwrap();

        assert_eq!(forward.cpu, reversed.cpu);
        assert_eq!(forward.memory, reversed.memory);
        // Rows still follow the supplied order
        assert_eq!(reversed.rows[0].name, "node-b");
        assert_eq!(forward.rows[0].name, "node-a");
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let (nodes, usage) = two_node_cluster();
        let first = build_report(&nodes, &usage).unwrap();
        let second = build_report(&nodes, &usage).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_allocatable_cpu_is_undefined() {
        let nodes = vec![node("node-a", 0, 8192)];
        let usage = vec![usage("node-a", (500, 2048), (1000, 4096), (1500, 6144))];

        let err = build_report(&nodes, &usage).unwrap_err();
        assert_eq!(
            err,
            ReportError::UndefinedRatio {
                scope: Scope::Node("node-a".to_string()),
                resource: ResourceKind::Cpu,
                ratio: "req/alloc",
                denominator: "allocatable",
            }
        );
    }

    #[test]
    fn test_zero_allocatable_memory_names_resource() {
        let nodes = vec![node("node-a", 2000, 0)];
        let usage = vec![usage("node-a", (500, 2048), (1000, 4096), (1500, 6144))];

        let err = build_report(&nodes, &usage).unwrap_err();
        assert!(matches!(
            err,
            ReportError::UndefinedRatio {
                resource: ResourceKind::Memory,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "node node-a: memory ratio req/alloc is undefined because allocatable is zero"
        );
    }

    #[test]
    fn test_nodes_without_metrics_are_left_out() {
        let (nodes, usage) = two_node_cluster();
        let report = build_report(&nodes, &usage[..1]).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].name, "node-a");
        assert_eq!(report.cpu.totals.alloc, 2000);
        assert_eq!(report.memory.totals.alloc, 8192);
    }

    #[test]
    fn test_zero_node_limits_is_undefined() {
        let nodes = vec![node("node-a", 2000, 8192)];
        let usage = vec![usage("node-a", (500, 2048), (1000, 4096), (0, 6144))];

        let err = build_report(&nodes, &usage).unwrap_err();
        assert!(matches!(
            err,
            ReportError::UndefinedRatio {
                ratio: "util/lim",
                denominator: "limits",
                ..
            }
        ));
    }

    #[test]
    fn test_cluster_finalize_rejects_zero_requests() {
        let totals = ResourceTotals {
            alloc: 1000,
            req: 0,
            lim: 500,
            util: 100,
        };

        let err = totals.finalize(ResourceKind::Cpu, &Scope::Cluster).unwrap_err();
        assert_eq!(err.to_string(), "cluster-wide: cpu ratio util/req is undefined because requests is zero");
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let (nodes, mut usage) = two_node_cluster();
        usage.push(usage_for_ghost());

        let err = build_report(&nodes, &usage).unwrap_err();
        assert_eq!(err, ReportError::UnknownNode("ghost".to_string()));
    }

    fn usage_for_ghost() -> NodeUsage {
        usage("ghost", (1, 1), (1, 1), (1, 1))
    }

    #[test]
    fn test_empty_selection() {
        let err = build_report(&[], &[]).unwrap_err();
        assert_eq!(err, ReportError::EmptySelection);
    }

    #[test]
    fn test_totals_sum() {
        let parts = vec![
            ResourceTotals { alloc: 1, req: 2, lim: 3, util: 4 },
            ResourceTotals { alloc: 10, req: 20, lim: 30, util: 40 },
        ];
        let total: ResourceTotals = parts.into_iter().sum();
        assert_eq!(total, ResourceTotals { alloc: 11, req: 22, lim: 33, util: 44 });
    }

    #[test]
    fn test_performance_delta() {
        let (nodes, usage) = two_node_cluster();
        let report = build_report(&nodes, &usage).unwrap();

        // (50 - 25) / 25 * 100
        assert_eq!(report.cpu.performance_delta().unwrap(), 100.0);
    }

    #[test]
    fn test_performance_delta_with_zero_utilisation() {
        let stat = ResourceTotals {
            alloc: 1000,
            req: 500,
            lim: 800,
            util: 0,
        }
        .finalize(ResourceKind::Memory, &Scope::Cluster)
        .unwrap();

        assert!(matches!(
            stat.performance_delta(),
            Err(ReportError::UndefinedRatio {
                scope: Scope::Cluster,
                resource: ResourceKind::Memory,
                ..
            })
        ));
    }
}
