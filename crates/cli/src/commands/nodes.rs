//! Node inventory command

use anyhow::Result;
use colored::Colorize;
use kres_lib::NodeInfo;
use tabled::Tabled;

use crate::client::KubeClient;
use crate::output::{format_megabytes, format_millicores, print_warning, OutputFormat};

/// Row for the node inventory table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Internal IP")]
    internal_ip: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "CPU Cap")]
    cpu_capacity: String,
    #[tabled(rename = "CPU A")]
    cpu_allocatable: String,
    #[tabled(rename = "RAM Cap")]
    memory_capacity: String,
    #[tabled(rename = "RAM A")]
    memory_allocatable: String,
    #[tabled(rename = "Disk A")]
    storage_allocatable: String,
}

impl From<&NodeInfo> for NodeRow {
    fn from(node: &NodeInfo) -> Self {
        let text = |value: Option<&str>| value.unwrap_or("-").to_string();

        Self {
            name: node.name.clone(),
            internal_ip: text(node.addresses.internal_ip.as_deref()),
            hostname: text(node.addresses.hostname.as_deref()),
            instance_type: text(node.label("node.kubernetes.io/instance-type")),
            zone: text(node.label("topology.kubernetes.io/zone")),
            cpu_capacity: format_millicores(node.capacity.cpu),
            cpu_allocatable: format_millicores(node.allocatable.cpu),
            memory_capacity: format_megabytes(node.capacity.memory),
            memory_allocatable: format_megabytes(node.allocatable.memory),
            storage_allocatable: format_megabytes(node.allocatable.ephemeral_storage),
        }
    }
}

/// List nodes with addresses, placement labels, capacity and allocatable
pub async fn show_nodes(client: &KubeClient, label_selector: &str, format: OutputFormat) -> Result<()> {
    let nodes = client.list_nodes(label_selector).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&nodes)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if nodes.is_empty() {
                print_warning("No nodes matched the label selector");
                return Ok(());
            }

            println!("{} {}", "Cluster:".bold(), client.target().name.cyan());
            let table = render_nodes(&nodes);
            println!("{}", table);
            println!("\nTotal: {} nodes", nodes.len());
        }
    }

    Ok(())
}

fn render_nodes(nodes: &[NodeInfo]) -> String {
    let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
    tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kres_lib::{NodeAddresses, ResourceAmounts};
    use std::collections::BTreeMap;

    #[test]
    fn test_node_row_placeholders() {
        let node = NodeInfo {
            name: "worker-1".to_string(),
            addresses: NodeAddresses {
                internal_ip: Some("10.0.1.15".to_string()),
                hostname: None,
            },
            allocatable: ResourceAmounts::new(3920, 14786),
            capacity: ResourceAmounts::new(4000, 15802),
            labels: BTreeMap::new(),
        };

        let row = NodeRow::from(&node);
        assert_eq!(row.internal_ip, "10.0.1.15");
        assert_eq!(row.hostname, "-");
        assert_eq!(row.zone, "-");
        assert_eq!(row.cpu_allocatable, "3920m");
        assert_eq!(row.storage_allocatable, "-");

        let table = render_nodes(&[node]);
        assert!(table.contains("Internal IP"));
        assert!(table.contains("worker-1"));
    }
}
