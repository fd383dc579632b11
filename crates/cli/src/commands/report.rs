//! Node resource report command

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use kres_lib::{build_report, render_summary, NodeUsage, Report, SummaryMode, Table};
use serde_json::json;

use crate::client::KubeClient;
use crate::output::{print_info, OutputFormat};

/// Options for a report run
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub label_selector: String,
    pub print_nodes: bool,
    pub verbose: bool,
    pub format: OutputFormat,
}

/// Fetch nodes and metrics, build the report and print it
pub async fn show_report(client: &KubeClient, options: &ReportOptions) -> Result<()> {
    let target = client.target();

    if options.verbose && matches!(options.format, OutputFormat::Table) {
        let overridden = if target.is_overridden() {
            format!(" (overwritten by argument - {})", target.name)
        } else {
            String::new()
        };
        println!(
            "KUBE_CLUSTER: {} // active context - {}{}",
            target.name, target.active, overridden
        );
        println!("LABEL_SELECTOR: {}", options.label_selector);
    }

    let nodes = client.list_nodes(&options.label_selector).await?;
    let usage = client.list_node_usage(&options.label_selector).await?;
    let report = build_report(&nodes, &usage)?;
    let prefix = format!("{} / {}", target.name, options.label_selector);

    match options.format {
        OutputFormat::Json => {
            let json = report_json(&report, &target.name, &options.label_selector)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            if options.verbose {
                if let Some(sampled_at) = latest_sample(&usage) {
                    println!("METRICS_SAMPLED_AT: {}", sampled_at.format("%Y-%m-%d %H:%M:%S"));
                }
            }

            if options.print_nodes {
                println!();
                print!("{}", Table::from_report(&report).render());
            }

            let mode = SummaryMode::from_verbosity(options.verbose);
            if mode == SummaryMode::Multiline {
                println!();
            }
            print!(
                "{}",
                render_summary(&report.cpu, &report.memory, &prefix, mode)?
            );

            if options.verbose && !options.print_nodes {
                println!();
                print_info("Use --print-nodes to see per-node details");
            }
        }
    }

    Ok(())
}

/// Report with cluster identity and performance deltas, for `--format json`
pub fn report_json(report: &Report, cluster: &str, label_selector: &str) -> Result<serde_json::Value> {
    Ok(json!({
        "cluster": cluster,
        "label_selector": label_selector,
        "rows": report.rows,
        "cpu": report.cpu,
        "memory": report.memory,
        "performance": {
            "cpu": report.cpu.performance_delta()?,
            "memory": report.memory.performance_delta()?,
        },
    }))
}

/// Most recent metrics timestamp across nodes
pub fn latest_sample(usage: &[NodeUsage]) -> Option<DateTime<FixedOffset>> {
    usage
        .iter()
        .filter_map(|node| DateTime::parse_from_rfc3339(&node.utilisation.timestamp).ok())
        .max()
}
