//! kres CLI
//!
//! Reports Kubernetes node resource health: allocatable capacity against
//! live utilisation, pod requests and pod limits, per node and cluster-wide.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{nodes, report};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Kubernetes node resource report
#[derive(Parser)]
#[command(name = "kres")]
#[command(author, version, about = "Kubernetes node resource utilisation and requests report", long_about = None)]
pub struct Cli {
    /// Context name to work with (uses the current kube-config context if not specified)
    #[arg(long, short = 'c', global = true)]
    pub kube_config_context: Option<String>,

    /// Kube-config file to read cluster info from (uses KUBECONFIG or ~/.kube/config if not specified)
    #[arg(long, short = 'f', global = true)]
    pub kube_config_file: Option<String>,

    /// Label selector to filter nodes by
    #[arg(long, short = 's', global = true)]
    pub label_selector: Option<String>,

    /// Output format
    #[arg(long, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, env = "KRES_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show cluster utilisation and requests summary (default)
    Report {
        /// Print a table with per-node details
        #[arg(long)]
        print_nodes: bool,
    },

    /// List nodes with addresses, placement labels and capacity
    Nodes,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Settings::load()?;

    let context = cli.kube_config_context.or(settings.context.clone());
    let kubeconfig_file = cli.kube_config_file.or(settings.kubeconfig.clone());
    let label_selector = cli
        .label_selector
        .or(settings.label_selector.clone())
        .unwrap_or_default();
    let format = match cli.format {
        Some(format) => format,
        None => settings.output_format()?,
    };

    // Initialize client
    let kubeconfig = config::kubeconfig_path(kubeconfig_file.as_deref())?;
    let client = client::KubeClient::connect(&kubeconfig, context.as_deref()).await?;
    info!(kubeconfig = %kubeconfig.display(), selector = %label_selector, "Starting run");

    // Execute command
    match cli.command.unwrap_or(Commands::Report { print_nodes: false }) {
        Commands::Report { print_nodes } => {
            let options = report::ReportOptions {
                label_selector,
                print_nodes,
                verbose: cli.verbose,
                format,
            };
            report::show_report(&client, &options).await?;
        }
        Commands::Nodes => {
            nodes::show_nodes(&client, &label_selector, format).await?;
        }
    }

    Ok(())
}
