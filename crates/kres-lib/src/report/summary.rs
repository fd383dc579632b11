//! Cluster summary views

use super::table::{render_rows, ReportRow};
use crate::aggregate::AggregateStat;
use crate::error::ReportError;

/// Explanation of the performance figure, printed under the multi-line summary
pub const HINT: &str = "hint: (Av.%Req - Av.%Util) / Av.%Util * 100%";

/// Which summary rendering to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryMode {
    /// Everything on a single line
    #[default]
    Oneline,
    /// One line per metric plus a hint
    Multiline,
}

impl SummaryMode {
    pub fn from_verbosity(verbose: bool) -> Self {
        if verbose {
            SummaryMode::Multiline
        } else {
            SummaryMode::Oneline
        }
    }
}

/// Render cluster average utilisation, average requests and the
/// requests-vs-utilisation performance delta
///
/// `prefix` identifies the cluster and selector and is printed verbatim.
/// Fails when either resource has zero average utilisation.
pub fn render_summary(
    cpu: &AggregateStat,
    memory: &AggregateStat,
    prefix: &str,
    mode: SummaryMode,
) -> Result<String, ReportError> {
    let cpu_delta = cpu.performance_delta()?;
    let memory_delta = memory.performance_delta()?;

    match mode {
        SummaryMode::Multiline => {
            let rows: Vec<ReportRow> = vec![
                vec![
                    "Cluster's CPU|RAM average UTILISATION".to_string(),
                    format!("CPU: {:6.1}%", cpu.ratios.util_per_alloc),
                    format!("RAM: {:6.1}%", memory.ratios.util_per_alloc),
                ]
                .into(),
                vec![
                    "Cluster's CPU|RAM average REQUESTS".to_string(),
                    format!("CPU: {:6.1}%", cpu.ratios.req_per_alloc),
                    format!("RAM: {:6.1}%", memory.ratios.req_per_alloc),
                ]
                .into(),
                vec![
                    "Cluster's CPU|RAM REQUESTS performance".to_string(),
                    format!("CPU: {:6.1}%", cpu_delta),
                    format!("RAM: {:6.1}%", memory_delta),
                ]
                .into(),
                vec![HINT.to_string()].into(),
            ];

            let title = if prefix.is_empty() {
                "Summary: ".to_string()
            } else {
                format!("Summary: ({})", prefix)
            };
            Ok(format!("{}\n{}", title, render_rows(&rows, false, false)))
        }
        SummaryMode::Oneline => {
            let row: ReportRow = vec![
                format!("Cluster {}", prefix),
                format!(
                    "CPU_U_R:{:6.1}% / {:6.1}%",
                    cpu.ratios.util_per_alloc, cpu.ratios.req_per_alloc
                ),
                format!("CPU_RU/U:{:6.1}%", cpu_delta),
                format!(
                    "RAM_U_R:{:6.1}% / {:6.1}%",
                    memory.ratios.util_per_alloc, memory.ratios.req_per_alloc
                ),
                format!("RAM_RU/U:{:6.1}%", memory_delta),
            ]
            .into();

            Ok(render_rows(&[row], false, false))
        }
    }
}
