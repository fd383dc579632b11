//! Fixed-width node table

use crate::aggregate::{Report, ResourceStat};
use crate::quantity::ResourceKind;
use serde::Serialize;

/// Column labels of the node table
pub const HEADER: [&str; 13] = [
    "Node",
    "CPU A",
    "CPU U (% U/A)",
    "CPU R (% R/A)",
    "CPU L (% L/A)",
    "%C U/R",
    "%C U/L",
    "RAM A",
    "RAM U (% U/A)",
    "RAM R (% R/A)",
    "RAM L (% L/A)",
    "%R U/R",
    "%R U/L",
];

const COLUMN_SEPARATOR: &str = " | ";

/// Formatted display cells of one table line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow(Vec<String>);

impl ReportRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self(cells)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    /// A node or totals line: label followed by cpu and memory cells
    pub fn from_stats(label: &str, cpu: &ResourceStat, memory: &ResourceStat) -> Self {
        let mut cells = Vec::with_capacity(HEADER.len());
        cells.push(label.to_string());
        cells.extend(resource_cells(cpu, ResourceKind::Cpu));
        cells.extend(resource_cells(memory, ResourceKind::Memory));
        Self(cells)
    }

    fn header() -> Self {
        Self(HEADER.iter().map(|label| label.to_string()).collect())
    }
}

impl From<Vec<String>> for ReportRow {
    fn from(cells: Vec<String>) -> Self {
        Self(cells)
    }
}

fn resource_cells(stat: &ResourceStat, kind: ResourceKind) -> [String; 6] {
    let unit = kind.unit();
    let totals = &stat.totals;
    let ratios = &stat.ratios;

    [
        format!("{}{}", totals.alloc, unit),
        format!("{}{} /{:6.1}%", totals.util, unit, ratios.util_per_alloc),
        format!("{}{} /{:6.1}%", totals.req, unit, ratios.req_per_alloc),
        format!("{}{} /{:6.1}%", totals.lim, unit, ratios.lim_per_alloc),
        format!("{:6.1}%", ratios.util_per_req),
        format!("{:6.1}%", ratios.util_per_lim),
    ]
}

/// Node table: header, one line per node, totals footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: Vec<ReportRow>,
}

impl Table {
    pub fn from_report(report: &Report) -> Self {
        let mut rows = Vec::with_capacity(report.rows.len() + 2);
        rows.push(ReportRow::header());
        rows.extend(
            report
                .rows
                .iter()
                .map(|node| ReportRow::from_stats(&node.name, &node.cpu, &node.memory)),
        );
        rows.push(ReportRow::from_stats("Total", &report.cpu, &report.memory));
        Self { rows }
    }

    /// All lines including header and footer
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn column_widths(&self) -> Vec<usize> {
        column_widths(&self.rows)
    }

    /// Render with separators under the header and above the footer
    pub fn render(&self) -> String {
        render_rows(&self.rows, true, true)
    }
}

fn column_widths(rows: &[ReportRow]) -> Vec<usize> {
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (i, cell) in row.cells().iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }
    widths
}

/// Pad and join rows into text, one line per row
///
/// The first column is left-aligned. Other columns are right-aligned,
/// except on the first row where they are centered. Rows may be ragged;
/// widths are taken per column over whichever rows have that column.
pub fn render_rows(rows: &[ReportRow], header_separator: bool, footer_separator: bool) -> String {
    let widths = column_widths(rows);
    let mut out = String::new();

    for (row_index, row) in rows.iter().enumerate() {
        let line = row
            .cells()
            .iter()
            .enumerate()
            .map(|(col_index, cell)| {
                let width = widths[col_index];
                if col_index == 0 {
                    format!("{:<width$}", cell)
                } else if row_index == 0 {
                    format!("{:^width$}", cell)
                } else {
                    format!("{:>width$}", cell)
                }
            })
            .collect::<Vec<_>>()
            .join(COLUMN_SEPARATOR);

        out.push_str(&line);
        out.push('\n');

        let below_header = header_separator && row_index == 0;
        let above_footer = footer_separator && rows.len() >= 2 && row_index == rows.len() - 2;
        if below_header || above_footer {
            out.push_str(&"-".repeat(line.chars().count()));
            out.push('\n');
        }
    }

    out
}
