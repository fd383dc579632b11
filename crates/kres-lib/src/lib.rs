//! Core library for kres, the Kubernetes node resource reporter
//!
//! This crate provides:
//! - Quantity conversion from Kubernetes resource strings to canonical units
//! - Per-node and cluster-wide aggregation of allocatable, requests, limits and utilisation
//! - Table and summary rendering of the aggregated statistics
//!
//! It does not talk to the Kubernetes API. Callers hand it raw quantity maps
//! and get back typed statistics and printable text.

pub mod aggregate;
pub mod error;
pub mod models;
pub mod quantity;
pub mod report;

pub use aggregate::{build_report, AggregateStat, NodeStat, Ratios, Report, ResourceStat, ResourceTotals};
pub use error::{QuantityError, ReportError, Scope};
pub use models::*;
pub use quantity::{cpu_as_millicores, memory_as_megabytes, ResourceKind};
pub use report::{render_summary, ReportRow, SummaryMode, Table};
