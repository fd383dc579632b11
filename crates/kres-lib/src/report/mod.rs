//! Report rendering
//!
//! Turns finalized statistics into printable text:
//! - a fixed-width per-node table with a header and a totals footer
//! - a cluster summary, either multi-line or condensed to one line
//!
//! Column widths are computed over the complete table before any cell is
//! padded, so header, node rows and footer always line up.

mod summary;
mod table;


pub use summary::{render_summary, SummaryMode, HINT};
pub use table::{render_rows, ReportRow, Table, HEADER};
