//! Long-form tables and tracking-error metrics for aligned motion-capture data.
//!
//! Pipeline order: [`LongFormTable::from_array`] per system →
//! [`estimate_velocity`] → [`combine_tables`] → [`compute_error_metrics`].
//! Every step returns a fresh table; inputs are never mutated.

mod combine;
mod error_metrics;
mod io;
mod table;
mod velocity;

pub use combine::{combine_tables, CombineError, CombinedRecord, CombinedTable, SystemSample};
pub use error_metrics::{
    compute_error_metrics, AbsoluteErrorRow, AbsoluteErrorTable, AxisRmseRow, AxisRmseTable,
    ErrorMetrics, RmseRow, RmseTable,
};
pub use io::TableIoError;
pub use table::{LongFormRecord, LongFormTable};
pub use velocity::estimate_velocity;
