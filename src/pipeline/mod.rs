//! Paginated fetch → flat record stream → table.

pub mod normalize;
pub mod paginator;
pub mod table;

pub use normalize::{normalize_record, FlatRecord, RecordNormalizer};
pub use paginator::CursorPaginator;
pub use table::BenchmarkTable;

use tracing::instrument;

use crate::app::ports::QueryPort;
use crate::error::Result;

/// Lazy flat records for one benchmark, in ascending timestamp order
pub fn flat_records<Q: QueryPort>(
    store: Q,
    benchmark_id: &str,
) -> RecordNormalizer<CursorPaginator<Q>> {
    RecordNormalizer::new(CursorPaginator::new(store, benchmark_id))
}

/// Fetch every record of a benchmark and assemble them into a table
#[instrument(skip(store))]
pub fn fetch_benchmark_table<Q: QueryPort>(store: Q, benchmark_id: &str) -> Result<BenchmarkTable> {
    BenchmarkTable::from_records(flat_records(store, benchmark_id))
}
