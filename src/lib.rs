pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod types;

// Ports the pipeline depends on, and the HTTP adapters implementing them
pub mod app;
pub mod infra;

pub use error::{BenchError, Result};
pub use pipeline::{
    fetch_benchmark_table, flat_records, BenchmarkTable, CursorPaginator, FlatRecord,
    RecordNormalizer,
};
pub use storage::{fetch_object, ObjectLister};
