/// Defaults for the benchmark record store
pub const DEFAULT_TABLE: &str = "benchmark-data";
pub const DEFAULT_INDEX: &str = "benchmark_id-timestamp-index";

/// Attribute and field names shared by the store adapter and the normalizer
pub const PARTITION_KEY: &str = "benchmark_id";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const DATA_FIELD: &str = "data";
pub const SYSTEM_INFO_FIELD: &str = "system_info";

/// Object storage listing
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_CONFIG_PATH: &str = "bench_data.toml";
