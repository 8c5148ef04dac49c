//! Counters for the record pipeline and the object helpers.
//!
//! Library code only talks to the `metrics` facade. The binary installs a
//! Prometheus exporter when a listen address is configured; embedding
//! applications may install their own recorder instead.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::error::{BenchError, Result};

/// Naming convention: bench_{phase}_{metric_name}[_total]
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("bench_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("bench_", $phase, "_", $name)
    };
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
}

/// Record store pagination and normalization
pub struct RecordMetrics;

impl RecordMetrics {
    pub fn page_fetched(items: usize) {
        ::metrics::counter!(phase_metric!(counter, "records", "pages_fetched")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "records", "page_items"))
            .record(items as f64);
    }

    pub fn record_yielded() {
        ::metrics::counter!(phase_metric!(counter, "records", "yielded")).increment(1);
    }

    pub fn record_normalized() {
        ::metrics::counter!(phase_metric!(counter, "records", "normalized")).increment(1);
    }

    pub fn query_error() {
        ::metrics::counter!(phase_metric!(counter, "records", "query_errors")).increment(1);
    }

    pub fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "records", "pages_fetched"),
                metric_type: MetricType::Counter,
                help: "Range query pages fetched from the record store",
            },
            MetricDoc {
                name: phase_metric!(histogram, "records", "page_items"),
                metric_type: MetricType::Histogram,
                help: "Items returned per range query page",
            },
            MetricDoc {
                name: phase_metric!(counter, "records", "yielded"),
                metric_type: MetricType::Counter,
                help: "Raw records yielded by the cursor paginator",
            },
            MetricDoc {
                name: phase_metric!(counter, "records", "normalized"),
                metric_type: MetricType::Counter,
                help: "Raw records flattened into flat records",
            },
            MetricDoc {
                name: phase_metric!(counter, "records", "query_errors"),
                metric_type: MetricType::Counter,
                help: "Range queries that failed",
            },
        ]
    }
}

/// Object storage listing and fetch
pub struct ObjectMetrics;

impl ObjectMetrics {
    pub fn listed(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "objects", "listed")).increment(count as u64);
    }

    pub fn fetched(bytes: usize) {
        ::metrics::counter!(phase_metric!(counter, "objects", "fetched")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "objects", "fetched_bytes"))
            .record(bytes as f64);
    }

    pub fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "objects", "listed"),
                metric_type: MetricType::Counter,
                help: "Object descriptors yielded by listings",
            },
            MetricDoc {
                name: phase_metric!(counter, "objects", "fetched"),
                metric_type: MetricType::Counter,
                help: "Objects fetched from storage",
            },
            MetricDoc {
                name: phase_metric!(histogram, "objects", "fetched_bytes"),
                metric_type: MetricType::Histogram,
                help: "Size of fetched objects in bytes",
            },
        ]
    }
}

/// Every metric this crate emits
pub fn all_metrics_documentation() -> Vec<MetricDoc> {
    let mut docs = RecordMetrics::metrics_documentation();
    docs.extend(ObjectMetrics::metrics_documentation());
    docs
}

/// Register help text for every metric with the installed recorder
pub fn describe_metrics() {
    for doc in all_metrics_documentation() {
        match doc.metric_type {
            MetricType::Counter => ::metrics::describe_counter!(doc.name, doc.help),
            MetricType::Histogram => ::metrics::describe_histogram!(doc.name, doc.help),
        }
    }
}

/// Install the global Prometheus recorder with an HTTP listener on `addr`
/// and register every metric's description.
pub fn install_prometheus_exporter(addr: &str) -> Result<()> {
    let socket: SocketAddr = addr
        .parse()
        .map_err(|_| BenchError::Config(format!("Invalid metrics address '{}'", addr)))?;

    PrometheusBuilder::new()
        .with_http_listener(socket)
        .install()
        .map_err(|e| BenchError::Config(format!("Failed to install Prometheus exporter: {}", e)))?;

    describe_metrics();
    info!(
        "Prometheus exporter listening at http://{}/metrics ({} metrics registered)",
        socket,
        all_metrics_documentation().len()
    );
    Ok(())
}
