//! pbspro-core: collection pipeline for the PBS Professional exporter.
//!
//! Provides:
//! - `model`: raw status records and the typed server/queue/node/job snapshots
//! - `mapper`: snapshot → labeled gauge sample tables
//! - `retriever`: scheduler session traits, the `qstat` command retriever, mocks
//! - `collector`: per-scrape cycle orchestration and failure isolation
//! - `sink`: metric sink trait and the Prometheus registry adapter
//! - `config`: collector configuration
//! - `error`: error types shared across the pipeline

pub mod collector;
pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod retriever;
pub mod sink;

pub use collector::{CategoryReport, CategoryStats, Collector, CycleReport, CycleStatus};
pub use config::{CollectorConfig, SessionMode};
pub use error::{CategoryError, MappingError, RetrieveError, SinkError};
pub use mapper::{MetricSample, ValueKind};
pub use model::{BatchStatus, Category};
pub use sink::{MetricSink, PrometheusSink};

/// Crate version, reported by the exporter binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem segment of every exported scheduler metric name.
pub const SUBSYSTEM: &str = "qstat";
