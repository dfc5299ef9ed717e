//! Status record → metric sample mapping.
//!
//! Every category owns a fixed label schema and a static, ordered table of
//! gauges. Mapping a record decodes its typed snapshot, evaluates the table
//! in declaration order and attaches one shared label-value vector to every
//! sample of that record. Absent attributes are emitted as `0.0`; nothing is
//! skipped for being empty.

mod job;
mod node;
mod queue;
mod server;

use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::error::MappingError;
use crate::model::{BatchStatus, Category, JobState, NodeState, QueueState, ServerState};

pub use job::JOB_LABELS;
pub use node::NODE_LABELS;
pub use queue::QUEUE_LABELS;
pub use server::SERVER_LABELS;

/// Kind of an exported metric. Scheduler counters and durations are all
/// exposed as instantaneous observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gauge,
}

/// One labeled observation ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Metric name without namespace and subsystem, e.g. `server_total_jobs`.
    pub name: &'static str,
    pub help: &'static str,
    pub value: f64,
    pub kind: ValueKind,
    pub label_names: &'static [&'static str],
    pub label_values: Arc<[String]>,
}

impl MetricSample {
    /// Value of the label called `name`, if part of the schema.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.label_names
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

/// Row of a category's gauge table.
pub(crate) struct GaugeDef<T> {
    pub(crate) name: &'static str,
    pub(crate) help: &'static str,
    pub(crate) value: fn(&T) -> f64,
}

impl Category {
    /// Label schema shared by every sample of this category.
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Category::Server => &SERVER_LABELS,
            Category::Queue => &QUEUE_LABELS,
            Category::Node => &NODE_LABELS,
            Category::Job => &JOB_LABELS,
        }
    }

    /// Number of samples produced per record.
    pub fn gauges_per_record(self) -> usize {
        match self {
            Category::Server => server::GAUGES.len(),
            Category::Queue => queue::GAUGES.len(),
            Category::Node => node::GAUGES.len(),
            Category::Job => job::GAUGES.len(),
        }
    }
}

/// Maps one status record of `category` to its samples.
///
/// The job category stamps its `LocalTime` label with the current wall clock.
pub fn map(category: Category, record: &BatchStatus) -> Result<Vec<MetricSample>, MappingError> {
    match category {
        Category::Server => ServerState::decode(record).map(|s| server::samples(&s)),
        Category::Queue => QueueState::decode(record).map(|q| queue::samples(&q)),
        Category::Node => NodeState::decode(record).map(|n| node::samples(&n)),
        Category::Job => map_job_at(record, Local::now()),
    }
}

/// Maps a job record with an explicit capture time.
pub fn map_job_at(
    record: &BatchStatus,
    captured_at: DateTime<Local>,
) -> Result<Vec<MetricSample>, MappingError> {
    JobState::decode(record).map(|j| job::samples(&j, captured_at))
}

fn build<T>(
    table: &'static [GaugeDef<T>],
    record: &T,
    label_names: &'static [&'static str],
    label_values: Vec<String>,
) -> Vec<MetricSample> {
    debug_assert_eq!(label_names.len(), label_values.len());
    let label_values: Arc<[String]> = label_values.into();
    table
        .iter()
        .map(|def| MetricSample {
            name: def.name,
            help: def.help,
            value: (def.value)(record),
            kind: ValueKind::Gauge,
            label_names,
            label_values: Arc::clone(&label_values),
        })
        .collect()
}

/// `alice@cluster` → `alice_cluster`.
pub fn sanitize_owner(owner: &str) -> String {
    owner.replace('@', "_")
}

/// `/home/alice` → `-1home-1alice`.
pub fn sanitize_home(home: &str) -> String {
    home.replace('/', "-1")
}

/// `en_US.UTF-8` → `en_US_UTF-8`.
pub fn sanitize_lang(lang: &str) -> String {
    lang.replace('.', "_")
}
