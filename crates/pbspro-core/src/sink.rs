//! Metric sinks.
//!
//! The collector pushes every [`MetricSample`] of a cycle into a
//! [`MetricSink`]. [`PrometheusSink`] is the scrape-time sink: it owns a
//! private registry, builds one gauge family per metric name and renders
//! the text exposition format once the cycle is done.

use std::collections::HashMap;

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::collector::CycleReport;
use crate::error::SinkError;
use crate::mapper::MetricSample;

/// Default cap on samples accepted by one [`PrometheusSink`].
pub const DEFAULT_MAX_SAMPLES: usize = 500_000;

/// Content type of [`PrometheusSink::encode`] output.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Receiver of metric samples.
pub trait MetricSink {
    /// Accepts one sample. A rejected sample is dropped by the caller.
    fn push(&mut self, sample: MetricSample) -> Result<(), SinkError>;
}

/// Plain capture, used by tests and by callers that post-process samples.
impl MetricSink for Vec<MetricSample> {
    fn push(&mut self, sample: MetricSample) -> Result<(), SinkError> {
        Vec::push(self, sample);
        Ok(())
    }
}

struct Family {
    label_names: &'static [&'static str],
    gauges: GaugeVec,
}

/// Sink backed by a fresh [`prometheus::Registry`].
///
/// Meant to live for exactly one scrape: create it, run one collection
/// cycle into it, optionally [`record_cycle`](Self::record_cycle), then
/// [`encode`](Self::encode).
pub struct PrometheusSink {
    namespace: String,
    subsystem: String,
    registry: Registry,
    families: HashMap<&'static str, Family>,
    max_samples: usize,
    accepted: usize,
}

impl PrometheusSink {
    /// Metric names become `<namespace>_<subsystem>_<name>`.
    pub fn new(namespace: impl Into<String>, subsystem: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            subsystem: subsystem.into(),
            registry: Registry::new(),
            families: HashMap::new(),
            max_samples: DEFAULT_MAX_SAMPLES,
            accepted: 0,
        }
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    /// Samples accepted so far.
    pub fn len(&self) -> usize {
        self.accepted
    }

    pub fn is_empty(&self) -> bool {
        self.accepted == 0
    }

    fn full_name(&self, name: &str) -> String {
        format!("{}_{}_{}", self.namespace, self.subsystem, name)
    }

    fn family(&mut self, sample: &MetricSample) -> Result<&GaugeVec, SinkError> {
        if let Some(existing) = self.families.get(sample.name) {
            if existing.label_names != sample.label_names {
                return Err(SinkError::SchemaConflict {
                    name: self.full_name(sample.name),
                });
            }
        } else {
            let opts = Opts::new(sample.name, sample.help)
                .namespace(self.namespace.clone())
                .subsystem(self.subsystem.clone());
            let gauges = GaugeVec::new(opts, sample.label_names)
                .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
            self.registry
                .register(Box::new(gauges.clone()))
                .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
            self.families.insert(
                sample.name,
                Family {
                    label_names: sample.label_names,
                    gauges,
                },
            );
        }
        Ok(&self.families[sample.name].gauges)
    }

    /// Adds exporter self-metrics describing `report`.
    ///
    /// These are not subject to the sample cap. Call at most once per sink.
    pub fn record_cycle(&mut self, report: &CycleReport) -> Result<(), SinkError> {
        let success = self.register_vec(
            "scrape_category_success",
            "Whether the last collection of the category succeeded, 1 if true.",
        )?;
        let duration = self.register_vec(
            "scrape_category_duration_seconds",
            "Time spent collecting the category in seconds.",
        )?;
        for category in &report.categories {
            let label = [category.category.as_str()];
            success
                .with_label_values(&label)
                .set(if category.result.is_ok() { 1.0 } else { 0.0 });
            duration
                .with_label_values(&label)
                .set(category.elapsed.as_secs_f64());
        }

        self.register_gauge(
            "scrape_samples_dropped",
            "Samples rejected by the sink during the cycle.",
        )?
        .set(report.dropped_samples() as f64);
        self.register_gauge(
            "scrape_records_skipped",
            "Status records that could not be decoded during the cycle.",
        )?
        .set(report.skipped_records() as f64);
        self.register_gauge(
            "scrape_duration_seconds",
            "Duration of the whole collection cycle in seconds.",
        )?
        .set(report.elapsed.as_secs_f64());
        Ok(())
    }

    fn register_vec(&self, name: &str, help: &str) -> Result<GaugeVec, SinkError> {
        let opts = Opts::new(name, help).namespace(self.namespace.clone());
        let gauges = GaugeVec::new(opts, &["category"])
            .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
        self.registry
            .register(Box::new(gauges.clone()))
            .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
        Ok(gauges)
    }

    fn register_gauge(&self, name: &str, help: &str) -> Result<Gauge, SinkError> {
        let opts = Opts::new(name, help).namespace(self.namespace.clone());
        let gauge = Gauge::with_opts(opts).map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
        self.registry
            .register(Box::new(gauge.clone()))
            .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
        Ok(gauge)
    }

    /// Renders all accepted samples in the Prometheus text format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricSink for PrometheusSink {
    fn push(&mut self, sample: MetricSample) -> Result<(), SinkError> {
        if self.accepted >= self.max_samples {
            return Err(SinkError::Capacity(self.max_samples));
        }
        if sample.label_names.len() != sample.label_values.len() {
            return Err(SinkError::LabelMismatch {
                name: self.full_name(sample.name),
                expected: sample.label_names.len(),
                actual: sample.label_values.len(),
            });
        }

        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        let gauge = self
            .family(&sample)?
            .get_metric_with_label_values(&values)
            .map_err(|e| SinkError::InvalidDescriptor(e.to_string()))?;
        gauge.set(sample.value);
        self.accepted += 1;
        Ok(())
    }
}
