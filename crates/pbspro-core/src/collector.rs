//! Collection cycle orchestration.
//!
//! One cycle walks the categories in a fixed order:
//!
//! ```text
//! server ──▶ queue ──▶ node ──▶ job
//!
//! per category:
//!   connect ──▶ query ──▶ map ──▶ push to sink
//!      │          │
//!      │          └──▶ disconnect   (always, once connected)
//!      └──▶ CategoryError::Connection
//! ```
//!
//! Failures are isolated to the smallest unit they affect: a rejected
//! sample is dropped, an undecodable record is skipped, a failed connect or
//! query fails its category. The cycle itself always completes and returns
//! a [`CycleReport`].

use std::fmt;
use std::time::{Duration, Instant};

use tokio::time::{self, Instant as Deadline};
use tracing::{debug, error, info, warn};

use crate::config::{CollectorConfig, SessionMode};
use crate::error::{CategoryError, SinkError};
use crate::mapper;
use crate::model::{BatchStatus, Category};
use crate::retriever::{Retriever, Session};
use crate::sink::MetricSink;

/// Upper bound for releasing a session, independent of the cycle deadline.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Counters of one successfully queried category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Records returned by the scheduler.
    pub records: usize,
    /// Samples accepted by the sink.
    pub samples: usize,
    /// Records skipped because they could not be decoded.
    pub skipped_records: usize,
    /// Samples the sink rejected.
    pub dropped_samples: usize,
}

/// Outcome of one category within a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub category: Category,
    pub elapsed: Duration,
    pub result: Result<CategoryStats, CategoryError>,
}

/// Overall outcome of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every category succeeded without skipped records or dropped samples.
    Success,
    /// Some data was collected, but not all of it.
    Partial,
    /// No category succeeded.
    Failed,
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleStatus::Success => f.write_str("success"),
            CycleStatus::Partial => f.write_str("partial"),
            CycleStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Result of [`Collector::collect`], one entry per category in cycle order.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub categories: Vec<CategoryReport>,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn status(&self) -> CycleStatus {
        let succeeded: Vec<&CategoryStats> = self
            .categories
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .collect();

        if succeeded.is_empty() {
            CycleStatus::Failed
        } else if succeeded.len() == self.categories.len()
            && succeeded
                .iter()
                .all(|s| s.skipped_records == 0 && s.dropped_samples == 0)
        {
            CycleStatus::Success
        } else {
            CycleStatus::Partial
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Samples accepted by the sink across all categories.
    pub fn samples(&self) -> usize {
        self.stats().map(|s| s.samples).sum()
    }

    pub fn skipped_records(&self) -> usize {
        self.stats().map(|s| s.skipped_records).sum()
    }

    pub fn dropped_samples(&self) -> usize {
        self.stats().map(|s| s.dropped_samples).sum()
    }

    fn stats(&self) -> impl Iterator<Item = &CategoryStats> {
        self.categories.iter().filter_map(|c| c.result.as_ref().ok())
    }
}

/// Runs collection cycles against a [`Retriever`].
///
/// A collector holds no per-cycle state; concurrent calls to
/// [`collect`](Self::collect) use independent sessions.
pub struct Collector<R> {
    retriever: R,
    config: CollectorConfig,
}

impl<R: Retriever> Collector<R> {
    pub fn new(retriever: R, config: CollectorConfig) -> Self {
        Self { retriever, config }
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Runs one full cycle, pushing every mapped sample into `sink`.
    pub async fn collect<S>(&self, sink: &mut S) -> CycleReport
    where
        S: MetricSink + Send + ?Sized,
    {
        let started = Instant::now();
        let deadline = Deadline::now() + self.config.cycle_timeout;

        let categories = match self.config.session_mode {
            SessionMode::PerCategory => self.collect_per_category(sink, deadline).await,
            SessionMode::Shared => self.collect_shared(sink, deadline).await,
        };

        let report = CycleReport {
            categories,
            elapsed: started.elapsed(),
        };
        info!(
            status = %report.status(),
            samples = report.samples(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "collection cycle finished"
        );
        report
    }

    async fn collect_per_category<S>(&self, sink: &mut S, deadline: Deadline) -> Vec<CategoryReport>
    where
        S: MetricSink + Send + ?Sized,
    {
        let mut reports = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let started = Instant::now();
            let result = if Deadline::now() >= deadline {
                Err(self.timed_out())
            } else {
                match time::timeout_at(deadline, self.retriever.connect()).await {
                    Err(_) => Err(self.timed_out()),
                    Ok(Err(e)) => Err(e.into()),
                    Ok(Ok(mut session)) => {
                        let result = self.query(&mut session, category, deadline).await;
                        release(&mut session).await;
                        result.map(|records| emit(category, &records, sink))
                    }
                }
            };
            reports.push(finish(category, started, result));
        }
        reports
    }

    async fn collect_shared<S>(&self, sink: &mut S, deadline: Deadline) -> Vec<CategoryReport>
    where
        S: MetricSink + Send + ?Sized,
    {
        let started = Instant::now();
        let mut session = match time::timeout_at(deadline, self.retriever.connect()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return fail_all(started, e.into()),
            Err(_) => return fail_all(started, self.timed_out()),
        };

        let mut reports = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let started = Instant::now();
            let result = if Deadline::now() >= deadline {
                Err(self.timed_out())
            } else {
                self.query(&mut session, category, deadline)
                    .await
                    .map(|records| emit(category, &records, sink))
            };
            reports.push(finish(category, started, result));
        }
        release(&mut session).await;
        reports
    }

    async fn query(
        &self,
        session: &mut R::Session,
        category: Category,
        deadline: Deadline,
    ) -> Result<Vec<BatchStatus>, CategoryError> {
        let records = match time::timeout_at(deadline, session.stat(category)).await {
            Err(_) => return Err(self.timed_out()),
            Ok(result) => result?,
        };
        if category == Category::Server && records.len() > 1 {
            return Err(CategoryError::Cardinality(records.len()));
        }
        Ok(records)
    }

    fn timed_out(&self) -> CategoryError {
        CategoryError::Timeout(self.config.cycle_timeout)
    }
}

async fn release<S: Session>(session: &mut S) {
    if time::timeout(DISCONNECT_GRACE, session.disconnect())
        .await
        .is_err()
    {
        warn!(
            grace_ms = DISCONNECT_GRACE.as_millis() as u64,
            "session release timed out"
        );
    }
}

/// Maps `records` and pushes the samples, skipping undecodable records and
/// dropping rejected samples.
fn emit<S>(category: Category, records: &[BatchStatus], sink: &mut S) -> CategoryStats
where
    S: MetricSink + ?Sized,
{
    let mut stats = CategoryStats {
        records: records.len(),
        ..CategoryStats::default()
    };
    let mut capacity_reported = false;

    for record in records {
        let samples = match mapper::map(category, record) {
            Ok(samples) => samples,
            Err(e) => {
                error!(category = %category, record = %record.name, error = %e, "skipping record");
                stats.skipped_records += 1;
                continue;
            }
        };
        for sample in samples {
            let name = sample.name;
            match sink.push(sample) {
                Ok(()) => stats.samples += 1,
                Err(SinkError::Capacity(max)) => {
                    if !capacity_reported {
                        warn!(category = %category, max, "sample limit reached, dropping the rest");
                        capacity_reported = true;
                    }
                    stats.dropped_samples += 1;
                }
                Err(e) => {
                    warn!(category = %category, record = %record.name, metric = name, error = %e, "dropping sample");
                    stats.dropped_samples += 1;
                }
            }
        }
    }

    if stats.dropped_samples > 0 {
        warn!(
            category = %category,
            dropped = stats.dropped_samples,
            "sink rejected samples"
        );
    }
    stats
}

fn fail_all(started: Instant, err: CategoryError) -> Vec<CategoryReport> {
    Category::ALL
        .into_iter()
        .map(|category| finish(category, started, Err(err.clone())))
        .collect()
}

fn finish(
    category: Category,
    started: Instant,
    result: Result<CategoryStats, CategoryError>,
) -> CategoryReport {
    let elapsed = started.elapsed();
    match &result {
        Ok(stats) => debug!(
            category = %category,
            records = stats.records,
            samples = stats.samples,
            duration_ms = elapsed.as_millis() as u64,
            "category collected"
        ),
        Err(e) => error!(
            category = %category,
            error = %e,
            duration_ms = elapsed.as_millis() as u64,
            "category failed"
        ),
    }
    CategoryReport {
        category,
        elapsed,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::MetricSample;
    use crate::retriever::mock::MockRetriever;
    use crate::sink::PrometheusSink;

    fn collector(retriever: MockRetriever) -> Collector<MockRetriever> {
        Collector::new(retriever, CollectorConfig::default())
    }

    fn shared(retriever: MockRetriever) -> Collector<MockRetriever> {
        Collector::new(
            retriever,
            CollectorConfig {
                session_mode: SessionMode::Shared,
                ..CollectorConfig::default()
            },
        )
    }

    fn count(samples: &[MetricSample], prefix: &str) -> usize {
        samples.iter().filter(|s| s.name.starts_with(prefix)).count()
    }

    #[tokio::test]
    async fn typical_cluster_emits_every_category_in_order() {
        let c = collector(MockRetriever::typical_cluster());
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(report.status(), CycleStatus::Success);
        let order: Vec<Category> = report.categories.iter().map(|r| r.category).collect();
        assert_eq!(order, Category::ALL);
        assert_eq!(c.retriever().queried(), Category::ALL);

        let expected = Category::Server.gauges_per_record()
            + 2 * Category::Queue.gauges_per_record()
            + 3 * Category::Node.gauges_per_record()
            + 2 * Category::Job.gauges_per_record();
        assert_eq!(samples.len(), expected);
        assert_eq!(report.samples(), expected);

        // Samples are grouped by category in cycle order.
        let first_job = samples.iter().position(|s| s.name.starts_with("jobs_")).unwrap();
        assert!(samples[..first_job].iter().all(|s| !s.name.starts_with("jobs_")));
        assert_eq!(samples[0].name, "server_state");
    }

    #[tokio::test]
    async fn node_query_failure_is_isolated() {
        let retriever = MockRetriever::typical_cluster()
            .fail_query(Category::Node, "pbsnodes: cannot connect to server");
        let c = collector(retriever);
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(report.status(), CycleStatus::Partial);
        assert!(matches!(
            report.category(Category::Node).unwrap().result,
            Err(CategoryError::Query(_))
        ));
        assert_eq!(count(&samples, "node_"), 0);
        assert_eq!(count(&samples, "jobs_"), 2 * Category::Job.gauges_per_record());
        assert_eq!(
            report.category(Category::Queue).unwrap().result.as_ref().unwrap().samples,
            2 * Category::Queue.gauges_per_record()
        );
        assert_eq!(
            report.category(Category::Server).unwrap().result.as_ref().unwrap().samples,
            Category::Server.gauges_per_record()
        );

        // The failed query still released its session.
        assert_eq!(c.retriever().connect_attempts(), 4);
        assert_eq!(c.retriever().disconnects(), 4);
    }

    #[tokio::test]
    async fn empty_categories_emit_nothing_but_succeed() {
        let c = collector(MockRetriever::empty_cluster());
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(report.status(), CycleStatus::Success);
        assert_eq!(samples.len(), Category::Server.gauges_per_record());
        let jobs = report.category(Category::Job).unwrap();
        assert_eq!(jobs.result, Ok(CategoryStats::default()));
    }

    #[tokio::test]
    async fn connect_failure_fails_only_that_category() {
        let c = collector(MockRetriever::typical_cluster().refuse_connect(1));
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert!(matches!(
            report.category(Category::Queue).unwrap().result,
            Err(CategoryError::Connection(_))
        ));
        assert_eq!(count(&samples, "queue_"), 0);
        assert_eq!(report.status(), CycleStatus::Partial);
        assert_eq!(c.retriever().connect_attempts(), 4);
        assert_eq!(c.retriever().disconnects(), 3);
    }

    #[tokio::test]
    async fn unreachable_scheduler_fails_the_cycle_without_panicking() {
        let c = collector(MockRetriever::typical_cluster().refuse_connections());
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(report.status(), CycleStatus::Failed);
        assert!(samples.is_empty());
        assert_eq!(c.retriever().disconnects(), 0);
    }

    #[tokio::test]
    async fn slow_query_times_out_and_later_categories_do_not_connect() {
        let retriever = MockRetriever::typical_cluster()
            .delay_query(Category::Node, Duration::from_secs(5));
        let c = Collector::new(
            retriever,
            CollectorConfig {
                cycle_timeout: Duration::from_millis(100),
                ..CollectorConfig::default()
            },
        );
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert!(report.elapsed < Duration::from_secs(2));
        assert!(report.category(Category::Server).unwrap().result.is_ok());
        assert!(report.category(Category::Queue).unwrap().result.is_ok());
        for category in [Category::Node, Category::Job] {
            assert_eq!(
                report.category(category).unwrap().result,
                Err(CategoryError::Timeout(Duration::from_millis(100)))
            );
        }
        assert_eq!(c.retriever().connect_attempts(), 3);
        assert_eq!(c.retriever().disconnects(), 3);
        assert_eq!(report.status(), CycleStatus::Partial);
    }

    #[tokio::test]
    async fn multiple_server_records_fail_only_the_server_category() {
        let c = collector(MockRetriever::split_brain_cluster());
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(
            report.category(Category::Server).unwrap().result,
            Err(CategoryError::Cardinality(2))
        );
        assert_eq!(count(&samples, "server_"), 0);
        assert!(count(&samples, "queue_") > 0);
        assert_eq!(c.retriever().disconnects(), 4);
    }

    #[tokio::test]
    async fn undecodable_record_is_skipped() {
        let mut records = crate::retriever::mock::scenarios::typical_cluster_records();
        records.records_mut(Category::Node)[1] = BatchStatus::new("cn002").with("pcpus", "many");
        let c = collector(MockRetriever::new(records));
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        let nodes = report.category(Category::Node).unwrap().result.as_ref().unwrap();
        assert_eq!(nodes.records, 3);
        assert_eq!(nodes.skipped_records, 1);
        assert_eq!(nodes.samples, 2 * Category::Node.gauges_per_record());
        assert_eq!(report.skipped_records(), 1);
        assert_eq!(report.status(), CycleStatus::Partial);
    }

    #[tokio::test]
    async fn shared_session_is_opened_once() {
        let c = shared(MockRetriever::typical_cluster().fail_query(Category::Queue, "qstat: bad"));
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(c.retriever().connect_attempts(), 1);
        assert_eq!(c.retriever().disconnects(), 1);
        assert!(report.category(Category::Queue).unwrap().result.is_err());
        assert!(report.category(Category::Job).unwrap().result.is_ok());
    }

    #[tokio::test]
    async fn shared_connect_failure_fails_every_category() {
        let c = shared(MockRetriever::typical_cluster().refuse_connections());
        let mut samples: Vec<MetricSample> = Vec::new();
        let report = c.collect(&mut samples).await;

        assert_eq!(report.categories.len(), 4);
        assert!(
            report
                .categories
                .iter()
                .all(|r| matches!(r.result, Err(CategoryError::Connection(_))))
        );
        assert_eq!(report.status(), CycleStatus::Failed);
    }

    #[tokio::test]
    async fn sink_capacity_drops_samples_without_aborting() {
        let c = collector(MockRetriever::typical_cluster());
        let mut sink = PrometheusSink::new("pbspro", "qstat").with_max_samples(40);
        let report = c.collect(&mut sink).await;

        assert_eq!(report.samples(), 40);
        assert!(report.dropped_samples() > 0);
        assert_eq!(report.status(), CycleStatus::Partial);
        assert_eq!(c.retriever().queried(), Category::ALL);
    }

    #[tokio::test]
    async fn end_to_end_exposition() {
        let c = collector(MockRetriever::typical_cluster());
        let mut sink = PrometheusSink::new("pbspro", "qstat");
        let report = c.collect(&mut sink).await;
        sink.record_cycle(&report).unwrap();
        let text = sink.encode().unwrap();

        let total = text
            .lines()
            .find(|l| l.starts_with("pbspro_qstat_server_total_jobs{"))
            .unwrap();
        assert!(total.contains("ServerName=\"headnode\""));
        assert!(total.ends_with(" 42"));
        assert!(text.contains("JobOwner=\"alice_cluster\""));
        assert!(text.contains("pbspro_scrape_category_success{category=\"job\"} 1"));
    }
}
