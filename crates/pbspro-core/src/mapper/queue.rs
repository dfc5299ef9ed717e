//! Queue gauges.

use super::{GaugeDef, MetricSample, build};
use crate::model::QueueState;

pub const QUEUE_LABELS: [&str; 2] = ["QueueName", "QueueType"];

pub(super) static GAUGES: &[GaugeDef<QueueState>] = &[
    GaugeDef {
        name: "queue_total_jobs",
        help: "Total number of jobs in the queue.",
        value: |q| q.total_jobs as f64,
    },
    GaugeDef {
        name: "queue_transit_state_count",
        help: "Jobs in transit state.",
        value: |q| q.state_count.transit as f64,
    },
    GaugeDef {
        name: "queue_queued_state_count",
        help: "Jobs in queued state.",
        value: |q| q.state_count.queued as f64,
    },
    GaugeDef {
        name: "queue_held_state_count",
        help: "Jobs in held state.",
        value: |q| q.state_count.held as f64,
    },
    GaugeDef {
        name: "queue_waiting_state_count",
        help: "Jobs in waiting state.",
        value: |q| q.state_count.waiting as f64,
    },
    GaugeDef {
        name: "queue_running_state_count",
        help: "Jobs in running state.",
        value: |q| q.state_count.running as f64,
    },
    GaugeDef {
        name: "queue_exiting_state_count",
        help: "Jobs in exiting state.",
        value: |q| q.state_count.exiting as f64,
    },
    GaugeDef {
        name: "queue_begun_state_count",
        help: "Array jobs in begun state.",
        value: |q| q.state_count.begun as f64,
    },
    GaugeDef {
        name: "queue_resources_assigned_ncpus",
        help: "CPUs assigned to jobs of the queue.",
        value: |q| q.resources_assigned_ncpus as f64,
    },
    GaugeDef {
        name: "queue_resources_assigned_nodect",
        help: "Nodes assigned to jobs of the queue.",
        value: |q| q.resources_assigned_nodect as f64,
    },
    GaugeDef {
        name: "queue_enable",
        help: "Whether the queue accepts jobs, 1 if true.",
        value: |q| q.enabled.into(),
    },
    GaugeDef {
        name: "queue_started",
        help: "Whether jobs in the queue may run, 1 if true.",
        value: |q| q.started.into(),
    },
];

pub(super) fn samples(queue: &QueueState) -> Vec<MetricSample> {
    build(
        GAUGES,
        queue,
        &QUEUE_LABELS,
        vec![queue.name.clone(), queue.queue_type.clone()],
    )
}
