//! Server gauges.

use super::{GaugeDef, MetricSample, build};
use crate::model::ServerState;

pub const SERVER_LABELS: [&str; 5] = [
    "ServerName",
    "ServerHost",
    "DefaultQueue",
    "MailFrom",
    "PBSVersion",
];

pub(super) static GAUGES: &[GaugeDef<ServerState>] = &[
    GaugeDef {
        name: "server_state",
        help: "Server state, 1 if Active.",
        value: |s| s.active.into(),
    },
    GaugeDef {
        name: "server_scheduling",
        help: "Whether the server is scheduling jobs, 1 if true.",
        value: |s| s.scheduling.into(),
    },
    GaugeDef {
        name: "server_total_jobs",
        help: "Total number of jobs managed by the server.",
        value: |s| s.total_jobs as f64,
    },
    GaugeDef {
        name: "server_transit_state_count",
        help: "Jobs in transit state.",
        value: |s| s.state_count.transit as f64,
    },
    GaugeDef {
        name: "server_queued_state_count",
        help: "Jobs in queued state.",
        value: |s| s.state_count.queued as f64,
    },
    GaugeDef {
        name: "server_held_state_count",
        help: "Jobs in held state.",
        value: |s| s.state_count.held as f64,
    },
    GaugeDef {
        name: "server_waiting_state_count",
        help: "Jobs in waiting state.",
        value: |s| s.state_count.waiting as f64,
    },
    GaugeDef {
        name: "server_running_state_count",
        help: "Jobs in running state.",
        value: |s| s.state_count.running as f64,
    },
    GaugeDef {
        name: "server_exiting_state_count",
        help: "Jobs in exiting state.",
        value: |s| s.state_count.exiting as f64,
    },
    GaugeDef {
        name: "server_begun_state_count",
        help: "Array jobs in begun state.",
        value: |s| s.state_count.begun as f64,
    },
    GaugeDef {
        name: "server_log_events",
        help: "Server log event mask.",
        value: |s| s.log_events as f64,
    },
    GaugeDef {
        name: "server_query_other_jobs",
        help: "Whether users may query other users' jobs, 1 if true.",
        value: |s| s.query_other_jobs.into(),
    },
    GaugeDef {
        name: "server_resources_default_ncpus",
        help: "Default ncpus assigned to jobs.",
        value: |s| s.resources_default_ncpus as f64,
    },
    GaugeDef {
        name: "server_default_chunk_ncpus",
        help: "Default ncpus per chunk.",
        value: |s| s.default_chunk_ncpus as f64,
    },
    GaugeDef {
        name: "server_resources_assigned_ncpus",
        help: "CPUs assigned to running jobs.",
        value: |s| s.resources_assigned_ncpus as f64,
    },
    GaugeDef {
        name: "server_resources_assigned_nodect",
        help: "Nodes assigned to running jobs.",
        value: |s| s.resources_assigned_nodect as f64,
    },
    GaugeDef {
        name: "server_scheduler_iteration",
        help: "Scheduler cycle interval in seconds.",
        value: |s| s.scheduler_iteration as f64,
    },
    GaugeDef {
        name: "server_flicenses",
        help: "Floating licenses available to the server.",
        value: |s| s.flicenses as f64,
    },
    GaugeDef {
        name: "server_resv_enable",
        help: "Whether advance reservations are enabled, 1 if true.",
        value: |s| s.resv_enable.into(),
    },
    GaugeDef {
        name: "server_node_fail_requeue",
        help: "Seconds before jobs on a failed node are requeued.",
        value: |s| s.node_fail_requeue as f64,
    },
    GaugeDef {
        name: "server_max_array_size",
        help: "Maximum number of subjobs in an array job.",
        value: |s| s.max_array_size as f64,
    },
    GaugeDef {
        name: "server_pbs_license_min",
        help: "Minimum number of licenses kept checked out.",
        value: |s| s.pbs_license_min as f64,
    },
    GaugeDef {
        name: "server_pbs_license_max",
        help: "Maximum number of licenses checked out.",
        value: |s| s.pbs_license_max as f64,
    },
    GaugeDef {
        name: "server_pbs_license_linger_time",
        help: "Seconds an unused license is kept checked out.",
        value: |s| s.pbs_license_linger_time as f64,
    },
    GaugeDef {
        name: "server_license_count_avail_global",
        help: "Licenses available at the license server.",
        value: |s| s.license_count.avail_global as f64,
    },
    GaugeDef {
        name: "server_license_count_avail_local",
        help: "Licenses checked out but unused.",
        value: |s| s.license_count.avail_local as f64,
    },
    GaugeDef {
        name: "server_license_count_used",
        help: "Licenses in use.",
        value: |s| s.license_count.used as f64,
    },
    GaugeDef {
        name: "server_license_count_high_use",
        help: "Highest number of licenses in use.",
        value: |s| s.license_count.high_use as f64,
    },
    GaugeDef {
        name: "server_eligible_time_enable",
        help: "Whether eligible time accrual is enabled, 1 if true.",
        value: |s| s.eligible_time_enable.into(),
    },
    GaugeDef {
        name: "server_job_history_enable",
        help: "Whether job history is kept, 1 if true.",
        value: |s| s.job_history_enable.into(),
    },
    GaugeDef {
        name: "server_job_history_duration",
        help: "Seconds finished jobs are kept in history.",
        value: |s| s.job_history_duration as f64,
    },
    GaugeDef {
        name: "server_max_concurrent_provision",
        help: "Maximum number of vnodes provisioned concurrently.",
        value: |s| s.max_concurrent_provision as f64,
    },
    GaugeDef {
        name: "server_power_provisioning",
        help: "Whether power provisioning is enabled, 1 if true.",
        value: |s| s.power_provisioning.into(),
    },
];

pub(super) fn samples(server: &ServerState) -> Vec<MetricSample> {
    build(
        GAUGES,
        server,
        &SERVER_LABELS,
        vec![
            server.name.clone(),
            server.host.clone(),
            server.default_queue.clone(),
            server.mail_from.clone(),
            server.version.clone(),
        ],
    )
}
