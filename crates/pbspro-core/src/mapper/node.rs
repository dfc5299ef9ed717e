//! Node gauges.

use super::{GaugeDef, MetricSample, build};
use crate::model::NodeState;

pub const NODE_LABELS: [&str; 12] = [
    "NodeName",
    "Mom",
    "Ntype",
    "NodeState",
    "RunningJobs",
    "ResourcesAvailableArch",
    "ResourcesAvailableHost",
    "ResourcesAvailableApplications",
    "ResourcesAvailablePlatform",
    "ResourcesAvailableSoftware",
    "ResourcesAvailableVnodes",
    "Sharing",
];

pub(super) static GAUGES: &[GaugeDef<NodeState>] = &[
    GaugeDef {
        name: "node_pcpus",
        help: "Physical CPUs on the node.",
        value: |n| n.pcpus as f64,
    },
    GaugeDef {
        name: "node_resources_available_mem",
        help: "Memory available on the node in bytes.",
        value: |n| n.available_mem as f64,
    },
    GaugeDef {
        name: "node_resources_available_ncpus",
        help: "CPUs available on the node.",
        value: |n| n.available_ncpus as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_accelerator_memory",
        help: "Accelerator memory assigned to jobs in bytes.",
        value: |n| n.assigned_accelerator_memory as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_hbmem",
        help: "High-bandwidth memory assigned to jobs in bytes.",
        value: |n| n.assigned_hbmem as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_mem",
        help: "Memory assigned to jobs in bytes.",
        value: |n| n.assigned_mem as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_naccelerators",
        help: "Accelerators assigned to jobs.",
        value: |n| n.assigned_naccelerators as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_ncpus",
        help: "CPUs assigned to jobs.",
        value: |n| n.assigned_ncpus as f64,
    },
    GaugeDef {
        name: "node_resources_assigned_vmem",
        help: "Virtual memory assigned to jobs in bytes.",
        value: |n| n.assigned_vmem as f64,
    },
    GaugeDef {
        name: "node_resv_enable",
        help: "Whether the node accepts reservations, 1 if true.",
        value: |n| n.resv_enable.into(),
    },
    GaugeDef {
        name: "node_last_change_time",
        help: "Unix time of the last node state change.",
        value: |n| n.last_state_change_time as f64,
    },
    GaugeDef {
        name: "node_last_used_time",
        help: "Unix time the node last ran a job.",
        value: |n| n.last_used_time as f64,
    },
];

pub(super) fn samples(node: &NodeState) -> Vec<MetricSample> {
    build(
        GAUGES,
        node,
        &NODE_LABELS,
        vec![
            node.name.clone(),
            node.mom.clone(),
            node.ntype.clone(),
            node.state.clone(),
            node.jobs.clone(),
            node.available_arch.clone(),
            node.available_host.clone(),
            node.available_applications.clone(),
            node.available_platform.clone(),
            node.available_software.clone(),
            node.available_vnode.clone(),
            node.sharing.clone(),
        ],
    )
}
