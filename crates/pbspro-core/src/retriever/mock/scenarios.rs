//! Pre-built cluster scenarios for testing.
//!
//! The records use the attribute spellings PBS Pro prints in
//! `qstat -f -F json` and `pbsnodes -a -F json` output.

use super::{ClusterRecords, MockRetriever};
use crate::model::BatchStatus;

/// A small, healthy cluster.
///
/// Includes: server `headnode`, queues `workq` and `gpuq`, compute nodes
/// `cn001`..`cn003` (one of them offline) and two jobs owned by alice and bob.
pub fn typical_cluster_records() -> ClusterRecords {
    ClusterRecords {
        servers: vec![headnode()],
        queues: vec![
            BatchStatus::new("workq")
                .with("queue_type", "Execution")
                .with("total_jobs", "7")
                .with(
                    "state_count",
                    "Transit:0 Queued:3 Held:0 Waiting:0 Running:4 Exiting:0 Begun:0",
                )
                .with_resource("resources_assigned", "ncpus", "64")
                .with_resource("resources_assigned", "nodect", "2")
                .with("enabled", "True")
                .with("started", "True"),
            BatchStatus::new("gpuq")
                .with("queue_type", "Execution")
                .with("total_jobs", "1")
                .with(
                    "state_count",
                    "Transit:0 Queued:1 Held:0 Waiting:0 Running:0 Exiting:0 Begun:0",
                )
                .with("enabled", "True")
                .with("started", "False"),
        ],
        nodes: vec![
            compute_node("cn001", "free", "101.headnode/0, 101.headnode/1"),
            compute_node("cn002", "job-busy", "102.headnode/0"),
            BatchStatus::new("cn003")
                .with("Mom", "cn003.cluster")
                .with("ntype", "PBS")
                .with("state", "offline")
                .with("pcpus", "32")
                .with_resource("resources_available", "arch", "linux")
                .with_resource("resources_available", "host", "cn003")
                .with_resource("resources_available", "vnode", "cn003")
                .with("resv_enable", "False")
                .with("sharing", "default_shared")
                .with("last_state_change_time", "1729150000"),
        ],
        jobs: vec![
            BatchStatus::new("101.headnode")
                .with("Job_Name", "relax")
                .with("Job_Owner", "alice@cluster")
                .with("job_state", "R")
                .with("queue", "workq")
                .with("server", "headnode")
                .with("Checkpoint", "u")
                .with("Error_Path", "headnode:/home/alice/relax.e101")
                .with("exec_host", "cn001/0*32")
                .with("exec_vnode", "(cn001:ncpus=32:mem=64gb)")
                .with("Hold_Types", "n")
                .with("Join_Path", "oe")
                .with("Keep_Files", "n")
                .with("Mail_Points", "a")
                .with("Output_Path", "headnode:/home/alice/relax.o101")
                .with("Priority", "0")
                .with("Rerunable", "True")
                .with("ctime", "Thu Oct 17 09:00:00 2024")
                .with("qtime", "Thu Oct 17 09:00:00 2024")
                .with("etime", "Thu Oct 17 09:00:00 2024")
                .with("stime", "Thu Oct 17 09:05:00 2024")
                .with("mtime", "Thu Oct 17 09:05:01 2024")
                .with_resource("resources_used", "cpupercent", "3150")
                .with_resource("resources_used", "cput", "10:30:00")
                .with_resource("resources_used", "mem", "50331648kb")
                .with_resource("resources_used", "ncpus", "32")
                .with_resource("resources_used", "vmem", "60gb")
                .with_resource("resources_used", "walltime", "00:20:00")
                .with_resource("Resource_List", "ncpus", "32")
                .with_resource("Resource_List", "nodect", "1")
                .with_resource("Resource_List", "place", "free")
                .with_resource("Resource_List", "select", "1:ncpus=32:mem=64gb")
                .with_resource("Resource_List", "walltime", "04:00:00")
                .with("session_id", "48213")
                .with("substate", "42")
                .with("run_count", "1")
                .with("jobdir", "/home/alice")
                .with(
                    "Variable_List",
                    "PBS_O_HOME=/home/alice,PBS_O_LANG=en_US.UTF-8,\
                     PBS_O_LOGNAME=alice,PBS_O_PATH=/usr/bin:/bin,\
                     PBS_O_MAIL=/var/spool/mail/alice,PBS_O_SHELL=/bin/bash,\
                     PBS_O_WORKDIR=/scratch/alice,PBS_O_SYSTEM=Linux,\
                     PBS_O_QUEUE=workq,PBS_O_HOST=login01",
                )
                .with("comment", "Job run at Thu Oct 17 at 09:05 on (cn001:ncpus=32)")
                .with("Submit_arguments", "relax.pbs")
                .with("project", "_pbs_project_default"),
            BatchStatus::new("102.headnode")
                .with("Job_Name", "mesh")
                .with("Job_Owner", "bob@cluster")
                .with("job_state", "Q")
                .with("queue", "gpuq")
                .with("server", "headnode")
                .with("Priority", "10")
                .with("Rerunable", "False")
                .with("ctime", "1729155600")
                .with("qtime", "1729155600")
                .with_resource("Resource_List", "ncpus", "8")
                .with_resource("Resource_List", "nodect", "1")
                .with_resource("Resource_List", "walltime", "30:00")
                .with("substate", "10")
                .with(
                    "Variable_List",
                    "PBS_O_HOME=/home/bob,PBS_O_LANG=C,PBS_O_WORKDIR=/home/bob/mesh",
                )
                .with("Submit_arguments", "-q gpuq mesh.pbs"),
        ],
    }
}

fn headnode() -> BatchStatus {
    BatchStatus::new("headnode")
        .with("server_state", "Active")
        .with("server_host", "headnode.cluster")
        .with("scheduling", "True")
        .with("total_jobs", "42")
        .with(
            "state_count",
            "Transit:0 Queued:10 Held:1 Waiting:0 Running:31 Exiting:0 Begun:0",
        )
        .with("default_queue", "workq")
        .with("log_events", "511")
        .with("mail_from", "adm")
        .with("query_other_jobs", "True")
        .with_resource("resources_default", "ncpus", "1")
        .with_resource("default_chunk", "ncpus", "1")
        .with_resource("resources_assigned", "ncpus", "248")
        .with_resource("resources_assigned", "nodect", "8")
        .with("scheduler_iteration", "600")
        .with("FLicenses", "2000000")
        .with("resv_enable", "True")
        .with("node_fail_requeue", "310")
        .with("max_array_size", "10000")
        .with("pbs_license_min", "0")
        .with("pbs_license_max", "2147483647")
        .with("pbs_license_linger_time", "31536000")
        .with(
            "license_count",
            "Avail_Global:1000000 Avail_Local:1000000 Used:0 High_Use:0",
        )
        .with("pbs_version", "2022.1.0")
        .with("eligible_time_enable", "False")
        .with("job_history_enable", "True")
        .with("job_history_duration", "336:00:00")
        .with("max_concurrent_provision", "5")
        .with("power_provisioning", "False")
}

fn compute_node(name: &str, state: &str, jobs: &str) -> BatchStatus {
    BatchStatus::new(name)
        .with("Mom", format!("{name}.cluster"))
        .with("ntype", "PBS")
        .with("state", state)
        .with("jobs", jobs)
        .with("pcpus", "32")
        .with_resource("resources_available", "arch", "linux")
        .with_resource("resources_available", "host", name)
        .with_resource("resources_available", "mem", "128gb")
        .with_resource("resources_available", "ncpus", "32")
        .with_resource("resources_available", "vnode", name)
        .with_resource("resources_assigned", "accelerator_memory", "0kb")
        .with_resource("resources_assigned", "hbmem", "0kb")
        .with_resource("resources_assigned", "mem", "64gb")
        .with_resource("resources_assigned", "naccelerators", "0")
        .with_resource("resources_assigned", "ncpus", "32")
        .with_resource("resources_assigned", "vmem", "0kb")
        .with("resv_enable", "True")
        .with("sharing", "default_shared")
        .with("last_state_change_time", "1729152000")
        .with("last_used_time", "1729155900")
}

#[allow(dead_code)]
impl MockRetriever {
    /// Retriever serving [`typical_cluster_records`].
    pub fn typical_cluster() -> Self {
        Self::new(typical_cluster_records())
    }

    /// Retriever serving a cluster with no queues, nodes or jobs.
    pub fn empty_cluster() -> Self {
        Self::new(ClusterRecords {
            servers: vec![headnode()],
            ..ClusterRecords::default()
        })
    }

    /// Retriever whose server query reports two servers.
    pub fn split_brain_cluster() -> Self {
        let mut records = typical_cluster_records();
        records.servers.push(
            BatchStatus::new("headnode2")
                .with("server_state", "Active")
                .with("total_jobs", "0"),
        );
        Self::new(records)
    }
}
