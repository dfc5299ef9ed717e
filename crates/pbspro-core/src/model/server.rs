//! Server status snapshot.

use super::attr::{Decoder, LicenseCount, StateCount};
use super::BatchStatus;
use crate::error::MappingError;

/// Decoded status of the PBS server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerState {
    pub name: String,
    pub host: String,
    pub default_queue: String,
    pub mail_from: String,
    pub version: String,

    /// 1 when `server_state` is `Active`.
    pub active: u8,
    pub scheduling: u8,
    pub total_jobs: i64,
    pub state_count: StateCount,
    pub log_events: i64,
    pub query_other_jobs: u8,
    pub resources_default_ncpus: i64,
    pub default_chunk_ncpus: i64,
    pub resources_assigned_ncpus: i64,
    pub resources_assigned_nodect: i64,
    pub scheduler_iteration: i64,
    pub flicenses: i64,
    pub resv_enable: u8,
    pub node_fail_requeue: i64,
    pub max_array_size: i64,
    pub pbs_license_min: i64,
    pub pbs_license_max: i64,
    pub pbs_license_linger_time: i64,
    pub license_count: LicenseCount,
    pub eligible_time_enable: u8,
    pub job_history_enable: u8,
    /// Seconds.
    pub job_history_duration: i64,
    pub max_concurrent_provision: i64,
    pub power_provisioning: u8,
}

impl ServerState {
    pub fn decode(record: &BatchStatus) -> Result<Self, MappingError> {
        let d = Decoder::new(record);
        Ok(Self {
            name: record.name.clone(),
            host: d.text("server_host"),
            default_queue: d.text("default_queue"),
            mail_from: d.text("mail_from"),
            version: d.text("pbs_version"),

            active: u8::from(record.get("server_state").map(str::trim) == Some("Active")),
            scheduling: d.flag("scheduling")?,
            total_jobs: d.int("total_jobs")?,
            state_count: d.state_count()?,
            log_events: d.int("log_events")?,
            query_other_jobs: d.flag("query_other_jobs")?,
            resources_default_ncpus: d.int_res("resources_default", "ncpus")?,
            default_chunk_ncpus: d.int_res("default_chunk", "ncpus")?,
            resources_assigned_ncpus: d.int_res("resources_assigned", "ncpus")?,
            resources_assigned_nodect: d.int_res("resources_assigned", "nodect")?,
            scheduler_iteration: d.int("scheduler_iteration")?,
            flicenses: d.int("FLicenses")?,
            resv_enable: d.flag("resv_enable")?,
            node_fail_requeue: d.int("node_fail_requeue")?,
            max_array_size: d.int("max_array_size")?,
            pbs_license_min: d.int("pbs_license_min")?,
            pbs_license_max: d.int("pbs_license_max")?,
            pbs_license_linger_time: d.int("pbs_license_linger_time")?,
            license_count: d.license_count()?,
            eligible_time_enable: d.flag("eligible_time_enable")?,
            job_history_enable: d.flag("job_history_enable")?,
            job_history_duration: d.duration("job_history_duration")?,
            max_concurrent_provision: d.int("max_concurrent_provision")?,
            power_provisioning: d.flag("power_provisioning")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_status() {
        let record = BatchStatus::new("headnode")
            .with("server_state", "Active")
            .with("server_host", "headnode.cluster")
            .with("scheduling", "True")
            .with("total_jobs", "42")
            .with("state_count", "Transit:0 Queued:10 Held:1 Waiting:0 Running:31 Exiting:0 Begun:0")
            .with("default_queue", "workq")
            .with("mail_from", "adm")
            .with_resource("resources_assigned", "ncpus", "248")
            .with("license_count", "Avail_Global:100 Avail_Local:4 Used:20 High_Use:35")
            .with("job_history_duration", "336:00:00")
            .with("pbs_version", "2022.1.0");

        let server = ServerState::decode(&record).unwrap();
        assert_eq!(server.name, "headnode");
        assert_eq!(server.host, "headnode.cluster");
        assert_eq!(server.active, 1);
        assert_eq!(server.scheduling, 1);
        assert_eq!(server.total_jobs, 42);
        assert_eq!(server.state_count.running, 31);
        assert_eq!(server.resources_assigned_ncpus, 248);
        assert_eq!(server.license_count.high_use, 35);
        assert_eq!(server.job_history_duration, 336 * 3600);
        assert_eq!(server.version, "2022.1.0");
        assert_eq!(server.power_provisioning, 0);
    }

    #[test]
    fn idle_server_is_not_active() {
        let record = BatchStatus::new("headnode").with("server_state", "Idle");
        assert_eq!(ServerState::decode(&record).unwrap().active, 0);
    }

    #[test]
    fn malformed_counter_fails_the_record() {
        let record = BatchStatus::new("headnode").with("total_jobs", "forty-two");
        let err = ServerState::decode(&record).unwrap_err();
        assert_eq!(err.attribute, "total_jobs");
    }
}
