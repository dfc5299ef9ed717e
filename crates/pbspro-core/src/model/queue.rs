//! Queue status snapshot.

use super::attr::{Decoder, StateCount};
use super::BatchStatus;
use crate::error::MappingError;

/// Decoded status of one queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub name: String,
    pub queue_type: String,
    pub total_jobs: i64,
    pub state_count: StateCount,
    pub resources_assigned_ncpus: i64,
    pub resources_assigned_nodect: i64,
    pub enabled: u8,
    pub started: u8,
}

impl QueueState {
    pub fn decode(record: &BatchStatus) -> Result<Self, MappingError> {
        let d = Decoder::new(record);
        Ok(Self {
            name: record.name.clone(),
            queue_type: d.text("queue_type"),
            total_jobs: d.int("total_jobs")?,
            state_count: d.state_count()?,
            resources_assigned_ncpus: d.int_res("resources_assigned", "ncpus")?,
            resources_assigned_nodect: d.int_res("resources_assigned", "nodect")?,
            enabled: d.flag("enabled")?,
            started: d.flag("started")?,
        })
    }
}
