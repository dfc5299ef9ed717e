//! Compute node status snapshot.

use super::attr::Decoder;
use super::BatchStatus;
use crate::error::MappingError;

/// Decoded status of one compute node (vnode).
///
/// Memory quantities are in bytes, times in epoch seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    pub name: String,
    pub mom: String,
    pub ntype: String,
    pub state: String,
    pub jobs: String,
    pub available_arch: String,
    pub available_host: String,
    pub available_applications: String,
    pub available_platform: String,
    pub available_software: String,
    pub available_vnode: String,
    pub sharing: String,

    pub pcpus: i64,
    pub available_mem: u64,
    pub available_ncpus: i64,
    pub assigned_accelerator_memory: u64,
    pub assigned_hbmem: u64,
    pub assigned_mem: u64,
    pub assigned_naccelerators: i64,
    pub assigned_ncpus: i64,
    pub assigned_vmem: u64,
    pub resv_enable: u8,
    pub last_state_change_time: i64,
    pub last_used_time: i64,
}

impl NodeState {
    pub fn decode(record: &BatchStatus) -> Result<Self, MappingError> {
        let d = Decoder::new(record);
        Ok(Self {
            name: record.name.clone(),
            mom: d.text("Mom"),
            ntype: d.text("ntype"),
            state: d.text("state"),
            jobs: d.text("jobs"),
            available_arch: d.text_res("resources_available", "arch"),
            available_host: d.text_res("resources_available", "host"),
            available_applications: d.text_res("resources_available", "applications"),
            available_platform: d.text_res("resources_available", "platform"),
            available_software: d.text_res("resources_available", "software"),
            available_vnode: d.text_res("resources_available", "vnode"),
            sharing: d.text("sharing"),

            pcpus: d.int("pcpus")?,
            available_mem: d.size_res("resources_available", "mem")?,
            available_ncpus: d.int_res("resources_available", "ncpus")?,
            assigned_accelerator_memory: d.size_res("resources_assigned", "accelerator_memory")?,
            assigned_hbmem: d.size_res("resources_assigned", "hbmem")?,
            assigned_mem: d.size_res("resources_assigned", "mem")?,
            assigned_naccelerators: d.int_res("resources_assigned", "naccelerators")?,
            assigned_ncpus: d.int_res("resources_assigned", "ncpus")?,
            assigned_vmem: d.size_res("resources_assigned", "vmem")?,
            resv_enable: d.flag("resv_enable")?,
            last_state_change_time: d.timestamp("last_state_change_time")?,
            last_used_time: d.timestamp("last_used_time")?,
        })
    }
}
