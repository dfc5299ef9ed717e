//! Job status snapshot.

use std::collections::HashMap;

use super::attr::Decoder;
use super::BatchStatus;
use crate::error::MappingError;

/// Decoded status of one job.
///
/// Durations are in seconds, memory in bytes, times in epoch seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobState {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub state: String,
    pub queue: String,
    pub server: String,
    pub checkpoint: String,
    pub error_path: String,
    pub exec_host: String,
    pub exec_vnode: String,
    pub hold_types: String,
    pub join_path: String,
    pub keep_files: String,
    pub mail_points: String,
    pub output_path: String,
    pub resource_list_place: String,
    pub resource_list_select: String,
    pub resource_list_software: String,
    pub jobdir: String,
    /// Raw `Variable_List` as reported by the server.
    pub variable_list: String,
    pub env: JobEnvironment,
    pub comment: String,
    pub submit_arguments: String,
    pub project: String,

    pub used_cpupercent: f64,
    pub used_cput: i64,
    pub used_mem: u64,
    pub used_ncpus: i64,
    pub used_vmem: u64,
    pub used_walltime: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub priority: i64,
    pub qtime: i64,
    pub rerunable: u8,
    pub list_ncpus: i64,
    pub list_nodect: i64,
    pub list_walltime: i64,
    pub stime: i64,
    pub session_id: i64,
    pub substate: i64,
    pub etime: i64,
    pub run_count: i64,
}

/// Submission environment captured in `Variable_List` (`PBS_O_*`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobEnvironment {
    pub home: String,
    pub lang: String,
    pub logname: String,
    pub path: String,
    pub mail: String,
    pub shell: String,
    pub workdir: String,
    pub system: String,
    pub queue: String,
    pub host: String,
}

impl JobEnvironment {
    fn from_variable_list(raw: &str) -> Self {
        let mut vars = parse_variable_list(raw);
        let mut take = |key: &str| vars.remove(key).unwrap_or_default();
        Self {
            home: take("PBS_O_HOME"),
            lang: take("PBS_O_LANG"),
            logname: take("PBS_O_LOGNAME"),
            path: take("PBS_O_PATH"),
            mail: take("PBS_O_MAIL"),
            shell: take("PBS_O_SHELL"),
            workdir: take("PBS_O_WORKDIR"),
            system: take("PBS_O_SYSTEM"),
            queue: take("PBS_O_QUEUE"),
            host: take("PBS_O_HOST"),
        }
    }
}

/// Splits `K=V,K=V` on commas not escaped with a backslash.
fn parse_variable_list(raw: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let mut current = String::new();
    let mut chars = raw.chars();

    let mut flush = |entry: &mut String| {
        if let Some((key, value)) = entry.split_once('=') {
            vars.insert(key.trim().to_string(), value.to_string());
        }
        entry.clear();
    };

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(',') => current.push(','),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ',' => flush(&mut current),
            _ => current.push(c),
        }
    }
    flush(&mut current);
    vars
}

impl JobState {
    pub fn decode(record: &BatchStatus) -> Result<Self, MappingError> {
        let d = Decoder::new(record);
        let variable_list = d.text("Variable_List");
        Ok(Self {
            id: record.name.clone(),
            name: d.text("Job_Name"),
            owner: d.text("Job_Owner"),
            state: d.text("job_state"),
            queue: d.text("queue"),
            server: d.text("server"),
            checkpoint: d.text("Checkpoint"),
            error_path: d.text("Error_Path"),
            exec_host: d.text("exec_host"),
            exec_vnode: d.text("exec_vnode"),
            hold_types: d.text("Hold_Types"),
            join_path: d.text("Join_Path"),
            keep_files: d.text("Keep_Files"),
            mail_points: d.text("Mail_Points"),
            output_path: d.text("Output_Path"),
            resource_list_place: d.text_res("Resource_List", "place"),
            resource_list_select: d.text_res("Resource_List", "select"),
            resource_list_software: d.text_res("Resource_List", "software"),
            jobdir: d.text("jobdir"),
            env: JobEnvironment::from_variable_list(&variable_list),
            variable_list,
            comment: d.text("comment"),
            submit_arguments: d.text("Submit_arguments"),
            project: d.text("project"),

            used_cpupercent: d.float_res("resources_used", "cpupercent")?,
            used_cput: d.duration_res("resources_used", "cput")?,
            used_mem: d.size_res("resources_used", "mem")?,
            used_ncpus: d.int_res("resources_used", "ncpus")?,
            used_vmem: d.size_res("resources_used", "vmem")?,
            used_walltime: d.duration_res("resources_used", "walltime")?,
            ctime: d.timestamp("ctime")?,
            mtime: d.timestamp("mtime")?,
            priority: d.int("Priority")?,
            qtime: d.timestamp("qtime")?,
            rerunable: d.flag("Rerunable")?,
            list_ncpus: d.int_res("Resource_List", "ncpus")?,
            list_nodect: d.int_res("Resource_List", "nodect")?,
            list_walltime: d.duration_res("Resource_List", "walltime")?,
            stime: d.timestamp("stime")?,
            session_id: d.int("session_id")?,
            substate: d.int("substate")?,
            etime: d.timestamp("etime")?,
            run_count: d.int("run_count")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_job_status() {
        let record = BatchStatus::new("101.headnode")
            .with("Job_Name", "relax")
            .with("Job_Owner", "alice@login1")
            .with("job_state", "R")
            .with("queue", "workq")
            .with_resource("resources_used", "cpupercent", "387")
            .with_resource("resources_used", "cput", "01:00:00")
            .with_resource("resources_used", "mem", "2048kb")
            .with_resource("resources_used", "walltime", "00:15:30")
            .with_resource("Resource_List", "ncpus", "4")
            .with_resource("Resource_List", "select", "1:ncpus=4")
            .with_resource("Resource_List", "walltime", "02:00:00")
            .with("ctime", "1729159200")
            .with("Rerunable", "True")
            .with("run_count", "1")
            .with(
                "Variable_List",
                "PBS_O_HOME=/home/alice,PBS_O_LANG=en_US.UTF-8,PBS_O_LOGNAME=alice,\
                 PBS_O_WORKDIR=/scratch/alice,PBS_O_QUEUE=workq,PBS_O_HOST=login1",
            );

        let job = JobState::decode(&record).unwrap();
        assert_eq!(job.id, "101.headnode");
        assert_eq!(job.owner, "alice@login1");
        assert_eq!(job.used_cpupercent, 387.0);
        assert_eq!(job.used_cput, 3600);
        assert_eq!(job.used_mem, 2048 * 1024);
        assert_eq!(job.used_walltime, 930);
        assert_eq!(job.list_walltime, 7200);
        assert_eq!(job.resource_list_select, "1:ncpus=4");
        assert_eq!(job.rerunable, 1);
        assert_eq!(job.env.home, "/home/alice");
        assert_eq!(job.env.lang, "en_US.UTF-8");
        assert_eq!(job.env.workdir, "/scratch/alice");
        assert_eq!(job.env.host, "login1");
        assert_eq!(job.env.shell, "");
    }

    #[test]
    fn variable_list_honours_escaped_commas() {
        let vars = parse_variable_list(r"PBS_O_PATH=/usr/bin,FOO=a\,b,EMPTY=,NOVALUE");
        assert_eq!(vars.get("PBS_O_PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(vars.get("FOO").map(String::as_str), Some("a,b"));
        assert_eq!(vars.get("EMPTY").map(String::as_str), Some(""));
        assert!(!vars.contains_key("NOVALUE"));
    }

    #[test]
    fn malformed_walltime_fails_the_job() {
        let record =
            BatchStatus::new("7.headnode").with_resource("resources_used", "walltime", "soon");
        let err = JobState::decode(&record).unwrap_err();
        assert_eq!(err.attribute, "resources_used.walltime");
    }

    #[test]
    fn overflowing_cput_fails_the_job_instead_of_wrapping() {
        let record = BatchStatus::new("8.headnode").with_resource(
            "resources_used",
            "cput",
            "9223372036854775807:00",
        );
        let err = JobState::decode(&record).unwrap_err();
        assert_eq!(err.record, "8.headnode");
        assert_eq!(err.attribute, "resources_used.cput");
        assert!(err.reason.contains("overflows"));
    }
}
