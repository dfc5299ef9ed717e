//! Job gauges.

use chrono::{DateTime, Local, SecondsFormat};

use super::{GaugeDef, MetricSample, build, sanitize_home, sanitize_lang, sanitize_owner};
use crate::model::JobState;

pub const JOB_LABELS: [&str; 33] = [
    "JobName",
    "JobOwner",
    "JobState",
    "Queue",
    "Server",
    "CheckPoint",
    "ErrorPath",
    "ExecHost",
    "ExecVnode",
    "HoldType",
    "JoinPath",
    "KeepFiles",
    "MailPoints",
    "OutputPath",
    "ResourceListPlace",
    "ResourceListSelect",
    "ResourceListSoftware",
    "JobDir",
    "VariableList",
    "VariableListHome",
    "VariableListLang",
    "VariableListLogname",
    "VariableListPath",
    "VariableListMail",
    "VariableListShell",
    // Spelling is part of the published label schema.
    "VariableListWrokdir",
    "VariableListSystem",
    "VariableListQueue",
    "VariableListHost",
    "Comment",
    "SubmitArguments",
    "Project",
    "LocalTime",
];

pub(super) static GAUGES: &[GaugeDef<JobState>] = &[
    GaugeDef {
        name: "jobs_resources_used_cpupercent",
        help: "CPU usage of the job in percent of one CPU.",
        value: |j| j.used_cpupercent,
    },
    GaugeDef {
        name: "jobs_resources_used_cput",
        help: "CPU time consumed by the job in seconds.",
        value: |j| j.used_cput as f64,
    },
    GaugeDef {
        name: "jobs_resources_used_mem",
        help: "Memory used by the job in bytes.",
        value: |j| j.used_mem as f64,
    },
    GaugeDef {
        name: "jobs_resources_used_ncpus",
        help: "CPUs used by the job.",
        value: |j| j.used_ncpus as f64,
    },
    GaugeDef {
        name: "jobs_resources_used_vmem",
        help: "Virtual memory used by the job in bytes.",
        value: |j| j.used_vmem as f64,
    },
    GaugeDef {
        name: "jobs_resources_used_walltime",
        help: "Wall time consumed by the job in seconds.",
        value: |j| j.used_walltime as f64,
    },
    GaugeDef {
        name: "jobs_ctime",
        help: "Unix time the job was created.",
        value: |j| j.ctime as f64,
    },
    GaugeDef {
        name: "jobs_mtime",
        help: "Unix time the job was last modified.",
        value: |j| j.mtime as f64,
    },
    GaugeDef {
        name: "jobs_priority",
        help: "Job priority.",
        value: |j| j.priority as f64,
    },
    GaugeDef {
        name: "jobs_qtime",
        help: "Unix time the job entered its queue.",
        value: |j| j.qtime as f64,
    },
    GaugeDef {
        name: "jobs_rerunable",
        help: "Whether the job can be rerun, 1 if true.",
        value: |j| j.rerunable.into(),
    },
    GaugeDef {
        name: "jobs_resources_list_ncpus",
        help: "CPUs requested by the job.",
        value: |j| j.list_ncpus as f64,
    },
    GaugeDef {
        name: "jobs_resources_list_nodect",
        help: "Nodes requested by the job.",
        value: |j| j.list_nodect as f64,
    },
    GaugeDef {
        name: "jobs_resources_list_walltime",
        help: "Wall time requested by the job in seconds.",
        value: |j| j.list_walltime as f64,
    },
    GaugeDef {
        name: "jobs_stime",
        help: "Unix time the job started.",
        value: |j| j.stime as f64,
    },
    GaugeDef {
        name: "jobs_sessionid",
        help: "Session id of the job on its mother superior.",
        value: |j| j.session_id as f64,
    },
    GaugeDef {
        name: "jobs_substate",
        help: "Job substate code.",
        value: |j| j.substate as f64,
    },
    GaugeDef {
        name: "jobs_etime",
        help: "Unix time the job became eligible to run.",
        value: |j| j.etime as f64,
    },
    GaugeDef {
        name: "jobs_runcount",
        help: "Number of times the job has been started.",
        value: |j| j.run_count as f64,
    },
];

pub(super) fn samples(job: &JobState, captured_at: DateTime<Local>) -> Vec<MetricSample> {
    build(
        GAUGES,
        job,
        &JOB_LABELS,
        vec![
            job.name.clone(),
            sanitize_owner(&job.owner),
            job.state.clone(),
            job.queue.clone(),
            job.server.clone(),
            job.checkpoint.clone(),
            job.error_path.clone(),
            job.exec_host.clone(),
            job.exec_vnode.clone(),
            job.hold_types.clone(),
            job.join_path.clone(),
            job.keep_files.clone(),
            job.mail_points.clone(),
            job.output_path.clone(),
            job.resource_list_place.clone(),
            job.resource_list_select.clone(),
            job.resource_list_software.clone(),
            job.jobdir.clone(),
            job.variable_list.clone(),
            sanitize_home(&job.env.home),
            sanitize_lang(&job.env.lang),
            job.env.logname.clone(),
            job.env.path.clone(),
            job.env.mail.clone(),
            job.env.shell.clone(),
            job.env.workdir.clone(),
            job.env.system.clone(),
            job.env.queue.clone(),
            job.env.host.clone(),
            job.comment.clone(),
            job.submit_arguments.clone(),
            job.project.clone(),
            captured_at.to_rfc3339_opts(SecondsFormat::Nanos, false),
        ],
    )
}
