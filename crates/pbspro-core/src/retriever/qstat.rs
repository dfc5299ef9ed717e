//! Retriever backed by the PBS client commands.
//!
//! A session is a TCP connection to the PBS server port: opening it proves
//! the server is reachable and its failure is reported as a connection
//! error. Queries run `qstat`/`pbsnodes` with `-F json` against the same
//! server and flatten the JSON objects into [`BatchStatus`] records:
//!
//! - server: `qstat -B -f -F json <server>` → `Server`
//! - queues: `qstat -Q -f -F json @<server>` → `Queue`
//! - nodes:  `pbsnodes -a -v -F json -s <server>` → `nodes`
//! - jobs:   `qstat -f -F json @<server>` → `Jobs`
//!
//! Child processes are killed when a query future is dropped, so a query
//! cut short by the cycle deadline leaves nothing running.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

use super::{Retriever, Session};
use crate::error::RetrieveError;
use crate::model::{BatchStatus, Category};

/// Port `pbs_server` listens on unless configured otherwise.
pub const DEFAULT_PBS_PORT: u16 = 15001;

/// Connection settings for [`QstatRetriever`].
#[derive(Debug, Clone)]
pub struct QstatConfig {
    /// PBS server host name.
    pub server: String,
    pub port: u16,
    pub qstat_bin: PathBuf,
    pub pbsnodes_bin: PathBuf,
    pub connect_timeout: Duration,
}

impl Default for QstatConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: DEFAULT_PBS_PORT,
            qstat_bin: PathBuf::from("qstat"),
            pbsnodes_bin: PathBuf::from("pbsnodes"),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Retriever using `qstat`/`pbsnodes` JSON output.
#[derive(Debug, Clone)]
pub struct QstatRetriever {
    config: Arc<QstatConfig>,
}

impl QstatRetriever {
    pub fn new(config: QstatConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &QstatConfig {
        &self.config
    }
}

#[async_trait]
impl Retriever for QstatRetriever {
    type Session = QstatSession;

    async fn connect(&self) -> Result<QstatSession, RetrieveError> {
        let cfg = &self.config;
        let addr = (cfg.server.as_str(), cfg.port);
        let stream = match tokio::time::timeout(cfg.connect_timeout, TcpStream::connect(addr)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RetrieveError::Connection(format!(
                    "{}:{}: {}",
                    cfg.server, cfg.port, e
                )));
            }
            Err(_) => {
                return Err(RetrieveError::Connection(format!(
                    "{}:{}: no answer within {:?}",
                    cfg.server, cfg.port, cfg.connect_timeout
                )));
            }
        };
        debug!(server = %cfg.server, port = cfg.port, "PBS session opened");
        Ok(QstatSession {
            config: Arc::clone(&self.config),
            stream: Some(stream),
        })
    }
}

/// Open session of a [`QstatRetriever`].
#[derive(Debug)]
pub struct QstatSession {
    config: Arc<QstatConfig>,
    stream: Option<TcpStream>,
}

impl QstatSession {
    async fn run(
        &self,
        program: &Path,
        args: &[&str],
        category: Category,
    ) -> Result<Vec<BatchStatus>, RetrieveError> {
        if self.stream.is_none() {
            return Err(RetrieveError::Query("session is closed".to_string()));
        }

        debug!(program = %program.display(), ?args, %category, "running PBS query");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                RetrieveError::Query(format!("failed to run {}: {}", program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetrieveError::Query(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }

        flatten_json(&output.stdout, category).map_err(RetrieveError::Query)
    }
}

#[async_trait]
impl Session for QstatSession {
    async fn stat_server(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        let server = self.config.server.clone();
        self.run(
            &self.config.qstat_bin,
            &["-B", "-f", "-F", "json", server.as_str()],
            Category::Server,
        )
        .await
    }

    async fn stat_queues(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        let destination = format!("@{}", self.config.server);
        self.run(
            &self.config.qstat_bin,
            &["-Q", "-f", "-F", "json", destination.as_str()],
            Category::Queue,
        )
        .await
    }

    async fn stat_nodes(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        let server = self.config.server.clone();
        self.run(
            &self.config.pbsnodes_bin,
            &["-a", "-v", "-F", "json", "-s", server.as_str()],
            Category::Node,
        )
        .await
    }

    async fn stat_jobs(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        let destination = format!("@{}", self.config.server);
        self.run(
            &self.config.qstat_bin,
            &["-f", "-F", "json", destination.as_str()],
            Category::Job,
        )
        .await
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!(server = %self.config.server, "PBS session closed");
        }
    }
}

/// Top-level layout of PBS `-F json` output. Only the section of the
/// queried category is present; `qstat` omits `Jobs` when there are none.
#[derive(Debug, Default, Deserialize)]
struct PbsJsonReport {
    #[serde(rename = "Server")]
    server: Option<Map<String, Value>>,
    #[serde(rename = "Queue")]
    queue: Option<Map<String, Value>>,
    #[serde(rename = "nodes")]
    nodes: Option<Map<String, Value>>,
    #[serde(rename = "Jobs")]
    jobs: Option<Map<String, Value>>,
}

/// Flattens PBS `-F json` output for `category` into status records,
/// preserving document order.
///
/// Nested objects become resource attributes (`resources_assigned.ncpus`),
/// except `Variable_List`, which is folded back into its `K=V,K=V` form.
pub fn flatten_json(raw: &[u8], category: Category) -> Result<Vec<BatchStatus>, String> {
    let report: PbsJsonReport =
        serde_json::from_slice(raw).map_err(|e| format!("malformed PBS JSON: {}", e))?;
    let section = match category {
        Category::Server => report.server,
        Category::Queue => report.queue,
        Category::Node => report.nodes,
        Category::Job => report.jobs,
    };
    let Some(section) = section else {
        return Ok(Vec::new());
    };

    section
        .into_iter()
        .map(|(name, attrs)| {
            let Value::Object(attrs) = attrs else {
                return Err(format!("{} {}: attributes are not an object", category, name));
            };
            let mut status = BatchStatus::new(name);
            for (attr, value) in attrs {
                match value {
                    Value::Object(vars) if attr == "Variable_List" => {
                        let joined = vars
                            .iter()
                            .map(|(k, v)| format!("{}={}", k, scalar(v).replace(',', "\\,")))
                            .collect::<Vec<_>>()
                            .join(",");
                        status.push(attr, None::<String>, joined);
                    }
                    Value::Object(resources) => {
                        for (resource, v) in resources {
                            let v = scalar(&v);
                            status.push(attr.as_str(), Some(resource), v);
                        }
                    }
                    other => {
                        let v = scalar(&other);
                        status.push(attr, None::<String>, v);
                    }
                }
            }
            Ok(status)
        })
        .collect()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER_JSON: &str = r#"{
        "timestamp": 1729159200,
        "pbs_version": "2022.1.0",
        "pbs_server": "headnode",
        "Server": {
            "headnode": {
                "server_state": "Active",
                "server_host": "headnode.cluster",
                "scheduling": "True",
                "total_jobs": 42,
                "state_count": "Transit:0 Queued:10 Held:1 Waiting:0 Running:31 Exiting:0 Begun:0 ",
                "resources_assigned": { "ncpus": 248, "nodect": 9 },
                "pbs_version": "2022.1.0"
            }
        }
    }"#;

    const JOBS_JSON: &str = r#"{
        "Jobs": {
            "101.headnode": {
                "Job_Name": "relax",
                "Job_Owner": "alice@login1",
                "Rerunable": true,
                "Variable_List": {
                    "PBS_O_HOME": "/home/alice",
                    "PBS_O_PATH": "/usr/bin,/bin"
                }
            },
            "102.headnode": { "Job_Name": "mesh" }
        }
    }"#;

    #[test]
    fn flattens_server_section() {
        let records = flatten_json(SERVER_JSON.as_bytes(), Category::Server).unwrap();
        assert_eq!(records.len(), 1);
        let server = &records[0];
        assert_eq!(server.name, "headnode");
        assert_eq!(server.get("total_jobs"), Some("42"));
        assert_eq!(server.get_resource("resources_assigned", "nodect"), Some("9"));
        assert_eq!(server.attributes[0].name, "server_state");
    }

    #[test]
    fn flattens_jobs_in_document_order() {
        let records = flatten_json(JOBS_JSON.as_bytes(), Category::Job).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["101.headnode", "102.headnode"]);
        assert_eq!(records[0].get("Rerunable"), Some("True"));
        assert_eq!(
            records[0].get("Variable_List"),
            Some(r"PBS_O_HOME=/home/alice,PBS_O_PATH=/usr/bin\,/bin")
        );
    }

    #[test]
    fn missing_section_means_no_records() {
        let raw = br#"{"timestamp": 1, "pbs_version": "2022.1.0", "pbs_server": "headnode"}"#;
        assert!(flatten_json(raw, Category::Job).unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_a_query_failure() {
        assert!(flatten_json(b"{\"Jobs\": ", Category::Job).is_err());
        assert!(flatten_json(br#"{"Queue": {"workq": 3}}"#, Category::Queue).is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let retriever = QstatRetriever::new(QstatConfig {
            server: "127.0.0.1".to_string(),
            port,
            connect_timeout: Duration::from_secs(2),
            ..QstatConfig::default()
        });
        match retriever.connect().await {
            Err(RetrieveError::Connection(_)) => {}
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_runs_pbs_commands() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let write_script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        let qstat = write_script(
            "qstat",
            &format!(
                "if [ \"$1\" = \"-B\" ]; then\ncat <<'EOF'\n{}\nEOF\nelse\necho 'qstat: Unauthorized Request' >&2\nexit 2\nfi",
                SERVER_JSON
            ),
        );
        let missing = dir.path().join("no-such-pbsnodes");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let retriever = QstatRetriever::new(QstatConfig {
            server: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
            qstat_bin: qstat,
            pbsnodes_bin: missing,
            connect_timeout: Duration::from_secs(2),
        });

        let mut session = retriever.connect().await.unwrap();

        let servers = session.stat_server().await.unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].get("server_host"), Some("headnode.cluster"));

        match session.stat_queues().await {
            Err(RetrieveError::Query(msg)) => assert!(msg.contains("Unauthorized Request")),
            other => panic!("expected query error, got {:?}", other),
        }
        assert!(matches!(
            session.stat_nodes().await,
            Err(RetrieveError::Query(_))
        ));

        session.disconnect().await;
        session.disconnect().await;
        assert!(matches!(
            session.stat_server().await,
            Err(RetrieveError::Query(_))
        ));
    }
}
