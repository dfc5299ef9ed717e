//! Scheduler state records.
//!
//! A retriever hands back [`BatchStatus`] records: an object name plus an
//! ordered list of `name[.resource] = value` string attributes, which is the
//! shape PBS itself replies with. The typed snapshots ([`ServerState`],
//! [`QueueState`], [`NodeState`], [`JobState`]) are decoded from them by the
//! mapper; a malformed attribute fails only that one record.

mod attr;
mod job;
mod node;
mod queue;
mod server;

use std::fmt;

pub use attr::{LicenseCount, StateCount};
pub use job::JobState;
pub use node::NodeState;
pub use queue::QueueState;
pub use server::ServerState;

/// Class of scheduler object with its own record shape and label schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Server,
    Queue,
    Node,
    Job,
}

impl Category {
    /// Collection order within one cycle.
    pub const ALL: [Category; 4] = [
        Category::Server,
        Category::Queue,
        Category::Node,
        Category::Job,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Server => "server",
            Category::Queue => "queue",
            Category::Node => "node",
            Category::Job => "job",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `name[.resource] = value` attribute of a status record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub resource: Option<String>,
    pub value: String,
}

/// Status of one scheduler object as returned by a retriever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStatus {
    /// Object name: server name, queue name, node name or job id.
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl BatchStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends a plain attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, None::<String>, value);
        self
    }

    /// Appends a resource attribute such as `resources_assigned.ncpus`.
    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        resource: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.push(name, Some(resource), value);
        self
    }

    pub fn push(
        &mut self,
        name: impl Into<String>,
        resource: Option<impl Into<String>>,
        value: impl Into<String>,
    ) {
        self.attributes.push(Attribute {
            name: name.into(),
            resource: resource.map(Into::into),
            value: value.into(),
        });
    }

    /// Value of a plain attribute. The last occurrence wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.resource.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Value of a resource attribute. The last occurrence wins.
    pub fn get_resource(&self, name: &str, resource: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.name == name && a.resource.as_deref() == Some(resource))
            .map(|a| a.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_plain_and_resource_attributes() {
        let status = BatchStatus::new("workq")
            .with("resources_assigned", "ignored")
            .with_resource("resources_assigned", "ncpus", "16");

        assert_eq!(status.get("resources_assigned"), Some("ignored"));
        assert_eq!(status.get_resource("resources_assigned", "ncpus"), Some("16"));
        assert_eq!(status.get_resource("resources_assigned", "mem"), None);
        assert_eq!(status.get("enabled"), None);
    }

    #[test]
    fn last_duplicate_attribute_wins() {
        let status = BatchStatus::new("n1").with("state", "free").with("state", "job-busy");
        assert_eq!(status.get("state"), Some("job-busy"));
    }

    #[test]
    fn categories_are_ordered_server_first() {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["server", "queue", "node", "job"]);
    }
}
