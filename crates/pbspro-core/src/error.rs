//! Error types of the collection pipeline.
//!
//! Each type corresponds to the smallest unit a failure is isolated to:
//! a sample ([`SinkError`]), a record ([`MappingError`]) or a whole
//! category ([`CategoryError`]). None of them ever terminates the process.

use std::fmt;
use std::time::Duration;

/// Error returned by a scheduler [`Retriever`](crate::retriever::Retriever)
/// or one of its sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrieveError {
    /// A session with the scheduler could not be established.
    Connection(String),
    /// The session exists but the status query failed.
    Query(String),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::Connection(msg) => write!(f, "PBS connection failed: {}", msg),
            RetrieveError::Query(msg) => write!(f, "PBS query failed: {}", msg),
        }
    }
}

impl std::error::Error for RetrieveError {}

/// A single status record could not be decoded into its typed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingError {
    /// Name of the offending record (server, queue, node or job id).
    pub record: String,
    /// Attribute whose value was malformed, in `name` or `name.resource` form.
    pub attribute: String,
    /// What was wrong with the value.
    pub reason: String,
}

impl MappingError {
    pub(crate) fn new(
        record: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            record: record.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {}: attribute {}: {}",
            self.record, self.attribute, self.reason
        )
    }
}

impl std::error::Error for MappingError {}

/// The sink refused a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The registry rejected the metric descriptor (invalid name or label name).
    InvalidDescriptor(String),
    /// The metric name was already described with a different label schema.
    SchemaConflict { name: String },
    /// Label value count does not match the label schema.
    LabelMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// The per-cycle sample cap has been reached.
    Capacity(usize),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::InvalidDescriptor(msg) => write!(f, "invalid metric descriptor: {}", msg),
            SinkError::SchemaConflict { name } => {
                write!(f, "metric {} already described with other labels", name)
            }
            SinkError::LabelMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "metric {}: expected {} label values, got {}",
                name, expected, actual
            ),
            SinkError::Capacity(max) => write!(f, "sample limit of {} reached", max),
        }
    }
}

impl std::error::Error for SinkError {}

/// Why a whole category produced no samples in a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryError {
    /// No session could be opened.
    Connection(String),
    /// The status query failed.
    Query(String),
    /// The cycle deadline expired before the category finished.
    Timeout(Duration),
    /// The server category returned more than one record.
    Cardinality(usize),
}

impl From<RetrieveError> for CategoryError {
    fn from(e: RetrieveError) -> Self {
        match e {
            RetrieveError::Connection(msg) => CategoryError::Connection(msg),
            RetrieveError::Query(msg) => CategoryError::Query(msg),
        }
    }
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryError::Connection(msg) => write!(f, "connection error: {}", msg),
            CategoryError::Query(msg) => write!(f, "query error: {}", msg),
            CategoryError::Timeout(limit) => {
                write!(f, "cycle deadline of {:?} exceeded", limit)
            }
            CategoryError::Cardinality(n) => {
                write!(f, "expected exactly one server record, got {}", n)
            }
        }
    }
}

impl std::error::Error for CategoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_error_maps_onto_category_error() {
        assert_eq!(
            CategoryError::from(RetrieveError::Connection("refused".into())),
            CategoryError::Connection("refused".into())
        );
        assert_eq!(
            CategoryError::from(RetrieveError::Query("bad json".into())),
            CategoryError::Query("bad json".into())
        );
    }

    #[test]
    fn mapping_error_names_record_and_attribute() {
        let e = MappingError::new("42.headnode", "resources_used.mem", "bad size");
        assert_eq!(
            e.to_string(),
            "record 42.headnode: attribute resources_used.mem: bad size"
        );
    }
}
