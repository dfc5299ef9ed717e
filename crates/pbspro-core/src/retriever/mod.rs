//! Scheduler state retrieval.
//!
//! ```text
//! Retriever ──connect()──▶ Session ──stat_*()──▶ Vec<BatchStatus>
//!                             │
//!                             └──disconnect()   (always, even after errors)
//! ```
//!
//! - [`QstatRetriever`]: talks to a live PBS server through the PBS
//!   commands' JSON output.
//! - [`mock::MockRetriever`]: scripted responses for tests.

pub mod mock;
mod qstat;

use async_trait::async_trait;

use crate::error::RetrieveError;
use crate::model::{BatchStatus, Category};

pub use qstat::{DEFAULT_PBS_PORT, QstatConfig, QstatRetriever, QstatSession, flatten_json};

/// Opens sessions to the scheduler.
#[async_trait]
pub trait Retriever: Send + Sync {
    type Session: Session;

    async fn connect(&self) -> Result<Self::Session, RetrieveError>;
}

/// An open connection to the scheduler.
///
/// Records are returned in the order the scheduler reported them.
#[async_trait]
pub trait Session: Send {
    async fn stat_server(&mut self) -> Result<Vec<BatchStatus>, RetrieveError>;

    async fn stat_queues(&mut self) -> Result<Vec<BatchStatus>, RetrieveError>;

    async fn stat_nodes(&mut self) -> Result<Vec<BatchStatus>, RetrieveError>;

    async fn stat_jobs(&mut self) -> Result<Vec<BatchStatus>, RetrieveError>;

    /// Releases the session. Must be safe to call after a failed query and
    /// more than once.
    async fn disconnect(&mut self);

    async fn stat(&mut self, category: Category) -> Result<Vec<BatchStatus>, RetrieveError> {
        match category {
            Category::Server => self.stat_server().await,
            Category::Queue => self.stat_queues().await,
            Category::Node => self.stat_nodes().await,
            Category::Job => self.stat_jobs().await,
        }
    }
}
