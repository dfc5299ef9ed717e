//! Scripted retriever for testing the pipeline without a PBS server.
//!
//! [`MockRetriever`] serves fixed [`ClusterRecords`] and can be told to
//! refuse connections, fail or delay individual category queries. It counts
//! connects and disconnects so tests can check that every opened session is
//! released.

pub mod scenarios;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Retriever, Session};
use crate::error::RetrieveError;
use crate::model::{BatchStatus, Category};

/// Status records of a whole cluster, per category, in retrieval order.
#[derive(Debug, Clone, Default)]
pub struct ClusterRecords {
    pub servers: Vec<BatchStatus>,
    pub queues: Vec<BatchStatus>,
    pub nodes: Vec<BatchStatus>,
    pub jobs: Vec<BatchStatus>,
}

impl ClusterRecords {
    pub fn records(&self, category: Category) -> &[BatchStatus] {
        match category {
            Category::Server => &self.servers,
            Category::Queue => &self.queues,
            Category::Node => &self.nodes,
            Category::Job => &self.jobs,
        }
    }

    pub fn records_mut(&mut self, category: Category) -> &mut Vec<BatchStatus> {
        match category {
            Category::Server => &mut self.servers,
            Category::Queue => &mut self.queues,
            Category::Node => &mut self.nodes,
            Category::Job => &mut self.jobs,
        }
    }
}

#[derive(Debug, Default)]
struct MockStats {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    queries: Mutex<Vec<Category>>,
}

/// Behaviour shared by the retriever and all of its sessions.
#[derive(Debug, Clone, Default)]
struct MockScript {
    records: ClusterRecords,
    /// Zero-based connect attempts that are refused.
    refused_connects: HashSet<usize>,
    refuse_all: bool,
    query_failures: HashMap<Category, String>,
    delays: HashMap<Category, Duration>,
}

/// In-memory [`Retriever`] with scripted behaviour.
#[derive(Debug, Clone, Default)]
pub struct MockRetriever {
    script: Arc<MockScript>,
    stats: Arc<MockStats>,
}

impl MockRetriever {
    /// Creates a retriever serving `records`.
    pub fn new(records: ClusterRecords) -> Self {
        Self {
            script: Arc::new(MockScript {
                records,
                ..MockScript::default()
            }),
            stats: Arc::default(),
        }
    }

    fn script_mut(&mut self) -> &mut MockScript {
        Arc::make_mut(&mut self.script)
    }

    /// Refuses every connection attempt.
    pub fn refuse_connections(mut self) -> Self {
        self.script_mut().refuse_all = true;
        self
    }

    /// Refuses the `n`-th (zero-based) connection attempt only.
    pub fn refuse_connect(mut self, n: usize) -> Self {
        self.script_mut().refused_connects.insert(n);
        self
    }

    /// Makes queries for `category` fail.
    pub fn fail_query(mut self, category: Category, message: impl Into<String>) -> Self {
        self.script_mut()
            .query_failures
            .insert(category, message.into());
        self
    }

    /// Delays queries for `category`.
    pub fn delay_query(mut self, category: Category, delay: Duration) -> Self {
        self.script_mut().delays.insert(category, delay);
        self
    }

    /// Number of connection attempts so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    /// Number of sessions released so far.
    pub fn disconnects(&self) -> usize {
        self.stats.disconnects.load(Ordering::SeqCst)
    }

    /// Categories queried so far, in order.
    pub fn queried(&self) -> Vec<Category> {
        self.stats
            .queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    type Session = MockSession;

    async fn connect(&self) -> Result<MockSession, RetrieveError> {
        let attempt = self.stats.connects.fetch_add(1, Ordering::SeqCst);
        if self.script.refuse_all || self.script.refused_connects.contains(&attempt) {
            return Err(RetrieveError::Connection(
                "mock: connection refused".to_string(),
            ));
        }
        Ok(MockSession {
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
            open: true,
        })
    }
}

/// Session of a [`MockRetriever`].
#[derive(Debug)]
pub struct MockSession {
    script: Arc<MockScript>,
    stats: Arc<MockStats>,
    open: bool,
}

impl MockSession {
    async fn query(&mut self, category: Category) -> Result<Vec<BatchStatus>, RetrieveError> {
        if !self.open {
            return Err(RetrieveError::Query("mock: session is closed".to_string()));
        }
        if let Ok(mut queries) = self.stats.queries.lock() {
            queries.push(category);
        }
        if let Some(delay) = self.script.delays.get(&category) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.script.query_failures.get(&category) {
            return Err(RetrieveError::Query(message.clone()));
        }
        Ok(self.script.records.records(category).to_vec())
    }
}

#[async_trait]
impl Session for MockSession {
    async fn stat_server(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        self.query(Category::Server).await
    }

    async fn stat_queues(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        self.query(Category::Queue).await
    }

    async fn stat_nodes(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        self.query(Category::Node).await
    }

    async fn stat_jobs(&mut self) -> Result<Vec<BatchStatus>, RetrieveError> {
        self.query(Category::Job).await
    }

    async fn disconnect(&mut self) {
        if self.open {
            self.open = false;
            self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }
}
