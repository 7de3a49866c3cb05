//! Suite registry
//!
//! Holds the available suites keyed by id.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{HealthStatus, SuiteMetadata, TestSuite};

/// Registry of available test suites
#[derive(Default)]
pub struct SuiteRegistry {
    suites: RwLock<HashMap<String, Arc<dyn TestSuite>>>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suite, replacing any suite with the same id
    pub async fn register(&self, suite: Arc<dyn TestSuite>) {
        let id = suite.id().to_string();
        let replaced = self.suites.write().await.insert(id.clone(), suite).is_some();
        if replaced {
            info!("Replaced test suite {}", id);
        } else {
            debug!("Registered test suite {}", id);
        }
    }

    /// Look up a suite by id
    pub async fn lookup(&self, id: &str) -> Option<Arc<dyn TestSuite>> {
        self.suites.read().await.get(id).cloned()
    }

    /// Metadata for every registered suite, ordered by id
    pub async fn list(&self) -> Vec<SuiteMetadata> {
        let mut metadata: Vec<SuiteMetadata> = self
            .suites
            .read()
            .await
            .values()
            .map(|suite| suite.metadata())
            .collect();
        metadata.sort_by(|a, b| a.id.cmp(&b.id));
        metadata
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.suites.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.suites.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.suites.read().await.is_empty()
    }

    /// Query every suite's health check, ordered by id
    pub async fn health_report(&self) -> Vec<(String, HealthStatus)> {
        // Clone the handles so no lock is held across suite calls
        let suites: Vec<Arc<dyn TestSuite>> = self.suites.read().await.values().cloned().collect();

        let mut report = Vec::with_capacity(suites.len());
        for suite in suites {
            let health = suite.health_status().await;
            report.push((suite.id().to_string(), health));
        }
        report.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}
