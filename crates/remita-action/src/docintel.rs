//! Document-intelligence client.
//!
//! The reconciliation core depends only on the `DocumentIntelligenceClient`
//! method contracts, not their implementation. `HttpDocIntelClient` talks
//! to the real API; `MockDocIntelClient` backs tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use remita_core::config::DocIntelConfig;
use remita_core::error::RemitaError;
use remita_core::types::{StageOutcome, WorkItemStatus};

/// A unit of document-processing work tracked by the upstream system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub document_name: String,
    pub customer_id: String,
    pub status: WorkItemStatus,
}

/// A recorded stage completion (mock only, for assertions).
#[derive(Debug, Clone, PartialEq)]
pub struct StageCompletion {
    pub work_item_id: String,
    pub outcome: StageOutcome,
    pub reason: String,
    pub details: Option<serde_json::Value>,
}

/// Consumed interface of the upstream document-intelligence system.
#[async_trait]
pub trait DocumentIntelligenceClient: Send + Sync {
    /// Fetch a work item by id.
    async fn get_work_item(&self, id: &str) -> Result<WorkItem, RemitaError>;

    /// Fetch extracted document content for a work item in a given state.
    async fn get_document_content(
        &self,
        id: &str,
        state: &str,
    ) -> Result<serde_json::Value, RemitaError>;

    /// Complete the current stage of a work item with an outcome.
    async fn complete_stage(
        &self,
        id: &str,
        outcome: StageOutcome,
        reason: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), RemitaError>;
}

/// HTTP implementation of the document-intelligence client.
///
/// Credentials and endpoint come in through `DocIntelConfig`; nothing is
/// read from the process environment.
pub struct HttpDocIntelClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpDocIntelClient {
    pub fn new(config: &DocIntelConfig) -> Result<Self, RemitaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemitaError::Client(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl DocumentIntelligenceClient for HttpDocIntelClient {
    async fn get_work_item(&self, id: &str) -> Result<WorkItem, RemitaError> {
        let url = format!("{}/work-items/{}", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemitaError::Client(format!("Work item fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RemitaError::Client(format!(
                "Work item fetch for '{}' returned {}",
                id,
                response.status()
            )));
        }

        response
            .json::<WorkItem>()
            .await
            .map_err(|e| RemitaError::Client(format!("Malformed work item response: {}", e)))
    }

    async fn get_document_content(
        &self,
        id: &str,
        state: &str,
    ) -> Result<serde_json::Value, RemitaError> {
        let url = format!("{}/work-items/{}/content", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .query(&[("state", state)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| RemitaError::Client(format!("Content fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RemitaError::Client(format!(
                "Content fetch for '{}' returned {}",
                id,
                response.status()
            )));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| RemitaError::Client(format!("Malformed content response: {}", e)))
    }

    async fn complete_stage(
        &self,
        id: &str,
        outcome: StageOutcome,
        reason: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), RemitaError> {
        let url = format!("{}/work-items/{}/complete-stage", self.base_url, id);
        let body = serde_json::json!({
            "status": outcome,
            "reason": reason,
            "details": details,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemitaError::Client(format!("Stage completion failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RemitaError::Client(format!(
                "Stage completion for '{}' returned {}",
                id,
                response.status()
            )));
        }

        Ok(())
    }
}

/// In-memory client for tests and offline runs.
#[derive(Default)]
pub struct MockDocIntelClient {
    work_items: Mutex<HashMap<String, WorkItem>>,
    contents: Mutex<HashMap<String, serde_json::Value>>,
    completions: Mutex<Vec<StageCompletion>>,
    fail_completions: AtomicU32,
}

impl MockDocIntelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_work_item(&self, work_item: WorkItem) {
        self.work_items
            .lock()
            .unwrap()
            .insert(work_item.id.clone(), work_item);
    }

    pub fn insert_content(&self, id: &str, content: serde_json::Value) {
        self.contents.lock().unwrap().insert(id.to_string(), content);
    }

    /// Recorded stage completions, in call order.
    pub fn completions(&self) -> Vec<StageCompletion> {
        self.completions.lock().unwrap().clone()
    }

    /// Make the next `n` complete_stage calls fail (transient-error
    /// injection for retry tests).
    pub fn fail_next_completions(&self, n: u32) {
        self.fail_completions.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentIntelligenceClient for MockDocIntelClient {
    async fn get_work_item(&self, id: &str) -> Result<WorkItem, RemitaError> {
        self.work_items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RemitaError::Client(format!("Work item not found: {}", id)))
    }

    async fn get_document_content(
        &self,
        id: &str,
        _state: &str,
    ) -> Result<serde_json::Value, RemitaError> {
        self.contents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RemitaError::Client(format!("No content for work item: {}", id)))
    }

    async fn complete_stage(
        &self,
        id: &str,
        outcome: StageOutcome,
        reason: &str,
        details: Option<serde_json::Value>,
    ) -> Result<(), RemitaError> {
        let remaining = self.fail_completions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_completions.store(remaining - 1, Ordering::SeqCst);
            return Err(RemitaError::Client("injected transient failure".to_string()));
        }

        self.completions.lock().unwrap().push(StageCompletion {
            work_item_id: id.to_string(),
            outcome,
            reason: reason.to_string(),
            details,
        });
        Ok(())
    }
}
