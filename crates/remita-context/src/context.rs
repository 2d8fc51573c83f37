//! Typed processing-context data model.
//!
//! The context is keyed by phase through an enum-keyed map; phase data is
//! never reached through dynamic attribute lookup. The whole structure
//! round-trips through JSON for persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phase::ReconciliationPhase;

/// A timestamped event recorded during a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub id: Uuid,
    pub event_type: String,
    pub description: String,
    pub details: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

impl PhaseEvent {
    pub fn new(event_type: &str, description: &str, details: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            description: description.to_string(),
            details,
            recorded_at: Utc::now(),
        }
    }
}

/// Per-phase sub-context: timing, event log, metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseContext {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub events: Vec<PhaseEvent>,
    #[serde(default)]
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl PhaseContext {
    /// A fresh sub-context starting now.
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            events: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Stamp the end time and return the phase duration in milliseconds.
    pub fn close(&mut self) -> i64 {
        let ended = Utc::now();
        let duration = (ended - self.started_at).num_milliseconds().max(0);
        self.ended_at = Some(ended);
        self.duration_ms = Some(duration);
        duration
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Per-document processing record: phases, events, timing.
///
/// Persisted as a JSON blob keyed by document_id; loaded back for
/// resumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightContext {
    pub document_id: String,
    pub document_name: String,
    pub customer_id: String,
    #[serde(default)]
    pub phases: BTreeMap<ReconciliationPhase, PhaseContext>,
    #[serde(default)]
    pub overall_processing_ms: i64,
}

impl InsightContext {
    pub fn new(document_id: &str, document_name: &str, customer_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            customer_id: customer_id.to_string(),
            phases: BTreeMap::new(),
            overall_processing_ms: 0,
        }
    }

    /// The most recently started phase, following pipeline order.
    pub fn last_phase(&self) -> Option<ReconciliationPhase> {
        self.phases.keys().max().copied()
    }

    /// Append an event to a phase, creating the sub-context if the phase
    /// has not been recorded yet (resumption after a process restart).
    pub fn append_event(&mut self, phase: ReconciliationPhase, event: PhaseEvent) {
        self.phases
            .entry(phase)
            .or_insert_with(PhaseContext::start)
            .events
            .push(event);
    }
}
