//! Context manager lifecycle.
//!
//! Owns an `InsightContext` for one document: starts and ends phases with
//! validated transitions, records events and metrics into the active phase,
//! and persists the context through the storage repository.

use std::sync::Arc;

use tracing::{error, warn};

use remita_storage::{ContextRepository, Database};

use crate::context::{InsightContext, PhaseContext, PhaseEvent};
use crate::error::ContextError;
use crate::phase::{validate_transition, ReconciliationPhase};

/// Manages the processing context of a single document.
pub struct ContextManager {
    repo: ContextRepository,
    context: InsightContext,
    active: Option<ReconciliationPhase>,
}

impl ContextManager {
    /// Open the context for a document: load the persisted record if one
    /// exists, otherwise construct a fresh context.
    pub fn open(
        db: Arc<Database>,
        document_id: &str,
        document_name: &str,
        customer_id: &str,
    ) -> Result<Self, ContextError> {
        let repo = ContextRepository::new(db);
        let context = match repo.select(document_id)? {
            Some(stored) => serde_json::from_str(&stored.context_json)?,
            None => InsightContext::new(document_id, document_name, customer_id),
        };
        Ok(Self {
            repo,
            context,
            active: None,
        })
    }

    /// Load the persisted context for a document without opening a manager.
    ///
    /// Returns `None` when nothing has been stored for the document.
    pub fn load(
        db: Arc<Database>,
        document_id: &str,
    ) -> Result<Option<InsightContext>, ContextError> {
        let repo = ContextRepository::new(db);
        match repo.select(document_id)? {
            Some(stored) => Ok(Some(serde_json::from_str(&stored.context_json)?)),
            None => Ok(None),
        }
    }

    pub fn context(&self) -> &InsightContext {
        &self.context
    }

    pub fn active_phase(&self) -> Option<ReconciliationPhase> {
        self.active
    }

    /// Start a phase, validating the transition from the last recorded
    /// phase. A fresh sub-context replaces any prior run of the same phase.
    pub fn start_phase(&mut self, phase: ReconciliationPhase) -> Result<(), ContextError> {
        validate_transition(self.context.last_phase(), phase)?;
        self.context.phases.insert(phase, PhaseContext::start());
        self.active = Some(phase);
        Ok(())
    }

    /// End the active phase, stamping its end time and accumulating its
    /// duration into the overall processing time.
    ///
    /// Logs a warning and does nothing when no phase is active.
    pub fn end_phase(&mut self) {
        let Some(phase) = self.active.take() else {
            warn!(
                document_id = %self.context.document_id,
                "end_phase called with no active phase"
            );
            return;
        };
        if let Some(sub) = self.context.phases.get_mut(&phase) {
            let duration = sub.close();
            self.context.overall_processing_ms += duration;
        }
    }

    /// Run a closure inside a phase scope.
    ///
    /// The phase is started on entry and ended on every exit path, success
    /// or error, before the closure's result is returned.
    pub fn with_phase<T, E>(
        &mut self,
        phase: ReconciliationPhase,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ContextError>,
    {
        self.start_phase(phase).map_err(E::from)?;
        let result = f(self);
        self.end_phase();
        result
    }

    /// Append a timestamped event to the active phase's event log.
    ///
    /// Logs a warning and does nothing when no phase is active.
    pub fn add_event(
        &mut self,
        event_type: &str,
        description: &str,
        details: Option<serde_json::Value>,
    ) {
        let Some(phase) = self.active else {
            warn!(
                document_id = %self.context.document_id,
                event_type,
                "add_event called with no active phase"
            );
            return;
        };
        self.context
            .append_event(phase, PhaseEvent::new(event_type, description, details));
    }

    /// Merge metric key/values into the active phase's metrics.
    ///
    /// Logs a warning and does nothing when no phase is active.
    pub fn update_metrics(
        &mut self,
        metrics: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) {
        let Some(phase) = self.active else {
            warn!(
                document_id = %self.context.document_id,
                "update_metrics called with no active phase"
            );
            return;
        };
        if let Some(sub) = self.context.phases.get_mut(&phase) {
            sub.metrics.extend(metrics);
        }
    }

    /// Persist the context, upserted by (document_id, customer_id).
    ///
    /// Persistence failures are logged with full context and re-raised; the
    /// caller decides whether to convert them into a failure response.
    pub fn store(&self) -> Result<(), ContextError> {
        let json = serde_json::to_string(&self.context)?;
        self.repo
            .upsert(&self.context.document_id, &self.context.customer_id, &json)
            .map_err(|e| {
                error!(
                    document_id = %self.context.document_id,
                    customer_id = %self.context.customer_id,
                    error = %e,
                    "Failed to persist context"
                );
                ContextError::Storage(e)
            })
    }
}
