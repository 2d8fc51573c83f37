//! Reconciliation orchestration actions.
//!
//! Entry points invoked in-process by the hosting agent runtime: work-item
//! retrieval, store+analyze, status write-back, and the confirmation-gated
//! ledger purge. Each action composes the context manager, the ledger
//! service, and the document-intelligence client, and always returns an
//! `ActionResponse` - typed errors are converted to failure responses at
//! this boundary.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use remita_context::{ContextManager, PhaseEvent, ReconciliationPhase};
use remita_core::config::RemitaConfig;
use remita_core::money;
use remita_core::types::{StageOutcome, WorkItemStatus};
use remita_ledger::{InvoiceDetail, LedgerService, RemittanceFields};
use remita_storage::{ContextRepository, Database};

use crate::docintel::DocumentIntelligenceClient;
use crate::error::ActionError;
use crate::response::ActionResponse;
use crate::retry;

/// Exact confirmation text required by `purge_ledger`. Case-sensitive, no
/// partial match.
pub const PURGE_CONFIRMATION: &str = "DELETE ALL LEDGER DATA";

/// Orchestration entry points for the reconciliation pipeline.
pub struct ReconciliationActions {
    db: Arc<Database>,
    client: Arc<dyn DocumentIntelligenceClient>,
    config: RemitaConfig,
}

impl ReconciliationActions {
    pub fn new(
        db: Arc<Database>,
        client: Arc<dyn DocumentIntelligenceClient>,
        config: RemitaConfig,
    ) -> Self {
        Self { db, client, config }
    }

    /// Fetch a remittance work item and open its processing context.
    ///
    /// Fails with an explicit error response when the work item is not in
    /// the "Validation Completed" upstream status; that state error is
    /// never retried.
    pub async fn get_remittance_work_item(&self, remittance_id: &str) -> ActionResponse {
        match self.get_work_item_inner(remittance_id).await {
            Ok(response) => response,
            Err(err) => {
                error!(remittance_id, error = %err, "get_remittance_work_item failed");
                ActionResponse::from_error(&err)
            }
        }
    }

    async fn get_work_item_inner(
        &self,
        remittance_id: &str,
    ) -> Result<ActionResponse, ActionError> {
        let work_item = self.client.get_work_item(remittance_id).await?;

        if work_item.status != WorkItemStatus::ValidationCompleted {
            return Err(ActionError::UpstreamState(format!(
                "Work item {} is in status '{}', expected '{}'",
                remittance_id,
                work_item.status,
                WorkItemStatus::ValidationCompleted
            )));
        }

        let manager = ContextManager::open(
            Arc::clone(&self.db),
            &work_item.id,
            &work_item.document_name,
            &work_item.customer_id,
        )?;
        manager.store()?;

        info!(
            remittance_id,
            document_name = %work_item.document_name,
            "Work item retrieved and context initialized"
        );

        Ok(ActionResponse::success_with_payload(
            format!("Work item {} ready for reconciliation", remittance_id),
            serde_json::json!({ "work_item": work_item }),
        ))
    }

    /// Store the remittance payment, then analyze it, inside two
    /// phase-scoped blocks.
    ///
    /// Storage failures abort before the matching phase starts, so no
    /// partial commit is ever visible to the analysis.
    pub async fn store_and_analyze_payment(
        &self,
        remittance_id: &str,
        threshold: Option<Decimal>,
    ) -> ActionResponse {
        match self.store_and_analyze_inner(remittance_id, threshold).await {
            Ok(response) => response,
            Err(err) => {
                error!(remittance_id, error = %err, "store_and_analyze_payment failed");
                ActionResponse::from_error(&err)
            }
        }
    }

    async fn store_and_analyze_inner(
        &self,
        remittance_id: &str,
        threshold: Option<Decimal>,
    ) -> Result<ActionResponse, ActionError> {
        let threshold =
            threshold.unwrap_or(self.config.reconciliation.default_tolerance);

        let content = self
            .client
            .get_document_content(remittance_id, "validated")
            .await?;

        let fields = RemittanceFields::parse(
            content
                .get("fields")
                .unwrap_or(&serde_json::Value::Null),
        )?;
        let invoices = InvoiceDetail::parse_lines(
            content
                .get("invoices")
                .unwrap_or(&serde_json::Value::Null),
        )?;

        let document_name = content
            .get("document_name")
            .and_then(|v| v.as_str())
            .unwrap_or(remittance_id);

        let mut manager = ContextManager::open(
            Arc::clone(&self.db),
            remittance_id,
            document_name,
            &fields.customer_id,
        )?;
        let service = LedgerService::new(Arc::clone(&self.db));

        let stored = manager.with_phase(ReconciliationPhase::PaymentDataLoading, |m| {
            let stored = service.store_payment(&fields, &invoices)?;
            m.add_event(
                "payment_stored",
                &format!(
                    "Stored payment {} with {} allocations",
                    stored.payment_reference,
                    invoices.len()
                ),
                Some(serde_json::json!({
                    "payment_reference": stored.payment_reference,
                    "allocation_count": invoices.len(),
                })),
            );
            m.update_metrics([
                (
                    "invoice_count".to_string(),
                    serde_json::json!(invoices.len()),
                ),
                (
                    "total_payment".to_string(),
                    serde_json::json!(stored.total_payment.to_string()),
                ),
            ]);
            Ok::<_, ActionError>(stored)
        })?;

        let result = manager.with_phase(ReconciliationPhase::PaymentMatching, |m| {
            let result = service.analyze(&stored.payment_reference, threshold)?;
            m.add_event(
                "reconciliation_analyzed",
                &format!(
                    "Payment {} analyzed: {} (difference {})",
                    result.payment_reference,
                    result.status,
                    money::format_amount(result.difference)
                ),
                Some(serde_json::json!({
                    "status": result.status,
                    "difference": result.difference.to_string(),
                })),
            );
            m.update_metrics([
                (
                    "difference".to_string(),
                    serde_json::json!(result.difference.to_string()),
                ),
                (
                    "allocated_total".to_string(),
                    serde_json::json!(result.allocated_total.to_string()),
                ),
            ]);
            Ok::<_, ActionError>(result)
        })?;

        manager.store()?;

        info!(
            remittance_id,
            payment_reference = %result.payment_reference,
            status = %result.status,
            "Payment stored and analyzed"
        );

        Ok(ActionResponse::success_with_payload(
            format!(
                "Payment {} stored and analyzed: {}",
                result.payment_reference, result.status
            ),
            serde_json::json!({
                "remittance": fields,
                "analysis": result,
            }),
        ))
    }

    /// Write the business outcome back to the upstream work item.
    ///
    /// RECONCILED maps to SUCCESS, DISCREPANCY_FOUND to FAILURE. The
    /// write-back is retried with bounded exponential backoff; the stored
    /// context is reloaded to append the final event before persisting.
    pub async fn update_work_item_status(
        &self,
        remittance_id: &str,
        status_summary: &str,
        detailed_report: &str,
        is_reconciled: bool,
    ) -> ActionResponse {
        match self
            .update_status_inner(remittance_id, status_summary, detailed_report, is_reconciled)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(remittance_id, error = %err, "update_work_item_status failed");
                ActionResponse::from_error(&err)
            }
        }
    }

    async fn update_status_inner(
        &self,
        remittance_id: &str,
        status_summary: &str,
        detailed_report: &str,
        is_reconciled: bool,
    ) -> Result<ActionResponse, ActionError> {
        let outcome = if is_reconciled {
            StageOutcome::Success
        } else {
            StageOutcome::Failure
        };
        let details = serde_json::json!({ "detailed_report": detailed_report });

        let docintel = &self.config.docintel;
        retry::with_backoff(
            docintel.max_retries,
            Duration::from_millis(docintel.retry_base_delay_ms),
            || {
                self.client.complete_stage(
                    remittance_id,
                    outcome,
                    status_summary,
                    Some(details.clone()),
                )
            },
        )
        .await?;

        match ContextManager::load(Arc::clone(&self.db), remittance_id)? {
            Some(mut context) => {
                context.append_event(
                    ReconciliationPhase::PaymentMatching,
                    PhaseEvent::new(
                        "status_updated",
                        &format!("Work item completed with {}", outcome),
                        Some(serde_json::json!({
                            "summary": status_summary,
                            "reconciled": is_reconciled,
                        })),
                    ),
                );
                let json = serde_json::to_string(&context)
                    .map_err(remita_context::ContextError::from)?;
                ContextRepository::new(Arc::clone(&self.db)).upsert(
                    &context.document_id,
                    &context.customer_id,
                    &json,
                )?;
            }
            None => {
                warn!(remittance_id, "No stored context to append final event to");
            }
        }

        info!(remittance_id, %outcome, "Work item status updated");

        Ok(ActionResponse::success_with_payload(
            format!("Work item {} completed with {}", remittance_id, outcome),
            serde_json::json!({
                "work_item_id": remittance_id,
                "outcome": outcome,
            }),
        ))
    }

    /// Delete every payment and allocation row, gated behind an exact
    /// confirmation string.
    pub async fn purge_ledger(&self, confirmation: &str) -> ActionResponse {
        match self.purge_inner(confirmation) {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "purge_ledger failed");
                ActionResponse::from_error(&err)
            }
        }
    }

    fn purge_inner(&self, confirmation: &str) -> Result<ActionResponse, ActionError> {
        if confirmation != PURGE_CONFIRMATION {
            return Err(ActionError::Validation(format!(
                "Ledger purge requires explicit confirmation: pass exactly '{}'",
                PURGE_CONFIRMATION
            )));
        }

        let repo = remita_storage::LedgerRepository::new(Arc::clone(&self.db));
        let (payments, allocations) = repo.delete_all()?;

        warn!(payments, allocations, "Ledger purged");

        Ok(ActionResponse::success_with_payload(
            "Ledger purged",
            serde_json::json!({
                "payments_removed": payments,
                "allocations_removed": allocations,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docintel::{MockDocIntelClient, WorkItem};
    use std::str::FromStr;

    struct Fixture {
        db: Arc<Database>,
        client: Arc<MockDocIntelClient>,
        actions: ReconciliationActions,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        let client = Arc::new(MockDocIntelClient::new());
        let mut config = RemitaConfig::default();
        config.docintel.retry_base_delay_ms = 1;
        let actions = ReconciliationActions::new(
            Arc::clone(&db),
            Arc::clone(&client) as Arc<dyn DocumentIntelligenceClient>,
            config,
        );
        Fixture {
            db,
            client,
            actions,
        }
    }

    fn seed_work_item(fx: &Fixture, status: WorkItemStatus) {
        fx.client.insert_work_item(WorkItem {
            id: "WI-1".to_string(),
            document_name: "remit_march.pdf".to_string(),
            customer_id: "CUST-001".to_string(),
            status,
        });
    }

    fn seed_content(fx: &Fixture, second_amount: &str, total_invoices: &str) {
        fx.client.insert_content(
            "WI-1",
            serde_json::json!({
                "document_name": "remit_march.pdf",
                "fields": {
                    "Customer ID": "CUST-001",
                    "Customer Name": "Acme Industrial",
                    "Payment Date": "2026-03-15",
                    "Payment Method": "ACH",
                    "Payment Reference": "PAY-2026-0315",
                    "Total Payment Paid": "$1,000.00",
                    "Total Invoice Amount": "$1,000.00",
                    "Total Invoices": total_invoices,
                },
                "invoices": [
                    {
                        "Invoice Reference": "INV-100",
                        "Invoice Amount": "$400.00",
                        "Amount Paid": "$400.00"
                    },
                    {
                        "Invoice Reference": "INV-101",
                        "Invoice Amount": "$600.00",
                        "Amount Paid": second_amount
                    }
                ]
            }),
        );
    }

    fn threshold() -> Option<Decimal> {
        Some(Decimal::from_str("0.01").unwrap())
    }

    // ---- get_remittance_work_item ----

    #[tokio::test]
    async fn test_get_work_item_success_initializes_context() {
        let fx = fixture();
        seed_work_item(&fx, WorkItemStatus::ValidationCompleted);

        let response = fx.actions.get_remittance_work_item("WI-1").await;
        assert!(response.is_success());
        assert_eq!(
            response.payload.unwrap()["work_item"]["id"],
            serde_json::json!("WI-1")
        );

        let context = ContextManager::load(Arc::clone(&fx.db), "WI-1")
            .unwrap()
            .unwrap();
        assert_eq!(context.document_name, "remit_march.pdf");
        assert_eq!(context.customer_id, "CUST-001");
    }

    #[tokio::test]
    async fn test_get_work_item_wrong_status_fails() {
        let fx = fixture();
        seed_work_item(&fx, WorkItemStatus::Other("Extraction Pending".to_string()));

        let response = fx.actions.get_remittance_work_item("WI-1").await;
        assert!(!response.is_success());
        assert!(response.message.contains("Extraction Pending"));
        assert!(response.message.contains("Validation Completed"));

        let data = response.additional_data.unwrap();
        assert_eq!(data["kind"], serde_json::json!("upstream_state"));
    }

    #[tokio::test]
    async fn test_get_work_item_missing_fails_structured() {
        let fx = fixture();
        let response = fx.actions.get_remittance_work_item("WI-404").await;
        assert!(!response.is_success());
        assert_eq!(
            response.additional_data.unwrap()["kind"],
            serde_json::json!("core")
        );
    }

    // ---- store_and_analyze_payment ----

    #[tokio::test]
    async fn test_store_and_analyze_reconciled() {
        let fx = fixture();
        seed_content(&fx, "$600.00", "2");

        let response = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        assert!(response.is_success(), "{}", response.message);

        let payload = response.payload.unwrap();
        assert_eq!(payload["analysis"]["status"], serde_json::json!("reconciled"));
        assert_eq!(payload["analysis"]["difference"], serde_json::json!("0.00"));
        assert_eq!(
            payload["remittance"]["payment_reference"],
            serde_json::json!("PAY-2026-0315")
        );

        // Both phases ran and were closed; events were captured.
        let context = ContextManager::load(Arc::clone(&fx.db), "WI-1")
            .unwrap()
            .unwrap();
        let loading = &context.phases[&ReconciliationPhase::PaymentDataLoading];
        let matching = &context.phases[&ReconciliationPhase::PaymentMatching];
        assert!(!loading.is_open());
        assert!(!matching.is_open());
        assert_eq!(loading.events[0].event_type, "payment_stored");
        assert_eq!(matching.events[0].event_type, "reconciliation_analyzed");
        assert_eq!(
            loading.metrics["invoice_count"],
            serde_json::json!(2)
        );
    }

    #[tokio::test]
    async fn test_store_and_analyze_discrepancy() {
        let fx = fixture();
        seed_content(&fx, "$550.00", "2");

        let response = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        assert!(response.is_success());

        let payload = response.payload.unwrap();
        assert_eq!(
            payload["analysis"]["status"],
            serde_json::json!("discrepancy_found")
        );
        assert_eq!(payload["analysis"]["difference"], serde_json::json!("50.00"));
    }

    #[tokio::test]
    async fn test_store_and_analyze_count_mismatch_no_partial_state() {
        let fx = fixture();
        seed_content(&fx, "$600.00", "3");

        let response = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        assert!(!response.is_success());
        assert!(response.message.contains("header says 3"));
        assert_eq!(
            response.additional_data.unwrap()["kind"],
            serde_json::json!("ledger")
        );

        // Nothing reached the ledger, so analysis has nothing to see.
        let service = LedgerService::new(Arc::clone(&fx.db));
        let err = service
            .analyze("PAY-2026-0315", Decimal::from_str("0.01").unwrap())
            .unwrap_err();
        assert!(matches!(err, remita_ledger::LedgerError::PaymentNotFound(_)));
    }

    #[tokio::test]
    async fn test_store_and_analyze_missing_content_fails() {
        let fx = fixture();
        let response = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        assert!(!response.is_success());
        assert_eq!(
            response.additional_data.unwrap()["kind"],
            serde_json::json!("core")
        );
    }

    #[tokio::test]
    async fn test_store_and_analyze_uses_default_tolerance() {
        let fx = fixture();
        seed_content(&fx, "$600.00", "2");

        let response = fx.actions.store_and_analyze_payment("WI-1", None).await;
        assert!(response.is_success());
        let payload = response.payload.unwrap();
        assert_eq!(payload["analysis"]["threshold"], serde_json::json!("0.01"));
    }

    // ---- update_work_item_status ----

    #[tokio::test]
    async fn test_update_status_reconciled_maps_to_success() {
        let fx = fixture();
        seed_content(&fx, "$600.00", "2");
        fx.actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;

        let response = fx
            .actions
            .update_work_item_status("WI-1", "Reconciled cleanly", "All invoices matched", true)
            .await;
        assert!(response.is_success());

        let completions = fx.client.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].outcome, StageOutcome::Success);
        assert_eq!(completions[0].reason, "Reconciled cleanly");

        // The final event landed in the stored context.
        let context = ContextManager::load(Arc::clone(&fx.db), "WI-1")
            .unwrap()
            .unwrap();
        let matching = &context.phases[&ReconciliationPhase::PaymentMatching];
        let last = matching.events.last().unwrap();
        assert_eq!(last.event_type, "status_updated");
        assert_eq!(
            last.details.as_ref().unwrap()["reconciled"],
            serde_json::json!(true)
        );
    }

    #[tokio::test]
    async fn test_update_status_discrepancy_maps_to_failure() {
        let fx = fixture();
        let response = fx
            .actions
            .update_work_item_status("WI-1", "Discrepancy of 50.00", "INV-101 short paid", false)
            .await;
        assert!(response.is_success());

        let completions = fx.client.completions();
        assert_eq!(completions[0].outcome, StageOutcome::Failure);
        assert_eq!(
            completions[0].details.as_ref().unwrap()["detailed_report"],
            serde_json::json!("INV-101 short paid")
        );
    }

    #[tokio::test]
    async fn test_update_status_retries_transient_failures() {
        let fx = fixture();
        fx.client.fail_next_completions(2);

        let response = fx
            .actions
            .update_work_item_status("WI-1", "Reconciled", "report", true)
            .await;
        assert!(response.is_success());
        assert_eq!(fx.client.completions().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_exhausts_retries() {
        let fx = fixture();
        fx.client.fail_next_completions(10);

        let response = fx
            .actions
            .update_work_item_status("WI-1", "Reconciled", "report", true)
            .await;
        assert!(!response.is_success());
        assert!(fx.client.completions().is_empty());
    }

    // ---- purge_ledger ----

    #[tokio::test]
    async fn test_purge_requires_exact_confirmation() {
        let fx = fixture();

        for bad in [
            "delete all ledger data",
            "DELETE ALL LEDGER DATA ",
            "DELETE",
            "",
        ] {
            let response = fx.actions.purge_ledger(bad).await;
            assert!(!response.is_success(), "accepted: {:?}", bad);
            assert!(response.message.contains("explicit confirmation"));
            assert_eq!(
                response.additional_data.unwrap()["kind"],
                serde_json::json!("validation")
            );
        }
    }

    #[tokio::test]
    async fn test_purge_with_exact_confirmation() {
        let fx = fixture();
        seed_content(&fx, "$600.00", "2");
        fx.actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;

        let response = fx.actions.purge_ledger(PURGE_CONFIRMATION).await;
        assert!(response.is_success());

        let payload = response.payload.unwrap();
        assert_eq!(payload["payments_removed"], serde_json::json!(1));
        assert_eq!(payload["allocations_removed"], serde_json::json!(2));

        let service = LedgerService::new(Arc::clone(&fx.db));
        assert!(service
            .analyze("PAY-2026-0315", Decimal::from_str("0.01").unwrap())
            .is_err());
    }

    // ---- end-to-end pipeline ----

    #[tokio::test]
    async fn test_full_pipeline_reconciled() {
        let fx = fixture();
        seed_work_item(&fx, WorkItemStatus::ValidationCompleted);
        seed_content(&fx, "$600.00", "2");

        let fetched = fx.actions.get_remittance_work_item("WI-1").await;
        assert!(fetched.is_success());

        let analyzed = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        assert!(analyzed.is_success());
        let is_reconciled = analyzed.payload.as_ref().unwrap()["analysis"]["status"]
            == serde_json::json!("reconciled");
        assert!(is_reconciled);

        let updated = fx
            .actions
            .update_work_item_status("WI-1", "Reconciled", "difference 0.00", is_reconciled)
            .await;
        assert!(updated.is_success());
        assert_eq!(
            fx.client.completions()[0].outcome,
            StageOutcome::Success
        );

        // Context carries the whole history.
        let context = ContextManager::load(Arc::clone(&fx.db), "WI-1")
            .unwrap()
            .unwrap();
        assert_eq!(context.phases.len(), 2);
        assert!(context.overall_processing_ms >= 0);
    }

    #[tokio::test]
    async fn test_full_pipeline_discrepancy() {
        let fx = fixture();
        seed_work_item(&fx, WorkItemStatus::ValidationCompleted);
        seed_content(&fx, "$550.00", "2");

        fx.actions.get_remittance_work_item("WI-1").await;
        let analyzed = fx
            .actions
            .store_and_analyze_payment("WI-1", threshold())
            .await;
        let payload = analyzed.payload.as_ref().unwrap();
        assert_eq!(
            payload["analysis"]["status"],
            serde_json::json!("discrepancy_found")
        );
        assert_eq!(payload["analysis"]["difference"], serde_json::json!("50.00"));

        let updated = fx
            .actions
            .update_work_item_status("WI-1", "Discrepancy found", "short paid 50.00", false)
            .await;
        assert!(updated.is_success());
        assert_eq!(
            fx.client.completions()[0].outcome,
            StageOutcome::Failure
        );
    }
}
