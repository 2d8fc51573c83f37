//! Reconciliation phase state machine with validated transitions.
//!
//! The pipeline is linear: PaymentDataLoading -> PaymentMatching, with no
//! branching back. Re-running the current phase is allowed and replaces its
//! sub-context.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ContextError;

/// Processing phases of the reconciliation pipeline, in order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationPhase {
    PaymentDataLoading,
    PaymentMatching,
}

impl fmt::Display for ReconciliationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationPhase::PaymentDataLoading => write!(f, "payment_data_loading"),
            ReconciliationPhase::PaymentMatching => write!(f, "payment_matching"),
        }
    }
}

impl std::str::FromStr for ReconciliationPhase {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment_data_loading" => Ok(ReconciliationPhase::PaymentDataLoading),
            "payment_matching" => Ok(ReconciliationPhase::PaymentMatching),
            _ => Err(format!("Unknown reconciliation phase: {}", s)),
        }
    }
}

/// Validate that a phase transition is allowed.
///
/// Valid transitions:
/// - (start) -> PaymentDataLoading
/// - PaymentDataLoading -> PaymentMatching
/// - any phase -> itself (re-run replaces the sub-context)
pub fn validate_transition(
    from: Option<ReconciliationPhase>,
    to: ReconciliationPhase,
) -> Result<(), ContextError> {
    let valid = match (from, to) {
        (None, ReconciliationPhase::PaymentDataLoading) => true,
        (Some(ReconciliationPhase::PaymentDataLoading), ReconciliationPhase::PaymentMatching) => {
            true
        }
        (None, ReconciliationPhase::PaymentMatching) => false,
        (Some(from), to) => from == to,
    };

    if valid {
        Ok(())
    } else {
        Err(ContextError::InvalidTransition(
            from.map(|p| p.to_string()).unwrap_or_else(|| "start".to_string()),
            to.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Display / FromStr ----

    #[test]
    fn test_phase_display() {
        assert_eq!(
            ReconciliationPhase::PaymentDataLoading.to_string(),
            "payment_data_loading"
        );
        assert_eq!(
            ReconciliationPhase::PaymentMatching.to_string(),
            "payment_matching"
        );
    }

    #[test]
    fn test_phase_from_str() {
        assert_eq!(
            "payment_data_loading".parse::<ReconciliationPhase>().unwrap(),
            ReconciliationPhase::PaymentDataLoading
        );
        assert_eq!(
            "payment_matching".parse::<ReconciliationPhase>().unwrap(),
            ReconciliationPhase::PaymentMatching
        );
        assert!("invalid".parse::<ReconciliationPhase>().is_err());
        assert!("PAYMENT_MATCHING".parse::<ReconciliationPhase>().is_err());
    }

    #[test]
    fn test_phase_serde_round_trip() {
        for phase in [
            ReconciliationPhase::PaymentDataLoading,
            ReconciliationPhase::PaymentMatching,
        ] {
            let json = serde_json::to_string(&phase).unwrap();
            let rt: ReconciliationPhase = serde_json::from_str(&json).unwrap();
            assert_eq!(phase, rt);
        }
    }

    #[test]
    fn test_phase_serde_json_format() {
        assert_eq!(
            serde_json::to_string(&ReconciliationPhase::PaymentDataLoading).unwrap(),
            "\"payment_data_loading\""
        );
    }

    #[test]
    fn test_phase_ordering_is_pipeline_order() {
        assert!(ReconciliationPhase::PaymentDataLoading < ReconciliationPhase::PaymentMatching);
    }

    // ---- Valid transitions ----

    #[test]
    fn test_start_to_loading() {
        assert!(validate_transition(None, ReconciliationPhase::PaymentDataLoading).is_ok());
    }

    #[test]
    fn test_loading_to_matching() {
        assert!(validate_transition(
            Some(ReconciliationPhase::PaymentDataLoading),
            ReconciliationPhase::PaymentMatching
        )
        .is_ok());
    }

    #[test]
    fn test_rerun_same_phase() {
        assert!(validate_transition(
            Some(ReconciliationPhase::PaymentDataLoading),
            ReconciliationPhase::PaymentDataLoading
        )
        .is_ok());
        assert!(validate_transition(
            Some(ReconciliationPhase::PaymentMatching),
            ReconciliationPhase::PaymentMatching
        )
        .is_ok());
    }

    // ---- Invalid transitions ----

    #[test]
    fn test_start_to_matching_invalid() {
        assert!(validate_transition(None, ReconciliationPhase::PaymentMatching).is_err());
    }

    #[test]
    fn test_matching_back_to_loading_invalid() {
        assert!(validate_transition(
            Some(ReconciliationPhase::PaymentMatching),
            ReconciliationPhase::PaymentDataLoading
        )
        .is_err());
    }

    #[test]
    fn test_invalid_transition_error_message() {
        let err = validate_transition(
            Some(ReconciliationPhase::PaymentMatching),
            ReconciliationPhase::PaymentDataLoading,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("payment_matching"));
        assert!(msg.contains("payment_data_loading"));
    }

    #[test]
    fn test_skip_ahead_error_names_start() {
        let err =
            validate_transition(None, ReconciliationPhase::PaymentMatching).unwrap_err();
        assert!(err.to_string().contains("start"));
    }
}
