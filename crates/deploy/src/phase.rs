//! Lifecycle of one unit deployment attempt.

use serde::{Deserialize, Serialize};

/// Where a unit deployment attempt stands.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentPhase {
    Pending,
    Submitting,
    Succeeded,
    /// The creation was broadcast but its response could not be decoded.
    AmbiguousSubmission,
    RecoveredSucceeded,
    RecoveryFailed,
    Failed,
    Skipped,
}

impl DeploymentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentPhase::Succeeded
                | DeploymentPhase::RecoveredSucceeded
                | DeploymentPhase::RecoveryFailed
                | DeploymentPhase::Failed
                | DeploymentPhase::Skipped
        )
    }

    /// Whether the attempt ended with a recorded deployment.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DeploymentPhase::Succeeded | DeploymentPhase::RecoveredSucceeded
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The unit is not configured on the network, or is already deployed.
    SkipRequested,
    /// Identity, config or dependency resolution failed before submitting.
    PreflightFailed,
    Submitted,
    SubmissionSucceeded,
    SubmissionAmbiguous,
    SubmissionFailed,
    RecoverySucceeded,
    RecoveryFailed,
    /// The deployment happened but could not be recorded.
    PersistFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid deployment phase transition from {from} on {event:?}")]
pub struct TransitionError {
    pub from: DeploymentPhase,
    pub event: PhaseEvent,
}

pub fn transition(
    current: &DeploymentPhase,
    event: &PhaseEvent,
) -> Result<DeploymentPhase, TransitionError> {
    match (current, event) {
        (DeploymentPhase::Pending, PhaseEvent::SkipRequested) => Ok(DeploymentPhase::Skipped),
        (DeploymentPhase::Pending, PhaseEvent::PreflightFailed) => Ok(DeploymentPhase::Failed),
        (DeploymentPhase::Pending, PhaseEvent::Submitted) => Ok(DeploymentPhase::Submitting),
        (DeploymentPhase::Submitting, PhaseEvent::SubmissionSucceeded) => {
            Ok(DeploymentPhase::Succeeded)
        }
        (DeploymentPhase::Submitting, PhaseEvent::SubmissionAmbiguous) => {
            Ok(DeploymentPhase::AmbiguousSubmission)
        }
        (DeploymentPhase::Submitting, PhaseEvent::SubmissionFailed) => Ok(DeploymentPhase::Failed),
        (DeploymentPhase::Submitting, PhaseEvent::PersistFailed) => Ok(DeploymentPhase::Failed),
        (DeploymentPhase::AmbiguousSubmission, PhaseEvent::RecoverySucceeded) => {
            Ok(DeploymentPhase::RecoveredSucceeded)
        }
        (DeploymentPhase::AmbiguousSubmission, PhaseEvent::RecoveryFailed) => {
            Ok(DeploymentPhase::RecoveryFailed)
        }
        (DeploymentPhase::AmbiguousSubmission, PhaseEvent::PersistFailed) => {
            Ok(DeploymentPhase::Failed)
        }
        _ => Err(TransitionError {
            from: *current,
            event: *event,
        }),
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn run(events: &[PhaseEvent]) -> Result<DeploymentPhase, TransitionError> {
        events
            .iter()
            .try_fold(DeploymentPhase::Pending, |phase, event| {
                transition(&phase, event)
            })
    }

    #[test]
    fn test_clean_success_path() {
        let phase = run(&[PhaseEvent::Submitted, PhaseEvent::SubmissionSucceeded]).unwrap();
        assert_eq!(phase, DeploymentPhase::Succeeded);
        assert!(phase.is_terminal());
        assert!(phase.is_success());
    }

    #[test]
    fn test_recovery_paths() {
        let recovered = run(&[
            PhaseEvent::Submitted,
            PhaseEvent::SubmissionAmbiguous,
            PhaseEvent::RecoverySucceeded,
        ])
        .unwrap();
        assert_eq!(recovered, DeploymentPhase::RecoveredSucceeded);
        assert!(recovered.is_success());

        let lost = run(&[
            PhaseEvent::Submitted,
            PhaseEvent::SubmissionAmbiguous,
            PhaseEvent::RecoveryFailed,
        ])
        .unwrap();
        assert_eq!(lost, DeploymentPhase::RecoveryFailed);
        assert!(!lost.is_success());
    }

    #[test]
    fn test_preflight_failure_and_skip() {
        assert_eq!(
            run(&[PhaseEvent::PreflightFailed]).unwrap(),
            DeploymentPhase::Failed
        );
        assert_eq!(
            run(&[PhaseEvent::SkipRequested]).unwrap(),
            DeploymentPhase::Skipped
        );
    }

    #[test]
    fn test_cannot_skip_after_submitting() {
        let err = run(&[PhaseEvent::Submitted, PhaseEvent::SkipRequested]).unwrap_err();
        assert_eq!(err.from, DeploymentPhase::Submitting);
        assert_eq!(err.event, PhaseEvent::SkipRequested);
    }

    #[test]
    fn test_cannot_recover_without_ambiguous_submission() {
        assert!(run(&[PhaseEvent::Submitted, PhaseEvent::RecoverySucceeded]).is_err());
    }

    #[test]
    fn test_terminal_phases_accept_no_events() {
        let events = [
            PhaseEvent::SkipRequested,
            PhaseEvent::PreflightFailed,
            PhaseEvent::Submitted,
            PhaseEvent::SubmissionSucceeded,
            PhaseEvent::SubmissionAmbiguous,
            PhaseEvent::SubmissionFailed,
            PhaseEvent::RecoverySucceeded,
            PhaseEvent::RecoveryFailed,
            PhaseEvent::PersistFailed,
        ];

        for phase in DeploymentPhase::iter().filter(DeploymentPhase::is_terminal) {
            for event in &events {
                assert!(
                    transition(&phase, event).is_err(),
                    "{phase} accepted {event:?}"
                );
            }
        }
    }
}
