//! State machine trait for lifecycle status enums.
//!
//! Tenant status and license key status both implement this so that every
//! status change goes through one validated code path.

use std::fmt::Debug;

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list the legal edges; `transition_to` is the only way
/// aggregates move between states.
pub trait StateMachine: Sized + Copy + PartialEq + Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Open,
        Closed,
        Welded,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Door::Open => vec![Door::Closed],
                Door::Closed => vec![Door::Open, Door::Welded],
                Door::Welded => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_listed_edge() {
        assert_eq!(Door::Closed.transition_to(Door::Welded), Ok(Door::Welded));
    }

    #[test]
    fn transition_to_rejects_unlisted_edge() {
        let err = Door::Open.transition_to(Door::Welded).unwrap_err();
        assert!(err.to_string().contains("Cannot transition from Open to Welded"));
    }

    #[test]
    fn terminal_state_has_no_outgoing_edges() {
        assert!(Door::Welded.is_terminal());
        assert!(!Door::Open.is_terminal());
    }
}
