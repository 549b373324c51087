//! Slot lifecycle state machine
//!
//! `Unconfigured → Planned → Sampled → Locked`. Replanning and resampling
//! are allowed until the lock; `Locked` is terminal and there is no unlock.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Lifecycle state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No plan yet
    Unconfigured,
    /// Plan computed, nothing drawn
    Planned,
    /// Sample drawn, still replaceable
    Sampled,
    /// Sample frozen as evidence
    Locked,
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition {from} -> {to}")]
pub struct TransitionError {
    /// Current state
    pub from: LifecycleState,
    /// Requested state
    pub to: LifecycleState,
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: LifecycleState) -> Vec<LifecycleState> {
    use LifecycleState::{Locked, Planned, Sampled, Unconfigured};
    match from {
        Unconfigured => vec![Planned],
        Planned => vec![Planned, Sampled],
        Sampled => vec![Planned, Sampled, Locked],
        Locked => vec![],
    }
}

/// Validate one transition
///
/// # Errors
/// [`TransitionError`] if `to` is not reachable from `from`
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use LifecycleState::*;

    #[test]
    fn forward_path_is_allowed() {
        assert!(validate_transition(Unconfigured, Planned).is_ok());
        assert!(validate_transition(Planned, Sampled).is_ok());
        assert!(validate_transition(Sampled, Locked).is_ok());
    }

    #[test]
    fn rework_before_lock_is_allowed() {
        assert!(validate_transition(Planned, Planned).is_ok());
        assert!(validate_transition(Sampled, Planned).is_ok());
        assert!(validate_transition(Sampled, Sampled).is_ok());
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(validate_transition(Unconfigured, Sampled).is_err());
        assert!(validate_transition(Unconfigured, Locked).is_err());
        assert!(validate_transition(Planned, Locked).is_err());
    }

    fn any_state() -> impl Strategy<Value = LifecycleState> {
        prop_oneof![Just(Unconfigured), Just(Planned), Just(Sampled), Just(Locked)]
    }

    proptest! {
        #[test]
        fn prop_locked_is_terminal(to in any_state()) {
            prop_assert!(validate_transition(Locked, to).is_err());
        }

        #[test]
        fn prop_validation_agrees_with_table(from in any_state(), to in any_state()) {
            let allowed = allowed_transitions(from).contains(&to);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed);
        }
    }
}
