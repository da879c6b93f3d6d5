//! Per-suggestion "create task" lifecycle.
//!
//! ```text
//! Idle --submit--> Pending --ok--> Succeeded
//!                  Pending --err--> Failed --submit--> Pending
//! ```

use crate::ClientId;
use serde::{Deserialize, Serialize};

/// Identity of one suggested interaction's task submission.
///
/// Renders as `"{clientId}|{objective}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey(String);

impl ActionKey {
    pub fn new(client_id: ClientId, objective: &str) -> Self {
        Self(format!("{}|{}", client_id, objective))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionPhase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl ActionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionPhase::Succeeded | ActionPhase::Failed)
    }
}

/// State of one `ActionKey`. Never shared across keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub phase: ActionPhase,
    pub error: Option<String>,
    /// Tag of the submission that produced this state.
    pub attempt: u64,
}

impl ActionState {
    pub fn idle() -> Self {
        Self {
            phase: ActionPhase::Idle,
            error: None,
            attempt: 0,
        }
    }

    pub fn pending(attempt: u64) -> Self {
        Self {
            phase: ActionPhase::Pending,
            error: None,
            attempt,
        }
    }

    pub fn succeeded(attempt: u64) -> Self {
        Self {
            phase: ActionPhase::Succeeded,
            error: None,
            attempt,
        }
    }

    pub fn failed(attempt: u64, error: impl Into<String>) -> Self {
        Self {
            phase: ActionPhase::Failed,
            error: Some(error.into()),
            attempt,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.phase == ActionPhase::Pending
    }
}

impl Default for ActionState {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_key_format() {
        let key = ActionKey::new(42, "Discuss child education plan");
        assert_eq!(key.as_str(), "42|Discuss child education plan");
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn test_action_key_is_deterministic() {
        assert_eq!(ActionKey::new(1, "a"), ActionKey::new(1, "a"));
        assert_ne!(ActionKey::new(1, "a"), ActionKey::new(2, "a"));
        assert_ne!(ActionKey::new(1, "a"), ActionKey::new(1, "b"));
    }

    #[test]
    fn test_phase_terminality() {
        assert!(!ActionPhase::Idle.is_terminal());
        assert!(!ActionPhase::Pending.is_terminal());
        assert!(ActionPhase::Succeeded.is_terminal());
        assert!(ActionPhase::Failed.is_terminal());
    }
}
