use std::fmt;

use atlas_common::{GatewayError, Result};

/// Lifecycle of one coordinated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    Init,
    Endorsing,
    Committing,
    Committed,
    FailedEndorsement,
    FailedOrder,
}

impl CoordinatorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CoordinatorState::Committed | CoordinatorState::FailedEndorsement | CoordinatorState::FailedOrder
        )
    }

    pub fn can_transition_to(self, next: CoordinatorState) -> bool {
        use CoordinatorState::*;
        matches!(
            (self, next),
            (Init, Endorsing)
                | (Init, FailedEndorsement)
                | (Endorsing, Committing)
                | (Endorsing, FailedEndorsement)
                | (Committing, Committed)
                | (Committing, FailedOrder)
        )
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordinatorState::Init => "INIT",
            CoordinatorState::Endorsing => "ENDORSING",
            CoordinatorState::Committing => "COMMITTING",
            CoordinatorState::Committed => "COMMITTED",
            CoordinatorState::FailedEndorsement => "FAILED_ENDORSEMENT",
            CoordinatorState::FailedOrder => "FAILED_ORDER",
        };
        write!(f, "{}", s)
    }
}

/// Current state plus every state visited, in order.
#[derive(Debug, Clone)]
pub struct StateTracker {
    history: Vec<CoordinatorState>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self { history: vec![CoordinatorState::Init] }
    }
}

impl StateTracker {
    pub fn current(&self) -> CoordinatorState {
        *self.history.last().unwrap_or(&CoordinatorState::Init)
    }

    pub fn history(&self) -> &[CoordinatorState] {
        &self.history
    }

    pub fn advance(&mut self, next: CoordinatorState) -> Result<()> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(GatewayError::Other(format!("illegal transition {} -> {}", current, next)));
        }
        self.history.push(next);
        Ok(())
    }
}
