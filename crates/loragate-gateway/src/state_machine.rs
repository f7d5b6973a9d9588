//! Gateway lifecycle state machine.
//!
//! # States
//!
//! - `Starting`: acquiring the serial transport
//! - `Running`: processing lines
//! - `Stopping`: cancellation received, releasing the transport
//! - `Stopped`: clean shutdown complete
//! - `Failed`: the transport could not be acquired
//!
//! # Valid Transitions
//!
//! - Starting → Running → Stopping → Stopped
//! - Starting → Stopping (cancelled before the transport opened)
//! - Starting → Failed
//!
//! Per-line failures never leave `Running`.
//!
//! # Examples
//!
//! ```
//! use loragate_gateway::{GatewayState, Lifecycle};
//!
//! let mut lifecycle = Lifecycle::new();
//! assert_eq!(lifecycle.current_state(), GatewayState::Starting);
//!
//! lifecycle.transition_to(GatewayState::Running).unwrap();
//! assert!(lifecycle.transition_to(GatewayState::Starting).is_err());
//! ```

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use loragate_core::{Error, Result};

/// Lifecycle states of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    /// Acquiring the serial transport.
    Starting,

    /// Reading, decoding and forwarding lines.
    Running,

    /// Shutting down after cancellation.
    Stopping,

    /// Shut down cleanly.
    Stopped,

    /// Startup failed; the process exits non-zero.
    Failed,
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            GatewayState::Starting => "STARTING",
            GatewayState::Running => "RUNNING",
            GatewayState::Stopping => "STOPPING",
            GatewayState::Stopped => "STOPPED",
            GatewayState::Failed => "FAILED",
        };
        write!(f, "{}", state_str)
    }
}

impl GatewayState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use loragate_gateway::GatewayState;
    ///
    /// assert!(GatewayState::Starting.can_transition_to(&GatewayState::Running));
    /// assert!(!GatewayState::Running.can_transition_to(&GatewayState::Failed));
    /// ```
    pub fn can_transition_to(&self, target: &GatewayState) -> bool {
        matches!(
            (self, target),
            (
                GatewayState::Starting,
                GatewayState::Running | GatewayState::Stopping | GatewayState::Failed
            ) | (GatewayState::Running, GatewayState::Stopping)
                | (GatewayState::Stopping, GatewayState::Stopped)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GatewayState::Stopped | GatewayState::Failed)
    }
}

/// A recorded lifecycle transition.
#[derive(Debug, Clone, Copy)]
pub struct StateTransition {
    pub from: GatewayState,
    pub to: GatewayState,
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: GatewayState, to: GatewayState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Lifecycle tracker for one gateway run.
///
/// Holds the current state and the full transition history; a run has at
/// most four transitions.
#[derive(Debug)]
pub struct Lifecycle {
    current_state: GatewayState,
    history: Vec<StateTransition>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Starting` state.
    pub fn new() -> Self {
        Self {
            current_state: GatewayState::Starting,
            history: Vec::with_capacity(4),
        }
    }

    pub fn current_state(&self) -> GatewayState {
        self.current_state
    }

    /// Transitions so far, oldest first.
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the transition is not
    /// allowed from the current state; the state is left unchanged.
    pub fn transition_to(&mut self, new_state: GatewayState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.history.push(transition);

        tracing::debug!(from = %transition.from, to = %transition.to, "Gateway state changed");
        Ok(transition)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
