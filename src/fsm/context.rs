//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  The coordinator writes the inputs (time, enabled flag, the
//! latest distance, whether the peer's ack arrived) before each tick; the
//! handlers write back the next I/O [`Action`] they need, the indicator
//! colour, and the episode outcome.  Handlers never perform I/O.

use crate::app::events::Outcome;
use crate::app::ports::Colour;
use crate::config::NodeConfig;

// ---------------------------------------------------------------------------
// Requested action (written by state handlers; performed by the coordinator)
// ---------------------------------------------------------------------------

/// Blocking work the current state needs done before its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to do.
    None,
    /// Take one sensor reading into `distance_cm`.
    Measure,
    /// Show the detect colour, run the actuation sequence, hold, clear,
    /// then broadcast our trigger.
    ActuateAndBroadcast,
    /// One bounded receive, setting `ack_received` on the peer's ack.
    PollAck,
    /// Show `indicator` for the hold time, then clear.
    ShowOutcome,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Clock reading taken just before this tick (ms).
    pub now_ms: u64,

    // -- Inputs --
    /// Override not asserted.
    pub enabled: bool,
    /// Latest sensor reading, `None` = no reading.
    pub distance_cm: Option<f32>,
    /// The peer's ack was seen by the last poll.
    pub ack_received: bool,

    // -- Episode state --
    /// Completion time of the last local episode; `None` is always eligible.
    pub last_trigger_ms: Option<u64>,
    /// When our trigger was sent.
    pub ack_wait_start_ms: u64,
    /// Result of the episode in progress, taken by the coordinator.
    pub outcome: Option<Outcome>,

    // -- Outputs --
    pub action: Action,
    pub indicator: Colour,

    // -- Configuration --
    pub config: NodeConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            now_ms: 0,
            enabled: true,
            distance_cm: None,
            ack_received: false,
            last_trigger_ms: None,
            ack_wait_start_ms: 0,
            outcome: None,
            action: Action::None,
            indicator: Colour::OFF,
            config,
        }
    }

    /// Strictly more than the cooldown has passed since the last local
    /// episode finished.
    pub fn cooldown_elapsed(&self) -> bool {
        match self.last_trigger_ms {
            None => true,
            Some(last) => self.now_ms.saturating_sub(last) > u64::from(self.config.cooldown_ms),
        }
    }

    /// Milliseconds spent waiting for the ack so far.
    pub fn ack_wait_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.ack_wait_start_ms)
    }

    /// The latest reading is under the trigger threshold.
    pub fn object_in_range(&self) -> bool {
        self.distance_cm
            .is_some_and(|d| d < self.config.distance_threshold_cm)
    }
}
