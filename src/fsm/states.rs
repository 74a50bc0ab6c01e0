//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.
//!
//! ```text
//!  IDLE ──[enabled ∧ cooldown over]──▶ SENSING ──[no reading / ≥ threshold]──▶ IDLE
//!                                         │
//!                                  [< threshold]
//!                                         ▼
//!                                   BROADCASTING   (detect colour, actuate, send trigger)
//!                                         │
//!                                         ▼
//!                                   AWAITING_ACK ──[deadline]──▶ TIMEOUT ──┐
//!                                         │                               │
//!                                   [peer ack]                            │
//!                                         ▼                               │
//!                                      SUCCESS ──────────────────────────┴──▶ IDLE
//!                                                   (last_trigger = now)
//! ```

use super::context::{Action, FsmContext};
use super::{StateDescriptor, StateId};
use crate::app::events::Outcome;
use crate::app::ports::Colour;
use log::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Sensing
        StateDescriptor {
            id: StateId::Sensing,
            name: "Sensing",
            on_enter: Some(sensing_enter),
            on_exit: None,
            on_update: sensing_update,
        },
        // Index 2: Broadcasting
        StateDescriptor {
            id: StateId::Broadcasting,
            name: "Broadcasting",
            on_enter: Some(broadcasting_enter),
            on_exit: None,
            on_update: broadcasting_update,
        },
        // Index 3: AwaitingAck
        StateDescriptor {
            id: StateId::AwaitingAck,
            name: "AwaitingAck",
            on_enter: Some(awaiting_ack_enter),
            on_exit: None,
            on_update: awaiting_ack_update,
        },
        // Index 4: Success
        StateDescriptor {
            id: StateId::Success,
            name: "Success",
            on_enter: Some(success_enter),
            on_exit: Some(episode_exit),
            on_update: outcome_update,
        },
        // Index 5: Timeout
        StateDescriptor {
            id: StateId::Timeout,
            name: "Timeout",
            on_enter: Some(timeout_enter),
            on_exit: Some(episode_exit),
            on_update: outcome_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.action = Action::None;
    ctx.indicator = Colour::OFF;
    ctx.distance_cm = None;
    ctx.ack_received = false;
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.enabled && ctx.cooldown_elapsed() {
        return Some(StateId::Sensing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SENSING state: one distance reading
// ═══════════════════════════════════════════════════════════════════════════

fn sensing_enter(ctx: &mut FsmContext) {
    ctx.distance_cm = None;
    ctx.action = Action::Measure;
}

fn sensing_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.object_in_range() {
        info!(
            "SENSING: object at {:.1} cm (< {:.0} cm), triggering",
            ctx.distance_cm.unwrap_or_default(),
            ctx.config.distance_threshold_cm
        );
        return Some(StateId::Broadcasting);
    }
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  BROADCASTING state: local actuation, then our trigger goes out
// ═══════════════════════════════════════════════════════════════════════════

fn broadcasting_enter(ctx: &mut FsmContext) {
    ctx.indicator = Colour::DETECTING;
    ctx.action = Action::ActuateAndBroadcast;
}

fn broadcasting_update(ctx: &mut FsmContext) -> Option<StateId> {
    // The trigger has just been sent; the ack window opens now.
    ctx.ack_wait_start_ms = ctx.now_ms;
    Some(StateId::AwaitingAck)
}

// ═══════════════════════════════════════════════════════════════════════════
//  AWAITING_ACK state: bounded poll for the peer's ack
// ═══════════════════════════════════════════════════════════════════════════

fn awaiting_ack_enter(ctx: &mut FsmContext) {
    ctx.indicator = Colour::OFF;
    ctx.ack_received = false;
    ctx.action = Action::PollAck;
    debug!(
        "AWAITING_ACK: waiting up to {} ms",
        ctx.config.ack_timeout_ms
    );
}

fn awaiting_ack_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.ack_received {
        return Some(StateId::Success);
    }
    if ctx.ack_wait_elapsed_ms() >= u64::from(ctx.config.ack_timeout_ms) {
        return Some(StateId::Timeout);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  SUCCESS / TIMEOUT: outcome colour, then back to idle
// ═══════════════════════════════════════════════════════════════════════════

fn success_enter(ctx: &mut FsmContext) {
    ctx.indicator = Colour::SUCCESS;
    ctx.outcome = Some(Outcome::Acked);
    ctx.action = Action::ShowOutcome;
    info!(
        "SUCCESS: peer acked after {} ms",
        ctx.ack_wait_elapsed_ms()
    );
}

fn timeout_enter(ctx: &mut FsmContext) {
    ctx.indicator = Colour::FAILURE;
    ctx.outcome = Some(Outcome::TimedOut);
    ctx.action = Action::ShowOutcome;
    warn!(
        "TIMEOUT: no ack within {} ms",
        ctx.config.ack_timeout_ms
    );
}

fn outcome_update(_ctx: &mut FsmContext) -> Option<StateId> {
    Some(StateId::Idle)
}

/// Cooldown restarts when the episode completes, whatever its outcome.
fn episode_exit(ctx: &mut FsmContext) {
    ctx.last_trigger_ms = Some(ctx.now_ms);
    ctx.indicator = Colour::OFF;
}
