//! Outbound application events.
//!
//! The [`Coordinator`](super::service::Coordinator) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, record in a test, etc.

use serde::Serialize;

use crate::error::CommsError;
use crate::fsm::StateId;
use crate::protocol::{Message, Role};

/// Which side started an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// This node's own sensor fired.
    Local,
    /// The peer's trigger message arrived.
    Remote,
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Local: the peer's ack arrived in time.  Remote: we actuated and
    /// sent our ack.
    Acked,
    /// Local: no ack before the deadline.
    TimedOut,
    /// Remote: the node was disabled, so nothing happened.
    IgnoredDisabled,
}

/// One finished trigger episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Episode {
    pub origin: Origin,
    pub outcome: Outcome,
}

/// Counters since boot.  Reset on power cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub cycles: u64,
    pub triggers_sent: u32,
    pub acks_received: u32,
    pub ack_timeouts: u32,
    pub remote_served: u32,
    pub remote_ignored: u32,
    pub self_echoes_dropped: u32,
    pub stale_acks_dropped: u32,
    /// Peer triggers discarded because they arrived during our ack wait.
    pub triggers_dropped_in_ack_wait: u32,
    pub unknown_dropped: u32,
    pub send_failures: u32,
}

/// Periodic telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryData {
    pub role: Role,
    pub uptime_secs: u64,
    pub enabled: bool,
    pub stats: NodeStats,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The coordinator has started (carries role and initial state).
    Started { role: Role, state: StateId },

    /// The override switch changed the node's enabled state.
    EnableChanged { enabled: bool },

    /// The local-episode FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A reading under the threshold started a local episode.
    DistanceTriggered { distance_cm: f32 },

    /// Our trigger went out on the wire.
    TriggerSent(Message),

    /// The peer acked our trigger after `after_ms` of waiting.
    AckReceived { after_ms: u64 },

    /// No ack within the deadline.
    AckTimedOut { waited_ms: u64 },

    /// We actuated for the peer.
    PeerTriggerServed { during_ack_wait: bool },

    /// A peer trigger arrived while disabled.
    PeerTriggerIgnored,

    /// Our ack went out on the wire.
    AckSent(Message),

    /// A peer ack arrived with no ack wait open.
    StaleAckDropped,

    /// The transport refused a datagram.
    SendFailed { message: Message, error: CommsError },

    /// An episode completed its indicator sequence.
    EpisodeFinished(Episode),

    /// Periodic counters snapshot.
    Telemetry(TelemetryData),
}
