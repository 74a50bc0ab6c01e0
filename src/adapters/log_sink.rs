//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (ESP-IDF logger → UART / USB-CDC in production).
//! Telemetry is rendered as one JSON line so it can be scraped off the
//! serial console.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("TELEM | {}", json),
                Err(e) => warn!("TELEM | serialisation failed: {}", e),
            },
            AppEvent::Started { role, state } => {
                info!("START | node={} initial_state={:?}", role, state);
            }
            AppEvent::EnableChanged { enabled } => {
                info!("ENABLE | {}", if *enabled { "enabled" } else { "disabled" });
            }
            AppEvent::StateChanged { from, to } => {
                debug!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::DistanceTriggered { distance_cm } => {
                info!("SENSOR | object at {:.1} cm", distance_cm);
            }
            AppEvent::TriggerSent(msg) => {
                info!("TX | {}", msg);
            }
            AppEvent::AckReceived { after_ms } => {
                info!("ACK | received after {} ms", after_ms);
            }
            AppEvent::AckTimedOut { waited_ms } => {
                warn!("ACK | timed out after {} ms", waited_ms);
            }
            AppEvent::PeerTriggerServed { during_ack_wait } => {
                info!(
                    "PEER | trigger served{}",
                    if *during_ack_wait { " during ack wait" } else { "" }
                );
            }
            AppEvent::PeerTriggerIgnored => {
                info!("PEER | trigger ignored, disabled");
            }
            AppEvent::AckSent(msg) => {
                info!("TX | {}", msg);
            }
            AppEvent::StaleAckDropped => {
                debug!("PEER | stale ack dropped");
            }
            AppEvent::SendFailed { message, error } => {
                warn!("TX | {} failed: {}", message, error);
            }
            AppEvent::EpisodeFinished(ep) => {
                info!("EPISODE | {:?} -> {:?}", ep.origin, ep.outcome);
            }
        }
    }
}
