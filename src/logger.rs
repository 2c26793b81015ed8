use tracing::{debug, info};

use crate::event::{InputEvent, InputKind};
use crate::eventsource::Listener;

/// A listener that logs every input event through `tracing`.
///
/// Lifecycle events (connection, player assignment) log at `info`, the
/// per-frame stream at `debug`.
#[derive(Debug, Default)]
pub struct EventLogger;

impl EventLogger {
    pub fn new() -> Self {
        EventLogger
    }
}

impl Listener<InputEvent> for EventLogger {
    fn on_event(&mut self, event: &InputEvent) {
        match event.kind {
            InputKind::Connected
            | InputKind::Disconnected
            | InputKind::PlayerDeviceAssigned { .. }
            | InputKind::PlayerDeviceUnassigned { .. } => info!(
                device = %event.device_id,
                player = ?event.player,
                event = %event.kind.channel(),
                "input"
            ),
            kind => debug!(
                device = %event.device_id,
                player = ?event.player,
                at = ?event.at,
                ?kind,
                "input"
            ),
        }
    }
}
