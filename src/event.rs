//! Events and channel descriptions.
//!
//! Devices report transitions as [`InputKind`] values wrapped in an
//! [`InputEvent`] carrying the device id and the device-clock timestamp. The
//! [`InputManager`](crate::manager::InputManager) re-emits them with the
//! owning player slot filled in and adds its own assignment events.
//!
//! ## Value conventions
//! - **Axes:** normalized to `[-1.0, 1.0]`, up/right positive, deadzone applied.
//! - **Buttons:** edges (`ButtonDown`/`ButtonUp`) plus tap/long-press classification.
//! - **Durations:** measured on the device's frame clock (the sum of `advance` deltas).

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::eventsource::Event;

/// Presses released before this are taps; presses held past it are long presses.
pub const LONG_PRESS_THRESHOLD: Duration = Duration::from_millis(500);

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum InputKind {
    Connected,
    Disconnected,
    /// Rising edge of a button.
    ButtonDown { button: usize },
    /// Falling edge; `duration` is how long the button was held.
    ButtonUp { button: usize, duration: Duration },
    /// A release that happened before [`LONG_PRESS_THRESHOLD`].
    ButtonPress { button: usize, duration: Duration },
    /// Emitted once per press when the hold crosses [`LONG_PRESS_THRESHOLD`].
    ButtonLongPress { button: usize, duration: Duration },
    AxisChange { axis: usize, value: f32 },
    /// Manager-level: a device now drives this player slot.
    PlayerDeviceAssigned { player: usize },
    /// Manager-level: a device no longer drives this player slot.
    PlayerDeviceUnassigned { player: usize },
}

/// Channel names, one per [`InputKind`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum InputChannel {
    Connected,
    Disconnected,
    ButtonDown,
    ButtonUp,
    ButtonPress,
    ButtonLongPress,
    AxisChange,
    PlayerDeviceAssigned,
    PlayerDeviceUnassigned,
}

impl InputChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            InputChannel::Connected => "connected",
            InputChannel::Disconnected => "disconnected",
            InputChannel::ButtonDown => "buttonDown",
            InputChannel::ButtonUp => "buttonUp",
            InputChannel::ButtonPress => "buttonPress",
            InputChannel::ButtonLongPress => "buttonLongPress",
            InputChannel::AxisChange => "axisChange",
            InputChannel::PlayerDeviceAssigned => "playerDeviceAssigned",
            InputChannel::PlayerDeviceUnassigned => "playerDeviceUnassigned",
        }
    }
}

impl fmt::Display for InputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InputKind {
    pub fn channel(&self) -> InputChannel {
        match self {
            InputKind::Connected => InputChannel::Connected,
            InputKind::Disconnected => InputChannel::Disconnected,
            InputKind::ButtonDown { .. } => InputChannel::ButtonDown,
            InputKind::ButtonUp { .. } => InputChannel::ButtonUp,
            InputKind::ButtonPress { .. } => InputChannel::ButtonPress,
            InputKind::ButtonLongPress { .. } => InputChannel::ButtonLongPress,
            InputKind::AxisChange { .. } => InputChannel::AxisChange,
            InputKind::PlayerDeviceAssigned { .. } => InputChannel::PlayerDeviceAssigned,
            InputKind::PlayerDeviceUnassigned { .. } => InputChannel::PlayerDeviceUnassigned,
        }
    }

    /// Button index for button-related kinds.
    pub fn button(&self) -> Option<usize> {
        match *self {
            InputKind::ButtonDown { button }
            | InputKind::ButtonUp { button, .. }
            | InputKind::ButtonPress { button, .. }
            | InputKind::ButtonLongPress { button, .. } => Some(button),
            _ => None,
        }
    }
}

/// Timestamped event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputEvent {
    /// Id of the device the event concerns.
    pub device_id: String,
    /// Player slot driven by the device; filled in by the manager.
    pub player: Option<usize>,
    /// Device clock at emission.
    pub at: Duration,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn new(device_id: impl Into<String>, at: Duration, kind: InputKind) -> Self {
        Self {
            device_id: device_id.into(),
            player: None,
            at,
            kind,
        }
    }

    pub fn with_player(mut self, player: Option<usize>) -> Self {
        self.player = player;
        self
    }
}

impl Event for InputEvent {
    type Channel = InputChannel;

    fn channel(&self) -> InputChannel {
        self.kind.channel()
    }
}

/// Category of an input channel on a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ChannelKind {
    Axis,
    Button,
}

/// Describes a channel exposed by a device.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelDesc {
    pub kind: ChannelKind,
    /// Device-local index (matches indices used in [`InputKind`]).
    pub idx: usize,
    /// Standard-mapping name when the index has one (e.g. `"A"`, `"LEFT_STICK_X"`).
    pub name: Option<&'static str>,
}
