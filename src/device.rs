//! Device abstraction and the shared per-frame update protocol.
//!
//! Every concrete device embeds a [`DeviceCore`] holding its id, connection
//! flag, frame clock, axes, buttons and event source. The [`Device`] trait
//! provides the frame protocol on top of it:
//!
//! 1. [`Device::refresh`] brings raw state up to date (hardware poll, or
//!    queued touch input). It must call [`DeviceCore::update_button`] for
//!    every button exactly once per frame.
//! 2. The core diffs each button against the previous frame, in ascending
//!    index order, emitting `ButtonDown`, `ButtonUp`, `ButtonPress` (tap) and
//!    `ButtonLongPress`.
//! 3. The core emits `AxisChange` for each axis that changed, is non-zero, or
//!    was explicitly announced during refresh.
//!
//! Button events always precede axis events within one frame.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::time::Duration;

use tracing::{debug, info};

use crate::button::{Button, ButtonTransition};
use crate::event::{ChannelDesc, ChannelKind, InputEvent, InputKind, LONG_PRESS_THRESHOLD};
use crate::eventsource::EventSource;
use crate::mapping::{StandardAxis, StandardButton};
use crate::metadata::DeviceMeta;
use crate::pointer::PointerEvent;
use crate::snapshot::{ButtonState, DeviceState};

/// Concrete device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Gamepad,
    VirtualSurface,
}

/// A dual-motor rumble request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rumble {
    pub duration_ms: u64,
    pub weak_magnitude: f32,
    pub strong_magnitude: f32,
}

impl Default for Rumble {
    fn default() -> Self {
        Self {
            duration_ms: 200,
            weak_magnitude: 0.5,
            strong_magnitude: 1.0,
        }
    }
}

impl Rumble {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// State and event plumbing shared by every device.
#[derive(Debug)]
pub struct DeviceCore {
    id: String,
    name: String,
    mapping: String,
    connected: bool,
    /// Sum of every `advance` delta since creation.
    clock: Duration,
    /// Offset from the frame clock to the shared stream time.
    origin: Duration,
    axes: Vec<f32>,
    /// Axis values as of the previous frame's emission.
    last_axes: Vec<f32>,
    /// Axes that must be reported this frame even if unchanged.
    announced: Vec<bool>,
    buttons: Vec<Button>,
    events: EventSource<InputEvent>,
}

impl DeviceCore {
    /// Creates a disconnected device with `buttons` buttons and `axes` axes.
    pub fn new(id: impl Into<String>, name: impl Into<String>, buttons: usize, axes: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mapping: "standard".to_string(),
            connected: false,
            clock: Duration::ZERO,
            origin: Duration::ZERO,
            axes: vec![0.0; axes],
            last_axes: vec![0.0; axes],
            announced: vec![false; axes],
            buttons: vec![Button::new(); buttons],
            events: EventSource::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &str {
        &self.mapping
    }

    pub fn set_mapping(&mut self, mapping: impl Into<String>) {
        self.mapping = mapping.into();
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Current frame-clock time.
    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn axes(&self) -> &[f32] {
        &self.axes
    }

    /// Axis value, `0.0` for unknown indices.
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn button(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }

    pub fn events(&mut self) -> &mut EventSource<InputEvent> {
        &mut self.events
    }

    /// Marks the device connected and emits `Connected`. No-op if already connected.
    pub fn connect(&mut self) {
        if self.connected {
            return;
        }
        self.connected = true;
        info!(device = %self.id, "device connected");
        self.emit(InputKind::Connected);
    }

    /// Marks the device disconnected and emits `Disconnected`. No-op if already disconnected.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        info!(device = %self.id, "device disconnected");
        self.emit(InputKind::Disconnected);
    }

    /// Time stamped on emitted events: the frame clock shifted onto the
    /// stream time set by [`align_clock`](Self::align_clock).
    pub fn timestamp(&self) -> Duration {
        self.origin + self.clock
    }

    /// Moves the event timestamp forward to `now` if it lags behind.
    /// Press durations keep using the frame clock.
    pub fn align_clock(&mut self, now: Duration) {
        if now > self.timestamp() {
            self.origin = now - self.clock;
        }
    }

    pub(crate) fn tick(&mut self, dt: Duration) {
        self.clock += dt;
    }

    /// Grows or shrinks the channel arrays to match the raw source.
    pub fn resize(&mut self, buttons: usize, axes: usize) {
        if self.buttons.len() != buttons {
            self.buttons.resize(buttons, Button::new());
        }
        if self.axes.len() != axes {
            self.axes.resize(axes, 0.0);
            self.last_axes.resize(axes, 0.0);
            self.announced.resize(axes, false);
        }
    }

    /// Feeds one button's raw state at the current clock. Custom devices
    /// call this for every button from [`Device::refresh`].
    pub fn update_button(
        &mut self,
        index: usize,
        pressed: bool,
        touched: bool,
        value: Option<f32>,
    ) -> Option<ButtonTransition> {
        let now = self.clock;
        self.buttons
            .get_mut(index)
            .map(|b| b.update(pressed, touched, value, now))
    }

    pub fn write_axis(&mut self, index: usize, value: f32) {
        if let Some(slot) = self.axes.get_mut(index) {
            *slot = value;
        }
    }

    /// Forces an `AxisChange` for `index` this frame.
    pub fn announce_axis(&mut self, index: usize) {
        if let Some(flag) = self.announced.get_mut(index) {
            *flag = true;
        }
    }

    /// Steps 2 and 3 of the frame protocol.
    pub(crate) fn emit_transitions(&mut self) {
        let now = self.clock;
        let mut pending = Vec::new();

        for (index, button) in self.buttons.iter_mut().enumerate() {
            if button.just_pressed() {
                pending.push(InputKind::ButtonDown { button: index });
            }

            if button.just_released() {
                let duration = button.last_press_duration();
                if duration > LONG_PRESS_THRESHOLD && !button.last_press_long_reported() {
                    // Held across the threshold between two frames.
                    pending.push(InputKind::ButtonLongPress {
                        button: index,
                        duration,
                    });
                }
                pending.push(InputKind::ButtonUp {
                    button: index,
                    duration,
                });
                if duration < LONG_PRESS_THRESHOLD {
                    pending.push(InputKind::ButtonPress {
                        button: index,
                        duration,
                    });
                }
            }

            if button.is_pressed() && !button.long_press_emitted() {
                let duration = button.pressed_duration(now);
                if duration > LONG_PRESS_THRESHOLD {
                    button.mark_long_press();
                    pending.push(InputKind::ButtonLongPress {
                        button: index,
                        duration,
                    });
                }
            }
        }

        for axis in 0..self.axes.len() {
            let value = self.axes[axis];
            if value != self.last_axes[axis] || value != 0.0 || self.announced[axis] {
                pending.push(InputKind::AxisChange { axis, value });
            }
            self.last_axes[axis] = value;
            self.announced[axis] = false;
        }

        for kind in pending {
            self.emit(kind);
        }
    }

    fn emit(&mut self, kind: InputKind) {
        debug!(device = %self.id, event = %kind.channel(), ?kind, "emit");
        let event = InputEvent::new(self.id.clone(), self.timestamp(), kind);
        self.events.emit(&event);
    }

    pub fn state(&self) -> DeviceState {
        DeviceState {
            id: self.id.clone(),
            connected: self.connected,
            timestamp: self.clock,
            mapping: self.mapping.clone(),
            axes: self.axes.clone(),
            buttons: self
                .buttons
                .iter()
                .map(|b| ButtonState {
                    pressed: b.is_pressed(),
                    touched: b.is_touched(),
                    value: b.value(),
                })
                .collect(),
        }
    }

    /// Channel list with standard names where the index has one.
    pub fn describe(&self) -> Vec<ChannelDesc> {
        let axes = (0..self.axes.len()).map(|idx| ChannelDesc {
            kind: ChannelKind::Axis,
            idx,
            name: StandardAxis::from_index(idx).map(StandardAxis::name),
        });
        let buttons = (0..self.buttons.len()).map(|idx| ChannelDesc {
            kind: ChannelKind::Button,
            idx,
            name: StandardButton::from_index(idx).map(StandardButton::name),
        });
        axes.chain(buttons).collect()
    }
}

/// A polled input source exposing buttons and axes.
pub trait Device {
    fn core(&self) -> &DeviceCore;
    fn core_mut(&mut self) -> &mut DeviceCore;

    fn kind(&self) -> DeviceKind;

    /// Brings raw state up to date for the current frame.
    fn refresh(&mut self);

    /// Runs after transition events have been emitted.
    fn after_advance(&mut self) {}

    /// Advances the frame clock by `dt`, refreshes, and emits transition
    /// events. Disconnected devices are not advanced.
    fn advance(&mut self, dt: Duration) {
        if !self.core().is_connected() {
            return;
        }
        self.core_mut().tick(dt);
        self.refresh();
        // Refresh may discover the hardware is gone.
        if !self.core().is_connected() {
            return;
        }
        self.core_mut().emit_transitions();
        self.after_advance();
    }

    fn id(&self) -> &str {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn is_connected(&self) -> bool {
        self.core().is_connected()
    }

    fn connect(&mut self) {
        self.core_mut().connect();
    }

    fn disconnect(&mut self) {
        self.core_mut().disconnect();
    }

    fn events(&mut self) -> &mut EventSource<InputEvent> {
        self.core_mut().events()
    }

    fn metadata(&self) -> DeviceMeta {
        DeviceMeta {
            name: Some(self.core().name().to_string()),
            kind: Some(self.kind()),
            mapping: Some(self.core().mapping().to_string()),
            ..DeviceMeta::default()
        }
    }

    fn describe(&self) -> Vec<ChannelDesc> {
        self.core().describe()
    }

    fn state(&self) -> DeviceState {
        self.core().state()
    }

    /// Plays a rumble effect. Returns `false` when unsupported.
    fn vibrate(&mut self, _rumble: &Rumble) -> bool {
        false
    }

    /// Offers a pointer event to the device. Returns `true` if consumed.
    fn handle_pointer(&mut self, _event: &PointerEvent) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
