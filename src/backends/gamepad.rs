//! Polled physical gamepads.
//!
//! The host platform is reached through [`RawGamepadSource`]: it reports
//! hot-plug changes and returns a raw snapshot of one pad on demand.
//! [`PhysicalGamepadDevice`] turns those snapshots into the standard frame
//! protocol.
//!
//! # Channel conventions
//! - Axes are normalized to `[-1.0, 1.0]`, magnitudes below the deadzone read
//!   as exactly `0.0`.
//! - Vertical stick axes (`1` and `3`) are **inverted** by default so that up
//!   is positive. Sources report raw values with down positive.
//! - A button reads as touched whenever it is pressed, for pads without touch
//!   sensing.
//! - Button values are analog (`0.0..=1.0`); triggers report partial travel.
//!
//! A pad that stops answering polls disconnects itself.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::GamepadSettings;
use crate::device::{Device, DeviceCore, DeviceKind, Rumble};
use crate::mapping::{StandardAxis, STANDARD_AXIS_COUNT, STANDARD_BUTTON_COUNT};
use crate::metadata::DeviceMeta;

/// Raw state of one button as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawButton {
    pub pressed: bool,
    pub touched: bool,
    pub value: f32,
}

impl RawButton {
    /// A fully pressed digital button.
    pub fn down() -> Self {
        Self {
            pressed: true,
            touched: true,
            value: 1.0,
        }
    }
}

/// Raw state of one pad at poll time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadSnapshot {
    pub buttons: Vec<RawButton>,
    /// Raw axes, down positive on vertical axes.
    pub axes: Vec<f32>,
}

impl GamepadSnapshot {
    /// Neutral snapshot with the standard channel counts.
    pub fn standard() -> Self {
        Self {
            buttons: vec![RawButton::default(); STANDARD_BUTTON_COUNT],
            axes: vec![0.0; STANDARD_AXIS_COUNT],
        }
    }
}

/// Description of a newly connected pad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadInfo {
    pub name: String,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    /// Whether the pad accepts rumble.
    pub rumble: bool,
}

/// Hot-plug notification.
#[derive(Debug, Clone, PartialEq)]
pub enum GamepadConnection {
    Connected { index: u32, info: GamepadInfo },
    Disconnected { index: u32 },
}

/// Host platform gamepad access.
pub trait RawGamepadSource {
    /// Hot-plug changes since the previous call, oldest first.
    fn poll_connections(&mut self) -> Vec<GamepadConnection>;

    /// Current state of the pad in slot `index`, `None` if it is gone.
    fn snapshot(&mut self, index: u32) -> Option<GamepadSnapshot>;

    /// Plays a rumble effect. Returns `false` when unsupported.
    fn vibrate(&mut self, _index: u32, _rumble: &Rumble) -> bool {
        false
    }
}

/// A source shared between the manager and every pad it produced.
pub type SharedGamepadSource = Rc<RefCell<dyn RawGamepadSource>>;

/// Device id for the pad in platform slot `index`.
pub fn gamepad_id(index: u32) -> String {
    format!("gamepad-{index}")
}

/// Physical gamepad in one platform slot.
pub struct PhysicalGamepadDevice {
    core: DeviceCore,
    index: u32,
    source: SharedGamepadSource,
    settings: GamepadSettings,
    info: GamepadInfo,
}

impl PhysicalGamepadDevice {
    pub fn new(index: u32, source: SharedGamepadSource, settings: GamepadSettings, info: GamepadInfo) -> Self {
        let name = if info.name.is_empty() {
            format!("Gamepad {index}")
        } else {
            info.name.clone()
        };
        Self {
            core: DeviceCore::new(gamepad_id(index), name, STANDARD_BUTTON_COUNT, STANDARD_AXIS_COUNT),
            index,
            source,
            settings,
            info,
        }
    }

    /// Platform slot.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn settings(&self) -> &GamepadSettings {
        &self.settings
    }

    pub fn set_deadzone(&mut self, deadzone: f32) -> crate::Result<()> {
        self.settings.deadzone = crate::error::check_deadzone(deadzone)?;
        Ok(())
    }

    pub fn set_invert_y(&mut self, invert: bool) {
        self.settings.invert_y = invert;
    }

    fn shape_axis(&self, index: usize, raw: f32) -> f32 {
        let mut value = if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 };
        let vertical = StandardAxis::from_index(index).is_some_and(StandardAxis::is_vertical);
        if self.settings.invert_y && vertical {
            value = -value;
        }
        if value.abs() < self.settings.deadzone {
            0.0
        } else {
            value
        }
    }
}

impl Device for PhysicalGamepadDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Gamepad
    }

    fn refresh(&mut self) {
        let polled = self.source.borrow_mut().snapshot(self.index);
        let Some(snapshot) = polled else {
            warn!(device = %self.core.id(), "gamepad stopped responding");
            self.core.disconnect();
            return;
        };

        self.core.resize(snapshot.buttons.len(), snapshot.axes.len());

        for (index, raw) in snapshot.axes.iter().enumerate() {
            let value = self.shape_axis(index, *raw);
            self.core.write_axis(index, value);
        }

        for (index, raw) in snapshot.buttons.iter().enumerate() {
            self.core
                .update_button(index, raw.pressed, raw.touched || raw.pressed, Some(raw.value));
        }
    }

    fn metadata(&self) -> DeviceMeta {
        DeviceMeta {
            name: Some(self.core.name().to_string()),
            kind: Some(DeviceKind::Gamepad),
            mapping: Some(self.core.mapping().to_string()),
            vendor_id: self.info.vendor_id,
            product_id: self.info.product_id,
            slot: Some(self.index),
            rumble: Some(self.info.rumble),
            surfaces: Vec::new(),
        }
    }

    fn vibrate(&mut self, rumble: &Rumble) -> bool {
        if !self.core.is_connected() {
            return false;
        }
        let played = self.source.borrow_mut().vibrate(self.index, rumble);
        debug!(device = %self.core.id(), played, ?rumble, "vibrate");
        played
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{InputEvent, InputKind};
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct Pads {
        pads: HashMap<u32, GamepadSnapshot>,
        rumbles: Vec<u32>,
    }

    impl RawGamepadSource for Pads {
        fn poll_connections(&mut self) -> Vec<GamepadConnection> {
            Vec::new()
        }
        fn snapshot(&mut self, index: u32) -> Option<GamepadSnapshot> {
            self.pads.get(&index).cloned()
        }
        fn vibrate(&mut self, index: u32, _rumble: &Rumble) -> bool {
            self.rumbles.push(index);
            true
        }
    }

    fn setup() -> (Rc<RefCell<Pads>>, PhysicalGamepadDevice) {
        let pads = Rc::new(RefCell::new(Pads::default()));
        pads.borrow_mut().pads.insert(0, GamepadSnapshot::standard());
        let source: SharedGamepadSource = pads.clone();
        let mut dev = PhysicalGamepadDevice::new(0, source, GamepadSettings::default(), GamepadInfo::default());
        dev.connect();
        (pads, dev)
    }

    #[test]
    fn deadzone_and_inverted_y() {
        let (pads, mut dev) = setup();
        {
            let mut p = pads.borrow_mut();
            let snap = p.pads.get_mut(&0).unwrap();
            snap.axes = vec![0.05, 0.8, -0.09, -0.5];
        }
        dev.advance(Duration::from_millis(16));
        assert_eq!(dev.core().axes(), &[0.0, -0.8, 0.0, 0.5]);
    }

    #[test]
    fn pressed_implies_touched_and_keeps_analog_value() {
        let (pads, mut dev) = setup();
        pads.borrow_mut().pads.get_mut(&0).unwrap().buttons[7] = RawButton {
            pressed: true,
            touched: false,
            value: 0.6,
        };
        dev.advance(Duration::from_millis(16));
        let rt = dev.core().button(7).unwrap();
        assert!(rt.is_pressed());
        assert!(rt.is_touched());
        assert!((rt.value() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn vanished_pad_disconnects_itself() {
        let (pads, mut dev) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        dev.events().on_any(move |e: &InputEvent| sink.borrow_mut().push(e.kind));

        pads.borrow_mut().pads.clear();
        dev.advance(Duration::from_millis(16));
        assert!(!dev.is_connected());
        assert_eq!(*log.borrow(), vec![InputKind::Disconnected]);

        // No further polling once disconnected.
        dev.advance(Duration::from_millis(16));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn vibrate_goes_to_source() {
        let (pads, mut dev) = setup();
        assert!(dev.vibrate(&Rumble::default()));
        assert_eq!(pads.borrow().rumbles, vec![0]);
        assert_eq!(dev.id(), "gamepad-0");
        assert_eq!(dev.metadata().slot, Some(0));
    }
}
