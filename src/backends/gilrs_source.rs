//! [`RawGamepadSource`] backed by `gilrs`.
//!
//! gilrs reports stick Y up-positive; snapshots flip it back to the raw
//! down-positive convention so that [`PhysicalGamepadDevice`] applies the
//! same inversion to every source.
//!
//! [`PhysicalGamepadDevice`]: super::gamepad::PhysicalGamepadDevice

use std::collections::HashMap;

use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Replay, Ticks};
use gilrs::{Axis, Button, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, info, warn};

use super::gamepad::{GamepadConnection, GamepadInfo, GamepadSnapshot, RawButton, RawGamepadSource};
use crate::device::Rumble;
use crate::error::{InputError, Result};

/// Standard-mapping order.
const BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
    Button::Mode,
];

const AXES: [Axis; 4] = [Axis::LeftStickX, Axis::LeftStickY, Axis::RightStickX, Axis::RightStickY];

pub struct GilrsSource {
    gilrs: Gilrs,
    slots: HashMap<u32, GamepadId>,
    pending: Vec<GamepadConnection>,
    /// Playing effects; dropping an `Effect` stops it.
    effects: HashMap<u32, Effect>,
}

fn slot_of(id: GamepadId) -> u32 {
    usize::from(id) as u32
}

fn info_of(gamepad: &Gamepad<'_>) -> GamepadInfo {
    GamepadInfo {
        name: gamepad.name().to_string(),
        vendor_id: gamepad.vendor_id(),
        product_id: gamepad.product_id(),
        rumble: gamepad.is_ff_supported(),
    }
}

fn ff_error(e: gilrs::ff::Error) -> InputError {
    InputError::Backend(format!("force feedback: {e}"))
}

impl GilrsSource {
    pub fn new() -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| InputError::Backend(format!("gilrs init failed: {e}")))?;
        info!("gilrs initialized");

        let mut slots = HashMap::new();
        let mut pending = Vec::new();
        // Pads present at startup produce no Connected event.
        for (id, gamepad) in gilrs.gamepads() {
            let index = slot_of(id);
            info!(index, name = gamepad.name(), "gamepad present");
            slots.insert(index, id);
            pending.push(GamepadConnection::Connected {
                index,
                info: info_of(&gamepad),
            });
        }

        Ok(Self {
            gilrs,
            slots,
            pending,
            effects: HashMap::new(),
        })
    }

    fn play(&mut self, index: u32, rumble: &Rumble) -> Result<Effect> {
        let id = *self
            .slots
            .get(&index)
            .ok_or_else(|| InputError::Backend(format!("no gamepad in slot {index}")))?;
        let play_for = Ticks::from_ms(rumble.duration_ms.min(u32::MAX as u64) as u32);
        let magnitude = |m: f32| (m.clamp(0.0, 1.0) * u16::MAX as f32) as u16;
        let effect = EffectBuilder::new()
            .add_effect(BaseEffect {
                kind: BaseEffectType::Strong {
                    magnitude: magnitude(rumble.strong_magnitude),
                },
                scheduling: Replay {
                    play_for,
                    ..Default::default()
                },
                envelope: Default::default(),
            })
            .add_effect(BaseEffect {
                kind: BaseEffectType::Weak {
                    magnitude: magnitude(rumble.weak_magnitude),
                },
                scheduling: Replay {
                    play_for,
                    ..Default::default()
                },
                envelope: Default::default(),
            })
            .gamepads(&[id])
            .finish(&mut self.gilrs)
            .map_err(ff_error)?;
        effect.play().map_err(ff_error)?;
        Ok(effect)
    }
}

impl RawGamepadSource for GilrsSource {
    fn poll_connections(&mut self) -> Vec<GamepadConnection> {
        let mut out = std::mem::take(&mut self.pending);
        while let Some(event) = self.gilrs.next_event() {
            let index = slot_of(event.id);
            match event.event {
                EventType::Connected => {
                    let info = info_of(&self.gilrs.gamepad(event.id));
                    debug!(index, name = %info.name, "gilrs connected");
                    self.slots.insert(index, event.id);
                    out.push(GamepadConnection::Connected { index, info });
                }
                EventType::Disconnected => {
                    debug!(index, "gilrs disconnected");
                    self.slots.remove(&index);
                    self.effects.remove(&index);
                    out.push(GamepadConnection::Disconnected { index });
                }
                _ => {}
            }
        }
        out
    }

    fn snapshot(&mut self, index: u32) -> Option<GamepadSnapshot> {
        let id = *self.slots.get(&index)?;
        let gamepad = self.gilrs.connected_gamepad(id)?;

        let buttons = BUTTONS
            .iter()
            .map(|&b| {
                let pressed = gamepad.is_pressed(b);
                let value = gamepad
                    .button_data(b)
                    .map(|d| d.value())
                    .unwrap_or(if pressed { 1.0 } else { 0.0 });
                RawButton {
                    pressed,
                    touched: pressed,
                    value,
                }
            })
            .collect();

        let axes = AXES
            .iter()
            .map(|&a| {
                let v = gamepad.value(a);
                if matches!(a, Axis::LeftStickY | Axis::RightStickY) {
                    -v
                } else {
                    v
                }
            })
            .collect();

        Some(GamepadSnapshot { buttons, axes })
    }

    fn vibrate(&mut self, index: u32, rumble: &Rumble) -> bool {
        match self.play(index, rumble) {
            Ok(effect) => {
                self.effects.insert(index, effect);
                true
            }
            Err(e) => {
                warn!(index, error = %e, "rumble failed");
                false
            }
        }
    }
}
