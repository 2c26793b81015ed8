//! Per-frame snapshot of device states.
//!
//! [`Snapshot`] is an **owned**, read-only view of all device states at a point
//! in time (typically "this frame"). It is produced by
//! [`InputManager::snapshot`](crate::manager::InputManager::snapshot) and is
//! cheap to clone for fan-out to multiple consumers.
//!
//! # Semantics
//! - Keys are device ids (same format as [`Device::id`](crate::device::Device::id)).
//! - A snapshot is **immutable**. To refresh, advance the manager and request a new one.
//! - Disconnected devices still appear, with `connected == false`.
//!
//! # Examples
//! ```
//! use padlink::Snapshot;
//!
//! fn print_sticks(snap: &Snapshot) {
//!     for (dev, state) in snap.iter() {
//!         println!("{dev}: LX={:.2} LY={:.2} A={}", state.axis(0), state.axis(1), state.pressed(0));
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Raw state of one button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ButtonState {
    pub pressed: bool,
    pub touched: bool,
    pub value: f32,
}

/// State of one device at the time the snapshot was taken.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub id: String,
    pub connected: bool,
    /// Device frame clock.
    pub timestamp: Duration,
    pub mapping: String,
    pub axes: Vec<f32>,
    pub buttons: Vec<ButtonState>,
}

impl DeviceState {
    /// Value of an axis (0.0 if missing).
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Pressed state of a button (false if missing).
    pub fn pressed(&self, index: usize) -> bool {
        self.buttons.get(index).map(|b| b.pressed).unwrap_or(false)
    }

    /// Serializes the state as JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Owned snapshot of current device states (`device_id → DeviceState`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot(pub HashMap<String, DeviceState>);

impl Snapshot {
    /// Get the state for a specific device.
    #[inline]
    pub fn get(&self, device_id: &str) -> Option<&DeviceState> {
        self.0.get(device_id)
    }

    /// Iterate `(device_id, state)` pairs.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeviceState)> {
        self.0.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the snapshot and return the inner map.
    #[inline]
    pub fn into_inner(self) -> HashMap<String, DeviceState> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_channels_read_as_neutral() {
        let state = DeviceState {
            id: "pad".into(),
            connected: true,
            axes: vec![0.25],
            buttons: vec![ButtonState {
                pressed: true,
                touched: true,
                value: 1.0,
            }],
            ..DeviceState::default()
        };
        assert_eq!(state.axis(0), 0.25);
        assert_eq!(state.axis(9), 0.0);
        assert!(state.pressed(0));
        assert!(!state.pressed(4));
    }

    #[test]
    fn json_carries_buttons_and_axes() {
        let state = DeviceState {
            id: "pad".into(),
            mapping: "standard".into(),
            axes: vec![0.5, -0.5],
            buttons: vec![ButtonState::default()],
            ..DeviceState::default()
        };
        let json = state.to_json().unwrap();
        let back: DeviceState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
