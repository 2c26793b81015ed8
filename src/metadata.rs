//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a device suitable
//! for UI display and logging. Backends populate what they know; unknown
//! fields remain `None`.
//!
//! # Conventions
//! - `name` should be a friendly, user-facing label when available.
//! - `mapping` is the button/axis layout tag; `"standard"` for every built-in device.
//! - `vendor_id`/`product_id` are filled by hardware backends that can read them.
//! - `surfaces` lists the rendering surfaces a virtual device routes pointers from.

use serde::{Deserialize, Serialize};

use crate::device::DeviceKind;

/// Snapshot of metadata describing a single device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Human-readable name from the driver or the host.
    pub name: Option<String>,

    /// Device family.
    pub kind: Option<DeviceKind>,

    /// Button/axis layout tag.
    pub mapping: Option<String>,

    /// USB Vendor ID (VID), if known.
    pub vendor_id: Option<u16>,

    /// USB Product ID (PID), if known.
    pub product_id: Option<u16>,

    /// Platform slot the hardware occupies (gamepads only).
    pub slot: Option<u32>,

    /// Whether the hardware accepts rumble requests.
    pub rumble: Option<bool>,

    /// Surface ids (virtual devices only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub surfaces: Vec<String>,
}
