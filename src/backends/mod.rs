//! Device backends.
//!
//! Implementations of [`Device`](crate::device::Device) for the two input
//! families padlink unifies:
//! - [`gamepad`]: physical pads read through a host [`RawGamepadSource`].
//! - [`virtual_surface`]: on-screen controls driven by pointer input.
//!
//! # Feature flags
//! - **`gilrs`**: enables [`GilrsSource`], a ready-made gamepad source.

pub mod gamepad;
pub mod virtual_surface;

#[cfg(feature = "gilrs")]
#[cfg_attr(docsrs, doc(cfg(feature = "gilrs")))]
pub mod gilrs_source;

pub use gamepad::{
    gamepad_id, GamepadConnection, GamepadInfo, GamepadSnapshot, PhysicalGamepadDevice, RawButton,
    RawGamepadSource, SharedGamepadSource,
};
pub use virtual_surface::{VirtualSurfaceBuilder, VirtualSurfaceDevice};

#[cfg(feature = "gilrs")]
pub use gilrs_source::GilrsSource;
