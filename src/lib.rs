//! padlink: physical gamepads and on-screen touch controls behind one
//! per-frame button/axis model.
//!
//! - Every input source is a [`Device`] with standard-mapped [`Button`]s and
//!   axes, advanced once per frame by the host through
//!   [`InputManager::advance`].
//! - Devices report transitions (`ButtonDown`, `ButtonUp`, taps, long presses,
//!   axis changes) as [`InputEvent`]s; the manager re-emits them annotated with
//!   the player slot the device drives.
//! - [`VirtualSurfaceDevice`] turns multi-touch pointer input on host-rendered
//!   controls into the same model, so game code never distinguishes a thumb on
//!   glass from a thumb on a stick.
//!
//! Rendering and platform access stay outside: implement [`Renderer`] for
//! your drawing backend and [`RawGamepadSource`] for your gamepad API (or
//! enable the `gilrs` feature).

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod button;
pub mod config;
pub mod controls;
pub mod device;
pub mod error;
pub mod event;
pub mod eventsource;
pub mod filtered_listener;
pub mod logger;
pub mod manager;
pub mod mapping;
pub mod metadata;
pub mod pointer;
pub mod render;
pub mod snapshot;

pub use backends::{
    GamepadConnection, GamepadInfo, GamepadSnapshot, PhysicalGamepadDevice, RawButton, RawGamepadSource,
    SharedGamepadSource, VirtualSurfaceBuilder, VirtualSurfaceDevice,
};
#[cfg(feature = "gilrs")]
pub use backends::GilrsSource;
pub use button::{Button, ButtonTransition};
pub use config::{GamepadSettings, ManagerConfig};
pub use controls::{
    ButtonControl, ButtonSlot, ControlEvent, ControlKind, ControlLayout, ControlSpec, StickControl,
    VisualControl,
};
pub use device::{Device, DeviceCore, DeviceKind, Rumble};
pub use error::{InputError, Result};
pub use event::{ChannelDesc, ChannelKind, InputChannel, InputEvent, InputKind, LONG_PRESS_THRESHOLD};
pub use eventsource::{Event, EventSource, Listener, ListenerId, Subscription};
pub use filtered_listener::FilteredListener;
pub use logger::EventLogger;
pub use manager::{InputManager, PlayerInput};
pub use mapping::{AxisKey, ButtonKey, StandardAxis, StandardButton, Stick};
pub use metadata::DeviceMeta;
pub use pointer::{Pointer, PointerEvent, PointerId, PointerPhase};
pub use render::{
    Point, Rect, Renderer, RendererCapabilities, Surface, SurfaceId, VisualAttributes, VisualHandle,
    VisualKind, VisualPatch, WorldPoint,
};
pub use snapshot::{ButtonState, DeviceState, Snapshot};
