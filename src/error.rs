//! Error taxonomy.
//!
//! Only configuration problems surface as errors: a control without an id or
//! position, a duplicate id, a virtual device without a renderer, bad numeric
//! settings, unreadable config files. Runtime absence (querying a
//! disconnected or unassigned player) yields neutral values instead, and a
//! vanished gamepad disconnects itself rather than failing.

use thiserror::Error;

/// Errors reported by padlink.
#[derive(Debug, Error)]
pub enum InputError {
    /// A control spec was registered without an `id`.
    #[error("control requires an id; ids must be unique")]
    MissingControlId,

    /// A control spec was registered without a `position`.
    #[error("control `{id}` requires a position with x/y coordinates")]
    MissingControlPosition { id: String },

    /// Another control with the same id already lives on the device.
    #[error("control with id `{id}` already exists")]
    DuplicateControl { id: String },

    /// A virtual device was built without a rendering backend.
    #[error("no renderer provided for on-screen device")]
    MissingRenderer,

    /// The renderer exposes no drawing surface to route pointers from.
    #[error("renderer exposes no surfaces")]
    NoSurfaces,

    /// A control names a surface the renderer does not know.
    #[error("control `{control}` is bound to unknown surface `{surface}`")]
    UnknownSurface { control: String, surface: String },

    /// Stick gate factor outside `[1.0, √2]`.
    #[error("gate factor {0} is outside [1.0, 1.414]")]
    InvalidGateFactor(f32),

    /// Negative or non-finite touch radius.
    #[error("thumb radius {0} must be a finite value >= 0")]
    InvalidThumbRadius(f32),

    /// Deadzone outside `[0.0, 1.0)`.
    #[error("deadzone {0} is outside [0.0, 1.0)")]
    InvalidDeadzone(f32),

    /// No device registered under this id.
    #[error("unknown device `{0}`")]
    UnknownDevice(String),

    /// A device with this id is already registered.
    #[error("device `{0}` is already registered")]
    DuplicateDevice(String),

    /// Semantically invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform backend failed to initialize.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, InputError>;

/// Validates a deadzone threshold.
pub(crate) fn check_deadzone(deadzone: f32) -> Result<f32> {
    if (0.0..1.0).contains(&deadzone) {
        Ok(deadzone)
    } else {
        Err(InputError::InvalidDeadzone(deadzone))
    }
}

/// Validates the finger radius added to control hit circles.
pub(crate) fn check_thumb_radius(radius: f32) -> Result<f32> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(radius)
    } else {
        Err(InputError::InvalidThumbRadius(radius))
    }
}
