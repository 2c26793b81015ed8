//! Manager and gamepad configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! max_players = 2
//! auto_assign_gamepads = true
//!
//! [assign_rumble]
//! duration_ms = 200
//! weak_magnitude = 0.5
//! strong_magnitude = 1.0
//!
//! [gamepad]
//! deadzone = 0.15
//! invert_y = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::device::Rumble;
use crate::error::{check_deadzone, InputError, Result};

pub const DEFAULT_MAX_PLAYERS: usize = 4;
pub const DEFAULT_GAMEPAD_DEADZONE: f32 = 0.10;

/// Per-gamepad axis processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSettings {
    /// Axis magnitudes below this read as exactly 0.
    pub deadzone: f32,
    /// Flip vertical axes (1 and 3) so that up is positive.
    pub invert_y: bool,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_GAMEPAD_DEADZONE,
            invert_y: true,
        }
    }
}

impl GamepadSettings {
    pub fn validate(&self) -> Result<()> {
        check_deadzone(self.deadzone)?;
        Ok(())
    }
}

/// [`InputManager`](crate::manager::InputManager) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Player slots considered when auto-assigning hot-plugged gamepads.
    pub max_players: usize,
    /// Give a newly connected gamepad the first free player slot.
    pub auto_assign_gamepads: bool,
    /// Rumble played on a gamepad when it is auto-assigned. `None` disables it.
    pub assign_rumble: Option<Rumble>,
    pub gamepad: GamepadSettings,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            auto_assign_gamepads: true,
            assign_rumble: Some(Rumble::default()),
            gamepad: GamepadSettings::default(),
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_players == 0 {
            return Err(InputError::Config("max_players must be at least 1".into()));
        }
        self.gamepad.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ManagerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.gamepad.deadzone, 0.10);
        assert!(config.gamepad.invert_y);
    }

    #[test]
    fn partial_document() {
        let config = ManagerConfig::from_toml_str(
            r#"
            max_players = 2
            [gamepad]
            invert_y = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_players, 2);
        assert!(!config.gamepad.invert_y);
        assert_eq!(config.gamepad.deadzone, DEFAULT_GAMEPAD_DEADZONE);
        assert_eq!(config.assign_rumble, Some(Rumble::default()));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ManagerConfig::from_toml_str("max_players = 0"),
            Err(InputError::Config(_))
        ));
        assert!(matches!(
            ManagerConfig::from_toml_str("[gamepad]\ndeadzone = 1.5"),
            Err(InputError::InvalidDeadzone(_))
        ));
        assert!(matches!(
            ManagerConfig::from_toml_str("max_players = \"four\""),
            Err(InputError::Toml(_))
        ));
    }
}
