//! Standard gamepad mapping.
//!
//! Symbolic names for the 17 standard buttons and 4 stick axes. Every query
//! API accepts either a symbol, its string name, or a raw index through the
//! [`ButtonKey`] and [`AxisKey`] traits.
//!
//! | Index | Button | | Index | Button |
//! |---|---|---|---|---|
//! | 0 | `A` | | 9 | `START` |
//! | 1 | `B` | | 10 | `LS` |
//! | 2 | `X` | | 11 | `RS` |
//! | 3 | `Y` | | 12 | `DPAD_UP` |
//! | 4 | `LB` | | 13 | `DPAD_DOWN` |
//! | 5 | `RB` | | 14 | `DPAD_LEFT` |
//! | 6 | `LT` | | 15 | `DPAD_RIGHT` |
//! | 7 | `RT` | | 16 | `HOME` |
//! | 8 | `SELECT` | | | |
//!
//! Axes: `0` left stick X, `1` left stick Y, `2` right stick X, `3` right stick Y.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of buttons in the standard layout.
pub const STANDARD_BUTTON_COUNT: usize = 17;
/// Number of axes in the standard layout.
pub const STANDARD_AXIS_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardButton {
    A,
    B,
    X,
    Y,
    Lb,
    Rb,
    Lt,
    Rt,
    Select,
    Start,
    Ls,
    Rs,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Home,
}

impl StandardButton {
    pub const ALL: [StandardButton; STANDARD_BUTTON_COUNT] = [
        StandardButton::A,
        StandardButton::B,
        StandardButton::X,
        StandardButton::Y,
        StandardButton::Lb,
        StandardButton::Rb,
        StandardButton::Lt,
        StandardButton::Rt,
        StandardButton::Select,
        StandardButton::Start,
        StandardButton::Ls,
        StandardButton::Rs,
        StandardButton::DpadUp,
        StandardButton::DpadDown,
        StandardButton::DpadLeft,
        StandardButton::DpadRight,
        StandardButton::Home,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            StandardButton::A => "A",
            StandardButton::B => "B",
            StandardButton::X => "X",
            StandardButton::Y => "Y",
            StandardButton::Lb => "LB",
            StandardButton::Rb => "RB",
            StandardButton::Lt => "LT",
            StandardButton::Rt => "RT",
            StandardButton::Select => "SELECT",
            StandardButton::Start => "START",
            StandardButton::Ls => "LS",
            StandardButton::Rs => "RS",
            StandardButton::DpadUp => "DPAD_UP",
            StandardButton::DpadDown => "DPAD_DOWN",
            StandardButton::DpadLeft => "DPAD_LEFT",
            StandardButton::DpadRight => "DPAD_RIGHT",
            StandardButton::Home => "HOME",
        }
    }
}

impl fmt::Display for StandardButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardButton {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StandardAxis {
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
}

impl StandardAxis {
    pub const ALL: [StandardAxis; STANDARD_AXIS_COUNT] = [
        StandardAxis::LeftStickX,
        StandardAxis::LeftStickY,
        StandardAxis::RightStickX,
        StandardAxis::RightStickY,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            StandardAxis::LeftStickX => "LEFT_STICK_X",
            StandardAxis::LeftStickY => "LEFT_STICK_Y",
            StandardAxis::RightStickX => "RIGHT_STICK_X",
            StandardAxis::RightStickY => "RIGHT_STICK_Y",
        }
    }

    /// Y axes are sign-inverted by physical gamepads to make "up" positive.
    pub fn is_vertical(self) -> bool {
        matches!(self, StandardAxis::LeftStickY | StandardAxis::RightStickY)
    }
}

impl fmt::Display for StandardAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardAxis {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A two-axis thumbstick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stick {
    #[default]
    Left,
    Right,
}

impl Stick {
    /// `(x, y)` axis indices.
    pub fn axes(self) -> (usize, usize) {
        match self {
            Stick::Left => (
                StandardAxis::LeftStickX.index(),
                StandardAxis::LeftStickY.index(),
            ),
            Stick::Right => (
                StandardAxis::RightStickX.index(),
                StandardAxis::RightStickY.index(),
            ),
        }
    }
}

/// Name lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown standard mapping name `{0}`")]
pub struct UnknownName(pub String);

/// Anything that identifies a button: a raw index, a symbol, or a name.
pub trait ButtonKey {
    /// `None` for names outside the standard mapping.
    fn button_index(&self) -> Option<usize>;
}

impl ButtonKey for usize {
    fn button_index(&self) -> Option<usize> {
        Some(*self)
    }
}

impl ButtonKey for StandardButton {
    fn button_index(&self) -> Option<usize> {
        Some(self.index())
    }
}

impl ButtonKey for &str {
    fn button_index(&self) -> Option<usize> {
        self.parse::<StandardButton>().ok().map(StandardButton::index)
    }
}

/// Anything that identifies an axis: a raw index, a symbol, or a name.
pub trait AxisKey {
    fn axis_index(&self) -> Option<usize>;
}

impl AxisKey for usize {
    fn axis_index(&self) -> Option<usize> {
        Some(*self)
    }
}

impl AxisKey for StandardAxis {
    fn axis_index(&self) -> Option<usize> {
        Some(self.index())
    }
}

impl AxisKey for &str {
    fn axis_index(&self) -> Option<usize> {
        self.parse::<StandardAxis>().ok().map(StandardAxis::index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_standard_layout() {
        assert_eq!(StandardButton::A.index(), 0);
        assert_eq!(StandardButton::Select.index(), 8);
        assert_eq!(StandardButton::Home.index(), 16);
        assert_eq!(StandardButton::from_index(12), Some(StandardButton::DpadUp));
        assert_eq!(StandardButton::from_index(17), None);
        assert_eq!(Stick::Right.axes(), (2, 3));
    }

    #[test]
    fn names_resolve_to_indices() {
        assert_eq!("A".button_index(), Some(0));
        assert_eq!("dpad_right".button_index(), Some(15));
        assert_eq!("TURBO".button_index(), None);
        assert_eq!("RIGHT_STICK_Y".axis_index(), Some(3));
        assert_eq!(5usize.button_index(), Some(5));
        assert!(StandardAxis::LeftStickY.is_vertical());
        assert!(!StandardAxis::RightStickX.is_vertical());
    }
}
