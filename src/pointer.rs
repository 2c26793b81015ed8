//! Pointer (touch / mouse) input as delivered by the host platform.
//!
//! Coordinates are screen coordinates; virtual devices map them onto their
//! surfaces. A single event may carry several changed pointers, matching how
//! multi-touch platforms batch `changedTouches`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier of one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerId {
    Touch(u64),
    /// The (single) mouse cursor.
    Mouse,
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerId::Touch(id) => write!(f, "touch:{id}"),
            PointerId::Mouse => f.write_str("mouse"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One changed contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointer {
    pub id: PointerId,
    pub x: f32,
    pub y: f32,
}

impl Pointer {
    pub fn touch(id: u64, x: f32, y: f32) -> Self {
        Self {
            id: PointerId::Touch(id),
            x,
            y,
        }
    }
}

/// A batch of contacts that changed in the same phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub pointers: Vec<Pointer>,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, pointers: Vec<Pointer>) -> Self {
        Self { phase, pointers }
    }

    pub fn single(phase: PointerPhase, pointer: Pointer) -> Self {
        Self {
            phase,
            pointers: vec![pointer],
        }
    }
}
