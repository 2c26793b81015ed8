//! On-screen controls.
//!
//! A [`VisualControl`] is a renderer-backed widget that a virtual device hit
//! tests pointers against. Controls never touch device state directly: they
//! emit [`ControlEvent`]s, which the owning device queues and applies during
//! its own refresh step.
//!
//! Two kinds exist:
//! - [`ButtonControl`]: binary press/release, hover-sensitive (a finger
//!   sliding off releases it, sliding on presses it).
//! - [`StickControl`]: analog two-axis stick, sticky (once engaged it follows
//!   the finger anywhere until the touch ends).
//!
//! Controls are described by serializable [`ControlSpec`]s, usually loaded
//! as a [`ControlLayout`] from TOML or JSON.

pub mod button;
pub mod stick;

pub use button::ButtonControl;
pub use stick::{gate_offset, start_offset, StickControl, DEFAULT_GATE_FACTOR};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::device::DeviceCore;
use crate::error::{InputError, Result};
use crate::eventsource::{Event, EventSource};
use crate::mapping::{StandardButton, Stick};
use crate::pointer::PointerId;
use crate::render::{Point, Renderer, SurfaceId};

/// Default touch radius added to every control's hit circle.
pub const DEFAULT_THUMB_RADIUS: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Button,
    Stick,
}

/// Output of a control, consumed by the owning device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Press { button: usize, pointer: PointerId },
    Release { button: usize, pointer: PointerId },
    /// New stick position, already gated, deadzoned and oriented up-positive.
    Change {
        axis_x: usize,
        axis_y: usize,
        x: f32,
        y: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChannel {
    Press,
    Release,
    Change,
}

impl Event for ControlEvent {
    type Channel = ControlChannel;

    fn channel(&self) -> ControlChannel {
        match self {
            ControlEvent::Press { .. } => ControlChannel::Press,
            ControlEvent::Release { .. } => ControlChannel::Release,
            ControlEvent::Change { .. } => ControlChannel::Change,
        }
    }
}

/// A pointer as seen by one control.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub pointer: PointerId,
    /// Pointer position in the control's world space.
    pub world: Point,
    /// Surface the position was resolved against.
    pub surface: Option<SurfaceId>,
}

/// Polymorphic on-screen widget.
pub trait VisualControl {
    fn id(&self) -> &str;
    fn kind(&self) -> ControlKind;
    fn position(&self) -> Point;
    /// Hit radius in world units.
    fn size(&self) -> f32;

    /// Surface this control is drawn on (multi-surface renderers).
    fn surface(&self) -> Option<&SurfaceId>;
    fn bind_surface(&mut self, surface: SurfaceId);

    /// Surface an in-progress gesture is tracked on, if it differs from
    /// [`surface`](Self::surface).
    fn gesture_surface(&self) -> Option<&SurfaceId> {
        None
    }

    /// Button index driven by this control.
    fn button_index(&self) -> Option<usize> {
        None
    }

    /// `(x, y)` axis indices driven by this control.
    fn axis_indices(&self) -> Option<(usize, usize)> {
        None
    }

    /// Pointer currently driving the control.
    fn active_pointer(&self) -> Option<PointerId>;

    fn events(&mut self) -> &mut EventSource<ControlEvent>;

    /// Circular hit test, enlarged by the finger radius.
    fn contains(&self, world: Point, touch_radius: f32) -> bool {
        world.distance(self.position()) <= self.size() + touch_radius
    }

    fn create_visual(&mut self, renderer: &mut dyn Renderer);

    fn set_position(&mut self, position: Point, renderer: &mut dyn Renderer);

    fn set_size(&mut self, size: f32, renderer: &mut dyn Renderer);

    fn touch_start(&mut self, contact: &Contact, renderer: &mut dyn Renderer);

    fn touch_move(&mut self, contact: &Contact, renderer: &mut dyn Renderer);

    fn touch_end(&mut self, pointer: PointerId, renderer: &mut dyn Renderer);

    /// Mirrors the owning device's state into the visual.
    fn sync_visual(&mut self, device: &DeviceCore, renderer: &mut dyn Renderer);

    fn dispose(&mut self, renderer: &mut dyn Renderer);
}

/// Button slot given either as an index or a standard name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ButtonSlot {
    Index(usize),
    Named(StandardButton),
}

impl ButtonSlot {
    pub fn index(self) -> usize {
        match self {
            ButtonSlot::Index(i) => i,
            ButtonSlot::Named(b) => b.index(),
        }
    }
}

impl From<usize> for ButtonSlot {
    fn from(i: usize) -> Self {
        ButtonSlot::Index(i)
    }
}

impl From<StandardButton> for ButtonSlot {
    fn from(b: StandardButton) -> Self {
        ButtonSlot::Named(b)
    }
}

/// Declarative description of a control.
///
/// `id` and `position` are optional so that a layout missing them fails with
/// a precise error at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSpec {
    pub id: Option<String>,
    pub kind: ControlKind,
    pub position: Option<Point>,
    pub size: Option<f32>,
    pub surface: Option<SurfaceId>,

    // Buttons
    pub button: Option<ButtonSlot>,
    pub label: Option<String>,
    pub color: Option<u32>,
    pub active_color: Option<u32>,
    pub label_color: Option<String>,

    // Sticks
    pub stick: Option<Stick>,
    pub axis_x: Option<usize>,
    pub axis_y: Option<usize>,
    pub deadzone: Option<f32>,
    pub gate_factor: Option<f32>,
    /// World y grows downward (screen-like surfaces); the stick then flips
    /// y so that up is positive. Defaults to `true`.
    pub y_down: Option<bool>,
}

impl ControlSpec {
    pub fn button(id: impl Into<String>, position: Point, button: impl Into<ButtonSlot>) -> Self {
        Self {
            id: Some(id.into()),
            kind: ControlKind::Button,
            position: Some(position),
            button: Some(button.into()),
            ..Self::default()
        }
    }

    pub fn stick(id: impl Into<String>, position: Point, stick: Stick) -> Self {
        Self {
            id: Some(id.into()),
            kind: ControlKind::Stick,
            position: Some(position),
            stick: Some(stick),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn on_surface(mut self, surface: impl Into<SurfaceId>) -> Self {
        self.surface = Some(surface.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_gate_factor(mut self, gate_factor: f32) -> Self {
        self.gate_factor = Some(gate_factor);
        self
    }

    pub fn with_deadzone(mut self, deadzone: f32) -> Self {
        self.deadzone = Some(deadzone);
        self
    }

    /// Checks the required attributes, returning `(id, position)`.
    pub fn required(&self) -> Result<(String, Point)> {
        let id = match self.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => return Err(InputError::MissingControlId),
        };
        let position = self
            .position
            .ok_or_else(|| InputError::MissingControlPosition { id: id.clone() })?;
        Ok((id, position))
    }

    /// Builds the control this spec describes.
    ///
    /// `default_gate_factor` applies to sticks that do not set their own.
    pub fn build(&self, default_gate_factor: f32) -> Result<Box<dyn VisualControl>> {
        let control: Box<dyn VisualControl> = match self.kind {
            ControlKind::Button => Box::new(ButtonControl::from_spec(self)?),
            ControlKind::Stick => Box::new(StickControl::from_spec(self, default_gate_factor)?),
        };
        Ok(control)
    }
}

/// A set of controls plus device-wide touch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLayout {
    /// Finger radius added to every hit test.
    pub thumb_radius: f32,
    /// Default stick gate factor: `1.0` circle, `~1.1` rounded square, `1.414` square.
    pub gate_factor: f32,
    pub controls: Vec<ControlSpec>,
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self {
            thumb_radius: DEFAULT_THUMB_RADIUS,
            gate_factor: DEFAULT_GATE_FACTOR,
            controls: Vec::new(),
        }
    }
}

impl ControlLayout {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Loads a layout file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_requires_id_and_position() {
        let mut spec = ControlSpec {
            position: Some(Point::new(1.0, 2.0)),
            ..ControlSpec::default()
        };
        assert!(matches!(spec.required(), Err(InputError::MissingControlId)));

        spec.id = Some("jump".into());
        spec.position = None;
        assert!(matches!(
            spec.required(),
            Err(InputError::MissingControlPosition { id }) if id == "jump"
        ));
    }

    #[test]
    fn layout_from_toml() {
        let layout = ControlLayout::from_toml_str(
            r#"
            thumb_radius = 12.0

            [[controls]]
            id = "a"
            kind = "button"
            position = { x = 300.0, y = 200.0 }
            size = 30.0
            button = "A"
            label = "A"

            [[controls]]
            id = "move"
            kind = "stick"
            position = { x = 80.0, y = 200.0 }
            size = 60.0
            stick = "LEFT"
            gate_factor = 1.0
            surface = "hud"
            "#,
        )
        .unwrap();

        assert_eq!(layout.thumb_radius, 12.0);
        assert_eq!(layout.gate_factor, DEFAULT_GATE_FACTOR);
        assert_eq!(layout.controls.len(), 2);
        assert_eq!(layout.controls[0].button.map(ButtonSlot::index), Some(0));
        assert_eq!(layout.controls[1].kind, ControlKind::Stick);
        assert_eq!(layout.controls[1].surface, Some(SurfaceId::new("hud")));
    }

    #[test]
    fn layout_from_json_with_raw_index() {
        let layout = ControlLayout::from_json_str(
            r#"{ "controls": [ { "id": "start", "position": { "x": 1.0, "y": 1.0 }, "button": 9 } ] }"#,
        )
        .unwrap();
        assert_eq!(layout.thumb_radius, DEFAULT_THUMB_RADIUS);
        assert_eq!(layout.controls[0].button, Some(ButtonSlot::Index(9)));
    }
}
