//! Analog stick control and its gating math.
//!
//! A touch offset from the stick center is turned into axis values in four
//! steps (see [`gate_offset`]):
//!
//! 1. Normalize against the travel radius `size * 0.7`, capped at 1.
//! 2. Project onto the unit circle using the offset's angle.
//! 3. Scale by the gate factor and clamp each axis to `[-1, 1]`. A factor of
//!    `1.0` keeps the reachable region circular; `1.414` makes it square.
//! 4. Snap components below the deadzone to zero.
//!
//! The first contact of a gesture that lands near the center uses the raw
//! normalized offset instead ([`start_offset`]), so a thumb resting on the
//! knob does not jump.

use std::f32::consts::SQRT_2;

use tracing::trace;

use super::{Contact, ControlEvent, ControlKind, ControlSpec, VisualControl};
use crate::device::DeviceCore;
use crate::error::{check_deadzone, InputError, Result};
use crate::eventsource::EventSource;
use crate::mapping::Stick;
use crate::pointer::PointerId;
use crate::render::{Point, Renderer, SurfaceId, VisualAttributes, VisualHandle, VisualKind, VisualPatch};

pub const DEFAULT_GATE_FACTOR: f32 = 1.1;
pub const DEFAULT_STICK_DEADZONE: f32 = 0.1;
pub const DEFAULT_STICK_SIZE: f32 = 60.0;

/// Knob travel radius relative to the stick size.
const TRAVEL_RATIO: f32 = 0.7;
/// Normalized offsets within this box on first contact skip gating.
const CENTER_THRESHOLD: f32 = 0.45;
const KNOB_RATIO: f32 = 0.3;
const RING_INNER_RATIO: f32 = 0.8;

/// Accepts gate factors in `[1.0, √2]`.
pub fn check_gate_factor(gate_factor: f32) -> Result<f32> {
    if (1.0..=SQRT_2).contains(&gate_factor) {
        Ok(gate_factor)
    } else {
        Err(InputError::InvalidGateFactor(gate_factor))
    }
}

fn deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

/// Full gating pipeline for an offset `(dx, dy)` from the stick center.
pub fn gate_offset(dx: f32, dy: f32, max_dist: f32, gate_factor: f32, dead: f32) -> (f32, f32) {
    if !(max_dist > 0.0) || !dx.is_finite() || !dy.is_finite() {
        return (0.0, 0.0);
    }
    let normalized = (dx.hypot(dy) / max_dist).min(1.0);
    let angle = dy.atan2(dx);
    let x = (angle.cos() * normalized * gate_factor).clamp(-1.0, 1.0);
    let y = (angle.sin() * normalized * gate_factor).clamp(-1.0, 1.0);
    (deadzone(x, dead), deadzone(y, dead))
}

/// Value for the first contact of a gesture.
pub fn start_offset(dx: f32, dy: f32, max_dist: f32, gate_factor: f32, dead: f32) -> (f32, f32) {
    if !(max_dist > 0.0) {
        return (0.0, 0.0);
    }
    let (nx, ny) = (dx / max_dist, dy / max_dist);
    if nx.abs() <= CENTER_THRESHOLD && ny.abs() <= CENTER_THRESHOLD {
        (nx, ny)
    } else {
        gate_offset(dx, dy, max_dist, gate_factor, dead)
    }
}

/// Two-axis on-screen stick.
#[derive(Debug)]
pub struct StickControl {
    id: String,
    position: Point,
    size: f32,
    surface: Option<SurfaceId>,
    axis_x: usize,
    axis_y: usize,
    deadzone: f32,
    gate_factor: f32,
    y_down: bool,
    /// Knob offset in world orientation, each axis in `[-1, 1]`.
    value: (f32, f32),
    base: Option<VisualHandle>,
    knob: Option<VisualHandle>,
    touch: Option<PointerId>,
    /// Surface the current gesture started on.
    active_surface: Option<SurfaceId>,
    events: EventSource<ControlEvent>,
}

impl StickControl {
    pub fn new(id: impl Into<String>, position: Point, stick: Stick) -> Self {
        let (axis_x, axis_y) = stick.axes();
        Self {
            id: id.into(),
            position,
            size: DEFAULT_STICK_SIZE,
            surface: None,
            axis_x,
            axis_y,
            deadzone: DEFAULT_STICK_DEADZONE,
            gate_factor: DEFAULT_GATE_FACTOR,
            y_down: true,
            value: (0.0, 0.0),
            base: None,
            knob: None,
            touch: None,
            active_surface: None,
            events: EventSource::new(),
        }
    }

    pub fn from_spec(spec: &ControlSpec, default_gate_factor: f32) -> Result<Self> {
        let (id, position) = spec.required()?;
        let mut control = Self::new(id, position, spec.stick.unwrap_or_default());
        if let Some(x) = spec.axis_x {
            control.axis_x = x;
        }
        if let Some(y) = spec.axis_y {
            control.axis_y = y;
        }
        if let Some(size) = spec.size {
            control.size = size;
        }
        control.surface = spec.surface.clone();
        control.gate_factor = check_gate_factor(spec.gate_factor.unwrap_or(default_gate_factor))?;
        if let Some(dz) = spec.deadzone {
            control.deadzone = check_deadzone(dz)?;
        }
        control.y_down = spec.y_down.unwrap_or(true);
        Ok(control)
    }

    pub fn gate_factor(&self) -> f32 {
        self.gate_factor
    }

    pub fn set_gate_factor(&mut self, gate_factor: f32) -> Result<()> {
        self.gate_factor = check_gate_factor(gate_factor)?;
        Ok(())
    }

    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    /// Current output, oriented like a physical pad (up positive).
    pub fn value(&self) -> (f32, f32) {
        (self.value.0, self.orient(self.value.1))
    }

    fn max_dist(&self) -> f32 {
        self.size * TRAVEL_RATIO
    }

    fn orient(&self, y: f32) -> f32 {
        if self.y_down {
            -y
        } else {
            y
        }
    }

    fn knob_position(&self) -> Point {
        let max = self.max_dist();
        Point::new(
            self.position.x + self.value.0 * max,
            self.position.y + self.value.1 * max,
        )
    }

    fn update_knob(&self, renderer: &mut dyn Renderer) {
        if let Some(handle) = self.knob {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    position: Some(self.knob_position()),
                    ..VisualPatch::default()
                },
            );
        }
    }

    fn set_value(&mut self, value: (f32, f32), renderer: &mut dyn Renderer) {
        self.value = value;
        self.update_knob(renderer);
        let (x, y) = self.value();
        self.events.emit(&ControlEvent::Change {
            axis_x: self.axis_x,
            axis_y: self.axis_y,
            x,
            y,
        });
    }
}

impl VisualControl for StickControl {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ControlKind {
        ControlKind::Stick
    }

    fn position(&self) -> Point {
        self.position
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn surface(&self) -> Option<&SurfaceId> {
        self.surface.as_ref()
    }

    fn bind_surface(&mut self, surface: SurfaceId) {
        self.surface = Some(surface);
    }

    fn gesture_surface(&self) -> Option<&SurfaceId> {
        self.active_surface.as_ref().or(self.surface.as_ref())
    }

    fn axis_indices(&self) -> Option<(usize, usize)> {
        Some((self.axis_x, self.axis_y))
    }

    fn active_pointer(&self) -> Option<PointerId> {
        self.touch
    }

    fn events(&mut self) -> &mut EventSource<ControlEvent> {
        &mut self.events
    }

    fn create_visual(&mut self, renderer: &mut dyn Renderer) {
        if self.base.is_some() {
            return;
        }
        let base = VisualAttributes {
            position: self.position,
            radius: self.size,
            inner_radius: Some(self.size * RING_INNER_RATIO),
            color: 0x333333,
            opacity: 0.5,
            label: None,
            label_color: None,
            surface: self.surface.clone(),
        };
        let knob = VisualAttributes {
            position: self.knob_position(),
            radius: self.size * KNOB_RATIO,
            inner_radius: None,
            color: 0x666666,
            opacity: 0.7,
            label: None,
            label_color: None,
            surface: self.surface.clone(),
        };
        self.base = Some(renderer.create_visual(VisualKind::StickBase, &base));
        self.knob = Some(renderer.create_visual(VisualKind::StickKnob, &knob));
    }

    fn set_position(&mut self, position: Point, renderer: &mut dyn Renderer) {
        self.position = position;
        if let Some(handle) = self.base {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    position: Some(position),
                    ..VisualPatch::default()
                },
            );
        }
        self.update_knob(renderer);
    }

    fn set_size(&mut self, size: f32, renderer: &mut dyn Renderer) {
        self.size = size;
        if let Some(handle) = self.base {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    radius: Some(size),
                    inner_radius: Some(size * RING_INNER_RATIO),
                    ..VisualPatch::default()
                },
            );
        }
        if let Some(handle) = self.knob {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    radius: Some(size * KNOB_RATIO),
                    position: Some(self.knob_position()),
                    ..VisualPatch::default()
                },
            );
        }
    }

    fn touch_start(&mut self, contact: &Contact, renderer: &mut dyn Renderer) {
        trace!(control = %self.id, pointer = %contact.pointer, "stick engaged");
        self.touch = Some(contact.pointer);
        self.active_surface = contact.surface.clone().or_else(|| self.surface.clone());
        let (dx, dy) = contact.world.offset_from(self.position);
        let value = start_offset(dx, dy, self.max_dist(), self.gate_factor, self.deadzone);
        self.set_value(value, renderer);
    }

    fn touch_move(&mut self, contact: &Contact, renderer: &mut dyn Renderer) {
        if self.touch != Some(contact.pointer) {
            return;
        }
        let (dx, dy) = contact.world.offset_from(self.position);
        let value = gate_offset(dx, dy, self.max_dist(), self.gate_factor, self.deadzone);
        self.set_value(value, renderer);
    }

    fn touch_end(&mut self, pointer: PointerId, renderer: &mut dyn Renderer) {
        if self.touch != Some(pointer) {
            return;
        }
        trace!(control = %self.id, %pointer, "stick released");
        self.touch = None;
        self.active_surface = None;
        self.set_value((0.0, 0.0), renderer);
    }

    fn sync_visual(&mut self, device: &DeviceCore, renderer: &mut dyn Renderer) {
        if self.touch.is_some() {
            return;
        }
        let x = device.axis(self.axis_x);
        let y = self.orient(device.axis(self.axis_y));
        if (x, y) != self.value {
            self.value = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
            self.update_knob(renderer);
        }
    }

    fn dispose(&mut self, renderer: &mut dyn Renderer) {
        for handle in [self.knob.take(), self.base.take()].into_iter().flatten() {
            renderer.remove_visual(handle);
        }
        self.events.clear(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MAX: f32 = 42.0; // size 60

    #[test]
    fn circular_gate_caps_diagonal_at_unit_length() {
        let (x, y) = gate_offset(100.0, 100.0, MAX, 1.0, 0.1);
        assert!((x.hypot(y) - 1.0).abs() < 1e-5);
        assert!((x - y).abs() < 1e-6);
    }

    #[test]
    fn square_gate_reaches_corners() {
        let (x, y) = gate_offset(100.0, 100.0, MAX, SQRT_2, 0.1);
        assert!(x > 0.999 && y > 0.999);
    }

    #[test]
    fn cardinal_offsets_clamp_to_one() {
        assert_eq!(gate_offset(500.0, 0.0, MAX, 1.1, 0.1), (1.0, 0.0));
        assert_eq!(gate_offset(0.0, -500.0, MAX, 1.1, 0.1).1, -1.0);
    }

    #[test]
    fn small_components_fall_in_deadzone() {
        // Nearly horizontal push: y component is tiny.
        let (x, y) = gate_offset(40.0, 2.0, MAX, 1.1, 0.1);
        assert!(x > 0.9);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn near_center_start_uses_raw_offset() {
        let (x, y) = start_offset(4.2, -8.4, MAX, 1.1, 0.1);
        assert!((x - 0.1).abs() < 1e-6);
        assert!((y + 0.2).abs() < 1e-6);
        // Far start goes through the gate.
        assert_eq!(start_offset(100.0, 0.0, MAX, 1.1, 0.1), (1.0, 0.0));
    }

    #[test]
    fn gate_factor_bounds() {
        assert!(check_gate_factor(1.0).is_ok());
        assert!(check_gate_factor(1.414).is_ok());
        assert!(matches!(check_gate_factor(0.9), Err(InputError::InvalidGateFactor(_))));
        assert!(check_gate_factor(1.5).is_err());
    }

    #[test]
    fn degenerate_size_yields_center() {
        assert_eq!(gate_offset(10.0, 10.0, 0.0, 1.1, 0.1), (0.0, 0.0));
        assert_eq!(start_offset(10.0, 10.0, 0.0, 1.1, 0.1), (0.0, 0.0));
    }

    proptest! {
        #[test]
        fn output_is_bounded(
            dx in -1.0e4f32..1.0e4,
            dy in -1.0e4f32..1.0e4,
            g in 1.0f32..=SQRT_2,
            dz in 0.0f32..0.5,
        ) {
            let (x, y) = gate_offset(dx, dy, MAX, g, dz);
            prop_assert!(x.abs() <= 1.0 && y.abs() <= 1.0);
            let (x, y) = start_offset(dx, dy, MAX, g, dz);
            prop_assert!(x.abs() <= 1.0 && y.abs() <= 1.0);
        }

        #[test]
        fn circular_gate_output_stays_in_unit_disc(
            dx in -1.0e3f32..1.0e3,
            dy in -1.0e3f32..1.0e3,
        ) {
            let (x, y) = gate_offset(dx, dy, MAX, 1.0, 0.0);
            prop_assert!(x.hypot(y) <= 1.0 + 1e-5);
        }
    }
}
