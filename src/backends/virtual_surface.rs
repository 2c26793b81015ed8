//! On-screen virtual gamepad.
//!
//! A [`VirtualSurfaceDevice`] owns a set of [`VisualControl`]s drawn through a
//! host [`Renderer`] and routes multi-touch pointer input to them. Controls
//! report presses, releases and stick moves as [`ControlEvent`]s; the device
//! queues those and applies them during its own refresh, so button and axis
//! events still come out of the regular frame protocol.
//!
//! # Routing
//! Each pointer gets a touch session listing the controls it engages.
//! - **Start:** every control whose hit circle (`size + thumb_radius`)
//!   contains the pointer is engaged. A button already held by another
//!   pointer is skipped; a stick is taken over by the newest pointer.
//! - **Move:** buttons are re-hit-tested, so sliding onto a button presses it
//!   and sliding off releases it. Sticks stay engaged wherever the pointer goes.
//! - **End / Cancel:** every engaged control is released and the session is dropped.
//!
//! With a multi-surface renderer, pointers only reach controls on the surface
//! under them, and a stick keeps resolving against the surface its gesture
//! started on.
//!
//! # Frame semantics
//! At most one press or release edge per button is applied per frame. A tap
//! that starts and ends between two frames is therefore still observed as a
//! `ButtonDown` frame followed by a `ButtonUp` frame.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, trace};

use crate::controls::stick::check_gate_factor;
use crate::controls::{
    Contact, ControlEvent, ControlKind, ControlLayout, ControlSpec, VisualControl,
};
use crate::device::{Device, DeviceCore, DeviceKind};
use crate::error::{check_thumb_radius, InputError, Result};
use crate::eventsource::Subscription;
use crate::mapping::{STANDARD_AXIS_COUNT, STANDARD_BUTTON_COUNT};
use crate::metadata::DeviceMeta;
use crate::pointer::{Pointer, PointerEvent, PointerId, PointerPhase};
use crate::render::{Point, Renderer, RendererCapabilities, Surface, SurfaceId};

static NEXT_TOUCH_DEVICE: AtomicU64 = AtomicU64::new(0);

/// Pointers currently down and the controls each one engages.
#[derive(Debug, Clone)]
struct TouchSession {
    controls: Vec<String>,
    last: (f32, f32),
    radius: f32,
}

/// Builder for [`VirtualSurfaceDevice`].
#[derive(Default)]
pub struct VirtualSurfaceBuilder {
    id: Option<String>,
    name: Option<String>,
    renderer: Option<Box<dyn Renderer>>,
    layout: Option<ControlLayout>,
    thumb_radius: Option<f32>,
    gate_factor: Option<f32>,
}

impl VirtualSurfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn boxed_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Controls created at build time. The layout's touch settings apply
    /// unless overridden by [`thumb_radius`](Self::thumb_radius) or
    /// [`gate_factor`](Self::gate_factor).
    pub fn layout(mut self, layout: ControlLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn thumb_radius(mut self, radius: f32) -> Self {
        self.thumb_radius = Some(radius);
        self
    }

    pub fn gate_factor(mut self, gate_factor: f32) -> Self {
        self.gate_factor = Some(gate_factor);
        self
    }

    pub fn build(self) -> Result<VirtualSurfaceDevice> {
        let renderer = self.renderer.ok_or(InputError::MissingRenderer)?;
        let layout = self.layout.unwrap_or_default();

        let caps = renderer.capabilities();
        let surfaces = renderer.surfaces();
        let default_surface = match surfaces.first() {
            Some(s) => s.id.clone(),
            None => return Err(InputError::NoSurfaces),
        };

        let id = self.id.unwrap_or_else(|| {
            format!("touch-{}", NEXT_TOUCH_DEVICE.fetch_add(1, Ordering::Relaxed))
        });
        let name = self.name.unwrap_or_else(|| "On-Screen Controls".to_string());

        let mut device = VirtualSurfaceDevice {
            core: DeviceCore::new(id, name, STANDARD_BUTTON_COUNT, STANDARD_AXIS_COUNT),
            renderer,
            caps,
            default_surface,
            thumb_radius: check_thumb_radius(self.thumb_radius.unwrap_or(layout.thumb_radius))?,
            gate_factor: check_gate_factor(self.gate_factor.unwrap_or(layout.gate_factor))?,
            controls: Vec::new(),
            subscriptions: HashMap::new(),
            sessions: HashMap::new(),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            pending: vec![VecDeque::new(); STANDARD_BUTTON_COUNT],
            pointer_active: false,
        };
        for spec in &layout.controls {
            device.create_control(spec)?;
        }
        info!(
            device = %device.core.id(),
            controls = device.controls.len(),
            surfaces = surfaces.len(),
            multi_surface = caps.multi_surface,
            "virtual surface ready"
        );
        Ok(device)
    }
}

/// Touch-driven device with standard button/axis layout.
pub struct VirtualSurfaceDevice {
    core: DeviceCore,
    renderer: Box<dyn Renderer>,
    caps: RendererCapabilities,
    default_surface: SurfaceId,
    thumb_radius: f32,
    gate_factor: f32,
    controls: Vec<Box<dyn VisualControl>>,
    subscriptions: HashMap<String, Subscription>,
    sessions: HashMap<PointerId, TouchSession>,
    /// Control output not yet applied to device state.
    inbox: Rc<RefCell<VecDeque<ControlEvent>>>,
    /// Per-button press/release edges waiting for a frame.
    pending: Vec<VecDeque<bool>>,
    /// Last value passed to `Renderer::set_pointer_active`.
    pointer_active: bool,
}

impl VirtualSurfaceDevice {
    pub fn builder() -> VirtualSurfaceBuilder {
        VirtualSurfaceBuilder::new()
    }

    pub fn renderer(&self) -> &dyn Renderer {
        &*self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        &mut *self.renderer
    }

    pub fn thumb_radius(&self) -> f32 {
        self.thumb_radius
    }

    pub fn set_thumb_radius(&mut self, radius: f32) {
        self.thumb_radius = radius.max(0.0);
    }

    pub fn gate_factor(&self) -> f32 {
        self.gate_factor
    }

    /// Default gate factor for sticks created from now on.
    pub fn set_gate_factor(&mut self, gate_factor: f32) -> Result<()> {
        self.gate_factor = check_gate_factor(gate_factor)?;
        Ok(())
    }

    pub fn controls(&self) -> impl Iterator<Item = &dyn VisualControl> {
        self.controls.iter().map(|c| c.as_ref())
    }

    pub fn control(&self, id: &str) -> Option<&dyn VisualControl> {
        self.controls.iter().find(|c| c.id() == id).map(|c| c.as_ref())
    }

    /// Number of pointers currently down on this device.
    pub fn active_touches(&self) -> usize {
        self.sessions.len()
    }

    /// Last screen position reported for `pointer`.
    pub fn touch_position(&self, pointer: PointerId) -> Option<(f32, f32)> {
        self.sessions.get(&pointer).map(|s| s.last)
    }

    /// Ids of the controls engaged by `pointer`.
    pub fn engaged_controls(&self, pointer: PointerId) -> Vec<&str> {
        self.sessions
            .get(&pointer)
            .map(|s| s.controls.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Builds a control from `spec` and adds it.
    pub fn create_control(&mut self, spec: &ControlSpec) -> Result<()> {
        let control = spec.build(self.gate_factor)?;
        self.add_control(control)
    }

    pub fn create_button(&mut self, spec: ControlSpec) -> Result<()> {
        self.create_control(&ControlSpec {
            kind: ControlKind::Button,
            ..spec
        })
    }

    pub fn create_stick(&mut self, spec: ControlSpec) -> Result<()> {
        self.create_control(&ControlSpec {
            kind: ControlKind::Stick,
            ..spec
        })
    }

    /// Registers an already built control and creates its visuals.
    pub fn add_control(&mut self, mut control: Box<dyn VisualControl>) -> Result<()> {
        let id = control.id().to_string();
        if self.controls.iter().any(|c| c.id() == id) {
            return Err(InputError::DuplicateControl { id });
        }
        if let Some(button) = control.button_index() {
            if button >= self.core.buttons().len() {
                return Err(InputError::Config(format!(
                    "control `{id}` maps to button {button}, device has {}",
                    self.core.buttons().len()
                )));
            }
        }
        if let Some((x, y)) = control.axis_indices() {
            let axes = self.core.axes().len();
            if x >= axes || y >= axes {
                return Err(InputError::Config(format!(
                    "control `{id}` maps to axes ({x}, {y}), device has {axes}"
                )));
            }
        }

        if self.caps.multi_surface {
            match control.surface().cloned() {
                None => control.bind_surface(self.default_surface.clone()),
                Some(surface) => {
                    if !self.renderer.surfaces().iter().any(|s| s.id == surface) {
                        return Err(InputError::UnknownSurface {
                            control: id,
                            surface: surface.to_string(),
                        });
                    }
                }
            }
        }

        control.create_visual(&mut *self.renderer);
        let inbox = Rc::clone(&self.inbox);
        let subscription = control
            .events()
            .on_any(move |event: &ControlEvent| inbox.borrow_mut().push_back(*event));
        debug!(device = %self.core.id(), control = %id, kind = ?control.kind(), "control added");
        self.subscriptions.insert(id, subscription);
        self.controls.push(control);
        Ok(())
    }

    /// Removes a control. A held control is released first.
    pub fn remove_control(&mut self, id: &str) -> Result<()> {
        let pos = self
            .controls
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| unknown_control(id))?;
        let mut control = self.controls.remove(pos);

        for session in self.sessions.values_mut() {
            session.controls.retain(|c| c != id);
        }
        if let Some(pointer) = control.active_pointer() {
            control.touch_end(pointer, &mut *self.renderer);
        }
        control.dispose(&mut *self.renderer);
        if let Some(subscription) = self.subscriptions.remove(id) {
            subscription.cancel();
        }
        self.update_pointer_hint();
        debug!(device = %self.core.id(), control = %id, "control removed");
        Ok(())
    }

    pub fn set_control_position(&mut self, id: &str, position: Point) -> Result<()> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| unknown_control(id))?;
        control.set_position(position, &mut *self.renderer);
        Ok(())
    }

    pub fn set_control_size(&mut self, id: &str, size: f32) -> Result<()> {
        let control = self
            .controls
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or_else(|| unknown_control(id))?;
        control.set_size(size, &mut *self.renderer);
        Ok(())
    }

    /// Replaces every control with `layout`.
    pub fn apply_layout(&mut self, layout: &ControlLayout) -> Result<()> {
        let gate_factor = check_gate_factor(layout.gate_factor)?;
        let thumb_radius = check_thumb_radius(layout.thumb_radius)?;
        self.clear_controls();
        self.thumb_radius = thumb_radius;
        self.gate_factor = gate_factor;
        for spec in &layout.controls {
            self.create_control(spec)?;
        }
        Ok(())
    }

    pub fn clear_controls(&mut self) {
        let ids: Vec<String> = self.controls.iter().map(|c| c.id().to_string()).collect();
        for id in ids {
            // Ids come from the list above.
            let _ = self.remove_control(&id);
        }
        self.sessions.clear();
        self.update_pointer_hint();
    }

    /// Removes all visuals and disconnects.
    pub fn dispose(&mut self) {
        self.clear_controls();
        self.core.disconnect();
    }

    /// Routes a pointer batch. Returns `true` if any control was engaged or
    /// an existing session was updated.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> bool {
        let mut handled = false;
        for pointer in &event.pointers {
            handled |= match event.phase {
                PointerPhase::Start => self.pointer_start(pointer),
                PointerPhase::Move => self.pointer_move(pointer),
                PointerPhase::End | PointerPhase::Cancel => self.pointer_end(pointer.id),
            };
        }
        handled
    }

    pub fn mouse_down(&mut self, x: f32, y: f32) -> bool {
        self.pointer_start(&Pointer {
            id: PointerId::Mouse,
            x,
            y,
        })
    }

    /// Ignored unless the mouse button is down.
    pub fn mouse_move(&mut self, x: f32, y: f32) -> bool {
        self.pointer_move(&Pointer {
            id: PointerId::Mouse,
            x,
            y,
        })
    }

    pub fn mouse_up(&mut self) -> bool {
        self.pointer_end(PointerId::Mouse)
    }

    fn pointer_start(&mut self, pointer: &Pointer) -> bool {
        if self.sessions.contains_key(&pointer.id) {
            // Missed end for this id; tear the stale session down first.
            self.pointer_end(pointer.id);
        }

        let surfaces = self.surfaces_for_routing();
        let under = self.surface_under(&surfaces, pointer.x, pointer.y);
        let radius = self.thumb_radius;
        let mut engaged = Vec::new();

        for control in self.controls.iter_mut() {
            let Some(contact) = resolve(
                &*self.renderer,
                self.caps.multi_surface,
                &surfaces,
                under.as_ref(),
                control.surface(),
                pointer,
            ) else {
                continue;
            };
            if !control.contains(contact.world, radius) {
                continue;
            }
            if control.kind() == ControlKind::Button && held_by_any(&self.sessions, control.id()) {
                continue;
            }
            control.touch_start(&contact, &mut *self.renderer);
            engaged.push(control.id().to_string());
        }

        trace!(device = %self.core.id(), pointer = %pointer.id, ?engaged, "touch start");
        let any = !engaged.is_empty();
        self.sessions.insert(
            pointer.id,
            TouchSession {
                controls: engaged,
                last: (pointer.x, pointer.y),
                radius,
            },
        );
        self.update_pointer_hint();
        any
    }

    fn pointer_move(&mut self, pointer: &Pointer) -> bool {
        // Taken out so other sessions can be inspected while this one changes.
        let Some(mut session) = self.sessions.remove(&pointer.id) else {
            return false;
        };
        session.last = (pointer.x, pointer.y);

        let surfaces = self.surfaces_for_routing();
        let under = self.surface_under(&surfaces, pointer.x, pointer.y);

        for control in self.controls.iter_mut() {
            let engaged = session.controls.iter().any(|c| c == control.id());
            match control.kind() {
                ControlKind::Stick => {
                    if !engaged {
                        continue;
                    }
                    let contact = match control.gesture_surface() {
                        Some(target) if self.caps.multi_surface => surfaces
                            .iter()
                            .find(|s| &s.id == target)
                            .map(|s| Contact {
                                pointer: pointer.id,
                                world: s.to_local(pointer.x, pointer.y),
                                surface: Some(s.id.clone()),
                            }),
                        _ => Some(world_contact(&*self.renderer, pointer)),
                    };
                    if let Some(contact) = contact {
                        control.touch_move(&contact, &mut *self.renderer);
                    }
                }
                ControlKind::Button => {
                    let contact = resolve(
                        &*self.renderer,
                        self.caps.multi_surface,
                        &surfaces,
                        under.as_ref(),
                        control.surface(),
                        pointer,
                    );
                    let hit = contact
                        .as_ref()
                        .is_some_and(|c| control.contains(c.world, session.radius));
                    match (engaged, hit, contact) {
                        (false, true, Some(contact)) => {
                            if held_by_any(&self.sessions, control.id()) {
                                continue;
                            }
                            control.touch_start(&contact, &mut *self.renderer);
                            session.controls.push(control.id().to_string());
                        }
                        (true, false, _) => {
                            control.touch_end(pointer.id, &mut *self.renderer);
                            session.controls.retain(|c| c != control.id());
                        }
                        (true, true, Some(contact)) => {
                            control.touch_move(&contact, &mut *self.renderer);
                        }
                        _ => {}
                    }
                }
            }
        }

        self.sessions.insert(pointer.id, session);
        self.update_pointer_hint();
        true
    }

    fn pointer_end(&mut self, pointer: PointerId) -> bool {
        let Some(session) = self.sessions.remove(&pointer) else {
            return false;
        };
        for id in &session.controls {
            if let Some(control) = self.controls.iter_mut().find(|c| c.id() == id) {
                control.touch_end(pointer, &mut *self.renderer);
            }
        }
        trace!(device = %self.core.id(), %pointer, released = ?session.controls, "touch end");
        self.update_pointer_hint();
        true
    }

    /// Reports to the renderer whether any control is held, on change only.
    fn update_pointer_hint(&mut self) {
        if !self.caps.pointer_hint {
            return;
        }
        let active = self.sessions.values().any(|s| !s.controls.is_empty());
        if active != self.pointer_active {
            self.pointer_active = active;
            self.renderer.set_pointer_active(active);
        }
    }

    fn surfaces_for_routing(&self) -> Vec<Surface> {
        if self.caps.multi_surface {
            self.renderer.surfaces()
        } else {
            Vec::new()
        }
    }

    fn surface_under(&self, surfaces: &[Surface], x: f32, y: f32) -> Option<SurfaceId> {
        surfaces.iter().find(|s| s.contains(x, y)).map(|s| s.id.clone())
    }

    /// Applies queued control output. Button edges are applied one per
    /// button per frame.
    fn drain_inbox(&mut self) {
        let queued: Vec<ControlEvent> = self.inbox.borrow_mut().drain(..).collect();
        for event in queued {
            match event {
                ControlEvent::Press { button, .. } => self.queue_edge(button, true),
                ControlEvent::Release { button, .. } => self.queue_edge(button, false),
                ControlEvent::Change { axis_x, axis_y, x, y } => {
                    self.core.write_axis(axis_x, x);
                    self.core.write_axis(axis_y, y);
                    self.core.announce_axis(axis_x);
                    self.core.announce_axis(axis_y);
                }
            }
        }
    }

    fn queue_edge(&mut self, button: usize, pressed: bool) {
        let current = self.core.button(button).map(|b| b.is_pressed()).unwrap_or(false);
        let Some(queue) = self.pending.get_mut(button) else {
            return;
        };
        let last = queue.back().copied().unwrap_or(current);
        if last != pressed {
            queue.push_back(pressed);
        }
    }
}

fn unknown_control(id: &str) -> InputError {
    InputError::Config(format!("no control with id `{id}`"))
}

/// Whether a live session other than the caller's holds control `id`.
fn held_by_any(sessions: &HashMap<PointerId, TouchSession>, id: &str) -> bool {
    sessions.values().any(|s| s.controls.iter().any(|c| c == id))
}

fn world_contact(renderer: &dyn Renderer, pointer: &Pointer) -> Contact {
    let world = renderer.screen_to_world(pointer.x, pointer.y);
    Contact {
        pointer: pointer.id,
        world: world.point,
        surface: world.surface,
    }
}

/// Maps `pointer` into the space of a control bound to `target`, or `None`
/// if the pointer is not over that control's surface.
fn resolve(
    renderer: &dyn Renderer,
    multi_surface: bool,
    surfaces: &[Surface],
    under: Option<&SurfaceId>,
    target: Option<&SurfaceId>,
    pointer: &Pointer,
) -> Option<Contact> {
    if !multi_surface {
        return Some(world_contact(renderer, pointer));
    }
    let under = under?;
    if target.is_some_and(|t| t != under) {
        return None;
    }
    let surface = surfaces.iter().find(|s| &s.id == under)?;
    Some(Contact {
        pointer: pointer.id,
        world: surface.to_local(pointer.x, pointer.y),
        surface: Some(surface.id.clone()),
    })
}

impl Device for VirtualSurfaceDevice {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::VirtualSurface
    }

    fn refresh(&mut self) {
        self.drain_inbox();
        for index in 0..self.core.buttons().len() {
            let current = self.core.button(index).map(|b| b.is_pressed()).unwrap_or(false);
            let pressed = self
                .pending
                .get_mut(index)
                .and_then(VecDeque::pop_front)
                .unwrap_or(current);
            self.core.update_button(index, pressed, pressed, None);
        }
    }

    fn after_advance(&mut self) {
        let renderer = &mut *self.renderer;
        for control in self.controls.iter_mut() {
            control.sync_visual(&self.core, renderer);
        }
    }

    fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        if !self.core.is_connected() {
            return false;
        }
        self.handle_pointer_event(event)
    }

    fn metadata(&self) -> DeviceMeta {
        DeviceMeta {
            name: Some(self.core.name().to_string()),
            kind: Some(DeviceKind::VirtualSurface),
            mapping: Some(self.core.mapping().to_string()),
            surfaces: self
                .renderer
                .surfaces()
                .into_iter()
                .map(|s| s.id.to_string())
                .collect(),
            ..DeviceMeta::default()
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
