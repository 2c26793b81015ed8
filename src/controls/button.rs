use tracing::trace;

use super::{Contact, ControlEvent, ControlKind, ControlSpec, VisualControl};
use crate::device::DeviceCore;
use crate::error::Result;
use crate::eventsource::EventSource;
use crate::pointer::PointerId;
use crate::render::{Point, Renderer, SurfaceId, VisualAttributes, VisualHandle, VisualKind, VisualPatch};

pub const DEFAULT_BUTTON_SIZE: f32 = 30.0;
pub const DEFAULT_BUTTON_COLOR: u32 = 0x4444ff;
pub const DEFAULT_BUTTON_ACTIVE_COLOR: u32 = 0x6666ff;
/// Scale applied to a highlighted button.
const ACTIVE_SCALE: f32 = 1.2;

/// Circular on-screen button mapped to one device button.
#[derive(Debug)]
pub struct ButtonControl {
    id: String,
    position: Point,
    size: f32,
    surface: Option<SurfaceId>,
    button: usize,
    label: Option<String>,
    label_color: String,
    color: u32,
    active_color: u32,
    visual: Option<VisualHandle>,
    touch: Option<PointerId>,
    highlighted: bool,
    events: EventSource<ControlEvent>,
}

impl ButtonControl {
    pub fn new(id: impl Into<String>, position: Point, button: usize) -> Self {
        Self {
            id: id.into(),
            position,
            size: DEFAULT_BUTTON_SIZE,
            surface: None,
            button,
            label: None,
            label_color: "#ffffff".to_string(),
            color: DEFAULT_BUTTON_COLOR,
            active_color: DEFAULT_BUTTON_ACTIVE_COLOR,
            visual: None,
            touch: None,
            highlighted: false,
            events: EventSource::new(),
        }
    }

    pub fn from_spec(spec: &ControlSpec) -> Result<Self> {
        let (id, position) = spec.required()?;
        let mut control = Self::new(id, position, spec.button.map(|b| b.index()).unwrap_or(0));
        if let Some(size) = spec.size {
            control.size = size;
        }
        control.surface = spec.surface.clone();
        control.label = spec.label.clone();
        if let Some(color) = &spec.label_color {
            control.label_color = color.clone();
        }
        if let Some(color) = spec.color {
            control.color = color;
        }
        if let Some(color) = spec.active_color {
            control.active_color = color;
        }
        Ok(control)
    }

    pub fn button(&self) -> usize {
        self.button
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    fn set_highlight(&mut self, on: bool, renderer: &mut dyn Renderer) {
        if self.highlighted == on {
            return;
        }
        self.highlighted = on;
        if let Some(handle) = self.visual {
            let patch = VisualPatch {
                color: Some(if on { self.active_color } else { self.color }),
                scale: Some(if on { ACTIVE_SCALE } else { 1.0 }),
                ..VisualPatch::default()
            };
            renderer.update_visual(handle, &patch);
        }
    }
}

impl VisualControl for ButtonControl {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ControlKind {
        ControlKind::Button
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

    fn button_index(&self) -> Option<usize> {
        Some(self.button)
    }

    fn active_pointer(&self) -> Option<PointerId> {
        self.touch
    }

    fn events(&mut self) -> &mut EventSource<ControlEvent> {
        &mut self.events
    }

    fn create_visual(&mut self, renderer: &mut dyn Renderer) {
        if self.visual.is_some() {
            return;
        }
        let attributes = VisualAttributes {
            position: self.position,
            radius: self.size,
            inner_radius: None,
            color: self.color,
            opacity: 0.8,
            label: self.label.clone(),
            label_color: Some(self.label_color.clone()),
            surface: self.surface.clone(),
        };
        self.visual = Some(renderer.create_visual(VisualKind::Button, &attributes));
    }

    fn set_position(&mut self, position: Point, renderer: &mut dyn Renderer) {
        self.position = position;
        if let Some(handle) = self.visual {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    position: Some(position),
                    ..VisualPatch::default()
                },
            );
        }
    }

    fn set_size(&mut self, size: f32, renderer: &mut dyn Renderer) {
        self.size = size;
        if let Some(handle) = self.visual {
            renderer.update_visual(
                handle,
                &VisualPatch {
                    radius: Some(size),
                    ..VisualPatch::default()
                },
            );
        }
    }

    fn touch_start(&mut self, contact: &Contact, renderer: &mut dyn Renderer) {
        trace!(control = %self.id, pointer = %contact.pointer, "button touch start");
        self.touch = Some(contact.pointer);
        self.set_highlight(true, renderer);
        self.events.emit(&ControlEvent::Press {
            button: self.button,
            pointer: contact.pointer,
        });
    }

    fn touch_move(&mut self, _contact: &Contact, _renderer: &mut dyn Renderer) {}

    fn touch_end(&mut self, pointer: PointerId, renderer: &mut dyn Renderer) {
        if self.touch != Some(pointer) {
            return;
        }
        trace!(control = %self.id, %pointer, "button touch end");
        self.touch = None;
        self.set_highlight(false, renderer);
        self.events.emit(&ControlEvent::Release {
            button: self.button,
            pointer,
        });
    }

    fn sync_visual(&mut self, device: &DeviceCore, renderer: &mut dyn Renderer) {
        let pressed = device
            .button(self.button)
            .map(|b| b.is_pressed())
            .unwrap_or(false);
        self.set_highlight(pressed || self.touch.is_some(), renderer);
    }

    fn dispose(&mut self, renderer: &mut dyn Renderer) {
        if let Some(handle) = self.visual.take() {
            renderer.remove_visual(handle);
        }
        self.events.clear(None);
    }
}
