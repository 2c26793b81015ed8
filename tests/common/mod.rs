#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use padlink::{
    GamepadConnection, GamepadInfo, GamepadSnapshot, InputEvent, InputKind, Point, Rect, RawGamepadSource,
    Renderer, RendererCapabilities, Rumble, Surface, VisualAttributes, VisualHandle, VisualKind, VisualPatch,
    WorldPoint,
};

pub const FRAME: Duration = Duration::from_millis(16);

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// A visual as the renderer currently holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawn {
    pub kind: VisualKind,
    pub attributes: VisualAttributes,
    pub scale: f32,
}

#[derive(Debug, Default)]
pub struct RenderLog {
    pub live: HashMap<VisualHandle, Drawn>,
    pub created: Vec<VisualHandle>,
    pub removed: Vec<VisualHandle>,
    pub updates: usize,
    pub pointer_active: Vec<bool>,
}

impl RenderLog {
    /// Live visuals of one kind, in creation order.
    pub fn of_kind(&self, kind: VisualKind) -> Vec<&Drawn> {
        self.created
            .iter()
            .filter_map(|h| self.live.get(h))
            .filter(|d| d.kind == kind)
            .collect()
    }
}

/// Headless renderer that records every call.
pub struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
    surfaces: Vec<Surface>,
    caps: RendererCapabilities,
    next: u64,
}

impl RecordingRenderer {
    pub fn new(surfaces: Vec<Surface>, caps: RendererCapabilities) -> (Self, Rc<RefCell<RenderLog>>) {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        (
            Self {
                log: Rc::clone(&log),
                surfaces,
                caps,
                next: 1,
            },
            log,
        )
    }

    /// One 800x600 screen mapped 1:1 onto world space.
    pub fn screen() -> (Self, Rc<RefCell<RenderLog>>) {
        Self::new(
            vec![Surface::new("screen", Rect::new(0.0, 0.0, 800.0, 600.0))],
            RendererCapabilities::default(),
        )
    }

    /// Two 400x300 surfaces side by side, `left` then `right`.
    pub fn split() -> (Self, Rc<RefCell<RenderLog>>) {
        Self::new(
            vec![
                Surface::new("left", Rect::new(0.0, 0.0, 400.0, 300.0)),
                Surface::new("right", Rect::new(400.0, 0.0, 800.0, 300.0)),
            ],
            RendererCapabilities {
                multi_surface: true,
                pointer_hint: true,
            },
        )
    }
}

impl Renderer for RecordingRenderer {
    fn capabilities(&self) -> RendererCapabilities {
        self.caps
    }

    fn create_visual(&mut self, kind: VisualKind, attributes: &VisualAttributes) -> VisualHandle {
        let handle = VisualHandle(self.next);
        self.next += 1;
        let mut log = self.log.borrow_mut();
        log.created.push(handle);
        log.live.insert(
            handle,
            Drawn {
                kind,
                attributes: attributes.clone(),
                scale: 1.0,
            },
        );
        handle
    }

    fn update_visual(&mut self, handle: VisualHandle, patch: &VisualPatch) {
        let mut log = self.log.borrow_mut();
        log.updates += 1;
        if let Some(drawn) = log.live.get_mut(&handle) {
            if let Some(p) = patch.position {
                drawn.attributes.position = p;
            }
            if let Some(r) = patch.radius {
                drawn.attributes.radius = r;
            }
            if let Some(r) = patch.inner_radius {
                drawn.attributes.inner_radius = Some(r);
            }
            if let Some(c) = patch.color {
                drawn.attributes.color = c;
            }
            if let Some(s) = patch.scale {
                drawn.scale = s;
            }
        }
    }

    fn remove_visual(&mut self, handle: VisualHandle) {
        let mut log = self.log.borrow_mut();
        log.live.remove(&handle);
        log.removed.push(handle);
    }

    fn screen_to_world(&self, x: f32, y: f32) -> WorldPoint {
        WorldPoint {
            point: Point::new(x, y),
            surface: self
                .surfaces
                .iter()
                .find(|s| s.contains(x, y))
                .map(|s| s.id.clone()),
        }
    }

    fn surfaces(&self) -> Vec<Surface> {
        self.surfaces.clone()
    }

    fn set_pointer_active(&mut self, active: bool) {
        self.log.borrow_mut().pointer_active.push(active);
    }
}

/// Scriptable gamepad platform.
#[derive(Default)]
pub struct FakePads {
    pub pads: HashMap<u32, GamepadSnapshot>,
    pub pending: Vec<GamepadConnection>,
    pub rumbles: Vec<(u32, Rumble)>,
}

impl FakePads {
    pub fn plug(&mut self, index: u32) {
        self.pads.insert(index, GamepadSnapshot::standard());
        self.pending.push(GamepadConnection::Connected {
            index,
            info: GamepadInfo {
                name: format!("Fake Pad {index}"),
                rumble: true,
                ..GamepadInfo::default()
            },
        });
    }

    pub fn unplug(&mut self, index: u32) {
        self.pads.remove(&index);
        self.pending.push(GamepadConnection::Disconnected { index });
    }

    pub fn pad(&mut self, index: u32) -> &mut GamepadSnapshot {
        self.pads.entry(index).or_insert_with(GamepadSnapshot::standard)
    }
}

impl RawGamepadSource for FakePads {
    fn poll_connections(&mut self) -> Vec<GamepadConnection> {
        std::mem::take(&mut self.pending)
    }

    fn snapshot(&mut self, index: u32) -> Option<GamepadSnapshot> {
        self.pads.get(&index).cloned()
    }

    fn vibrate(&mut self, index: u32, rumble: &Rumble) -> bool {
        self.rumbles.push((index, *rumble));
        true
    }
}

/// Records every event's kind and player.
pub type EventLog = Rc<RefCell<Vec<(Option<usize>, InputKind)>>>;

pub fn recorder() -> (EventLog, impl FnMut(&InputEvent) + 'static) {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    (log, move |e: &InputEvent| sink.borrow_mut().push((e.player, e.kind)))
}

/// Kinds only, dropping the player annotation.
pub fn kinds(log: &EventLog) -> Vec<InputKind> {
    log.borrow().iter().map(|(_, k)| *k).collect()
}
