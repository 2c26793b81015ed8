//! Device registry, player slots and the unified event stream.
//!
//! [`InputManager`] owns every device, advances them once per frame, and
//! re-emits their events with the owning player slot filled in. Queries come
//! in two flavors:
//! - **Global**: combine every connected device. Booleans are OR-ed, analog
//!   values take the reading with the greatest magnitude.
//! - **Per player**: read only the device assigned to a slot. An empty slot
//!   or a disconnected device yields neutral values (`false`, `0.0`, zero
//!   duration).
//!
//! Player slots reference devices by id. Removing a device leaves its slot
//! assigned to an id that no longer resolves, which reads as disconnected
//! until the slot is unassigned. Registering a new device under that id
//! releases the slot (emitting `PlayerDeviceUnassigned`) instead of handing
//! it over.
//!
//! Every event in the stream, device or manager level, is stamped on the
//! manager clock, so `InputEvent::at` never decreases.
//!
//! # Examples
//! ```
//! use padlink::{InputManager, StandardButton};
//! use std::time::Duration;
//!
//! let mut input = InputManager::new();
//! input.advance(Duration::from_millis(16));
//! assert!(!input.is_button_pressed(StandardButton::A));
//! assert!(!input.is_button_pressed("START"));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backends::gamepad::{
    gamepad_id, GamepadConnection, GamepadInfo, PhysicalGamepadDevice, SharedGamepadSource,
};
use crate::backends::virtual_surface::{VirtualSurfaceBuilder, VirtualSurfaceDevice};
use crate::button::Button;
use crate::config::ManagerConfig;
use crate::device::{Device, DeviceCore, DeviceKind, Rumble};
use crate::error::{InputError, Result};
use crate::event::{InputEvent, InputKind};
use crate::eventsource::{EventSource, Listener, Subscription};
use crate::filtered_listener::FilteredListener;
use crate::mapping::{AxisKey, ButtonKey, Stick};
use crate::pointer::PointerEvent;
use crate::snapshot::Snapshot;

/// Central input hub.
pub struct InputManager {
    config: ManagerConfig,
    /// Registry in insertion order.
    devices: Vec<Box<dyn Device>>,
    forwarders: HashMap<String, Subscription>,
    /// Player slot to device id.
    players: BTreeMap<usize, String>,
    events: EventSource<InputEvent>,
    /// Device events waiting to be re-emitted with their player slot.
    outbox: Rc<RefCell<VecDeque<InputEvent>>>,
    gamepad_source: Option<SharedGamepadSource>,
    /// Sum of every `advance` delta. Every event in the stream is stamped
    /// on this time base.
    clock: Duration,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            config: ManagerConfig::default(),
            devices: Vec::new(),
            forwarders: HashMap::new(),
            players: BTreeMap::new(),
            events: EventSource::new(),
            outbox: Rc::new(RefCell::new(VecDeque::new())),
            gamepad_source: None,
            clock: Duration::ZERO,
        }
    }

    pub fn with_config(config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The unified event stream.
    pub fn events(&mut self) -> &mut EventSource<InputEvent> {
        &mut self.events
    }

    /// Subscribes to every event concerning `player`.
    pub fn on_player(&mut self, player: usize, listener: impl Listener<InputEvent> + 'static) -> Subscription {
        self.events.on_any(FilteredListener::new(
            move |e: &InputEvent| e.player == Some(player),
            listener,
        ))
    }

    /// Hot-plug source for physical gamepads, polled on every [`advance`](Self::advance).
    pub fn attach_gamepad_source(&mut self, source: SharedGamepadSource) {
        info!("gamepad source attached");
        self.gamepad_source = Some(source);
        self.poll_gamepads();
        self.flush();
    }

    // ---- registry ----

    /// Registers and connects `device`. Returns its id.
    pub fn add_device<D: Device + 'static>(&mut self, device: D) -> Result<String> {
        self.add_boxed(Box::new(device))
    }

    pub fn add_boxed(&mut self, mut device: Box<dyn Device>) -> Result<String> {
        let id = device.id().to_string();
        if self.devices.iter().any(|d| d.id() == id) {
            return Err(InputError::DuplicateDevice(id));
        }

        // A slot still naming this id belonged to a removed device.
        let stale: Vec<usize> = self
            .players
            .iter()
            .filter(|(_, held)| held.as_str() == id)
            .map(|(player, _)| *player)
            .collect();
        for player in stale {
            debug!(device = %id, player, "releasing slot left by a removed device");
            self.unassign_player(player);
        }

        device.core_mut().align_clock(self.clock);
        let outbox = Rc::clone(&self.outbox);
        let forwarder = device
            .events()
            .on_any(move |e: &InputEvent| outbox.borrow_mut().push_back(e.clone()));
        self.forwarders.insert(id.clone(), forwarder);

        info!(device = %id, kind = ?device.kind(), name = device.name(), "device added");
        device.connect();
        self.devices.push(device);
        self.flush();
        Ok(id)
    }

    /// Builds a virtual surface device and registers it.
    pub fn create_virtual_device(&mut self, builder: VirtualSurfaceBuilder) -> Result<String> {
        let device = builder.build()?;
        self.add_device(device)
    }

    /// Disconnects and drops a device. Its player slot, if any, stays assigned.
    pub fn remove_device(&mut self, id: &str) -> Option<Box<dyn Device>> {
        let pos = self.devices.iter().position(|d| d.id() == id)?;
        let mut device = self.devices.remove(pos);
        device.core_mut().align_clock(self.clock);
        device.disconnect();
        self.flush();
        if let Some(forwarder) = self.forwarders.remove(id) {
            forwarder.cancel();
        }
        info!(device = %id, "device removed");
        Some(device)
    }

    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> {
        self.devices.iter().map(|d| d.as_ref())
    }

    pub fn device(&self, id: &str) -> Option<&dyn Device> {
        self.devices.iter().find(|d| d.id() == id).map(|d| d.as_ref())
    }

    /// Mutable access; the device's event clock is caught up first.
    pub fn device_mut(&mut self, id: &str) -> Option<&mut (dyn Device + 'static)> {
        let now = self.clock;
        let device = self.devices.iter_mut().find(|d| d.id() == id)?;
        device.core_mut().align_clock(now);
        Some(device.as_mut())
    }

    pub fn gamepads(&self) -> impl Iterator<Item = &PhysicalGamepadDevice> {
        self.devices
            .iter()
            .filter_map(|d| d.as_any().downcast_ref::<PhysicalGamepadDevice>())
    }

    pub fn virtual_devices(&self) -> impl Iterator<Item = &VirtualSurfaceDevice> {
        self.devices
            .iter()
            .filter_map(|d| d.as_any().downcast_ref::<VirtualSurfaceDevice>())
    }

    /// Devices of one family.
    pub fn devices_of_kind(&self, kind: DeviceKind) -> impl Iterator<Item = &dyn Device> {
        self.devices().filter(move |d| d.kind() == kind)
    }

    pub fn virtual_device_mut(&mut self, id: &str) -> Option<&mut VirtualSurfaceDevice> {
        self.device_mut(id)
            .and_then(|d| d.as_any_mut().downcast_mut::<VirtualSurfaceDevice>())
    }

    // ---- players ----

    /// Makes `device_id` drive `player`.
    ///
    /// A device drives at most one slot: if it already drives another one,
    /// that slot is unassigned first. Overwriting an occupied slot emits only
    /// the assignment of the new device.
    pub fn assign_device_to_player(&mut self, device_id: &str, player: usize) -> Result<()> {
        if !self.devices.iter().any(|d| d.id() == device_id) {
            return Err(InputError::UnknownDevice(device_id.to_string()));
        }
        if self.players.get(&player).map(String::as_str) == Some(device_id) {
            return Ok(());
        }
        if let Some(previous) = self.player_of(device_id) {
            self.unassign_player(previous);
        }
        self.flush();
        self.players.insert(player, device_id.to_string());
        info!(device = %device_id, player, "player assigned");
        self.emit_manager(device_id, player, InputKind::PlayerDeviceAssigned { player });
        Ok(())
    }

    /// Clears a slot. Returns the id it held, `None` if it was already empty.
    pub fn unassign_player(&mut self, player: usize) -> Option<String> {
        let device_id = self.players.remove(&player)?;
        self.flush();
        info!(device = %device_id, player, "player unassigned");
        self.emit_manager(&device_id, player, InputKind::PlayerDeviceUnassigned { player });
        Some(device_id)
    }

    /// Whether `player` has a connected device.
    pub fn has_player_device(&self, player: usize) -> bool {
        self.player_core(player).is_some()
    }

    /// The device assigned to `player`, connected or not.
    pub fn player_device(&self, player: usize) -> Option<&dyn Device> {
        let id = self.players.get(&player)?;
        self.device(id)
    }

    /// Device id assigned to `player`, even if that device is gone.
    pub fn player_device_id(&self, player: usize) -> Option<&str> {
        self.players.get(&player).map(String::as_str)
    }

    /// Slot driven by `device_id`.
    pub fn player_of(&self, device_id: &str) -> Option<usize> {
        self.players
            .iter()
            .find(|(_, id)| id.as_str() == device_id)
            .map(|(player, _)| *player)
    }

    /// Occupied player slots, ascending.
    pub fn players(&self) -> impl Iterator<Item = (usize, &str)> {
        self.players.iter().map(|(p, id)| (*p, id.as_str()))
    }

    pub fn player_input(&self, player: usize) -> Option<PlayerInput<'_>> {
        self.has_player_device(player).then_some(PlayerInput {
            manager: self,
            player,
        })
    }

    // ---- frame ----

    /// Advances every connected device by `dt`, in registration order.
    ///
    /// Hot-plug changes are applied at the frame's start time; transitions
    /// are stamped with its end time.
    pub fn advance(&mut self, dt: Duration) {
        self.poll_gamepads();
        let start = self.clock;
        self.clock += dt;
        for device in self.devices.iter_mut() {
            device.core_mut().align_clock(start);
            if device.is_connected() {
                device.advance(dt);
            }
        }
        self.flush();
    }

    /// Stream time: the sum of every `advance` delta.
    pub fn now(&self) -> Duration {
        self.clock
    }

    /// Offers a pointer event to every connected device. Returns `true` if
    /// any device consumed it.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        let mut handled = false;
        for device in self.devices.iter_mut() {
            if device.is_connected() {
                handled |= device.handle_pointer(event);
            }
        }
        self.flush();
        handled
    }

    /// Owned copy of every registered device's state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(
            self.devices
                .iter()
                .map(|d| (d.id().to_string(), d.state()))
                .collect(),
        )
    }

    // ---- rumble ----

    /// Rumbles every connected device that supports it. Returns how many did.
    pub fn vibrate(&mut self, rumble: &Rumble) -> usize {
        self.devices
            .iter_mut()
            .filter(|d| d.is_connected())
            .map(|d| d.vibrate(rumble))
            .filter(|played| *played)
            .count()
    }

    pub fn vibrate_for_player(&mut self, player: usize, rumble: &Rumble) -> bool {
        let Some(id) = self.players.get(&player).cloned() else {
            return false;
        };
        match self.device_mut(&id) {
            Some(device) if device.is_connected() => device.vibrate(rumble),
            _ => false,
        }
    }

    // ---- global queries ----

    fn connected_cores(&self) -> impl Iterator<Item = &DeviceCore> {
        self.devices
            .iter()
            .filter(|d| d.is_connected())
            .map(|d| d.core())
    }

    pub fn is_button_pressed(&self, button: impl ButtonKey) -> bool {
        let Some(i) = button.button_index() else {
            return false;
        };
        self.connected_cores().any(|c| c.button(i).is_some_and(|b| b.is_pressed()))
    }

    pub fn is_button_just_pressed(&self, button: impl ButtonKey) -> bool {
        let Some(i) = button.button_index() else {
            return false;
        };
        self.connected_cores().any(|c| c.button(i).is_some_and(|b| b.just_pressed()))
    }

    pub fn is_button_just_released(&self, button: impl ButtonKey) -> bool {
        let Some(i) = button.button_index() else {
            return false;
        };
        self.connected_cores().any(|c| c.button(i).is_some_and(|b| b.just_released()))
    }

    /// Longest current hold of `button` across devices.
    pub fn button_press_duration(&self, button: impl ButtonKey) -> Duration {
        let Some(i) = button.button_index() else {
            return Duration::ZERO;
        };
        self.connected_cores()
            .filter_map(|c| c.button(i).map(|b| b.pressed_duration(c.now())))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Axis reading with the greatest magnitude across devices.
    pub fn axis(&self, axis: impl AxisKey) -> f32 {
        let Some(i) = axis.axis_index() else {
            return 0.0;
        };
        self.connected_cores().fold(0.0, |best, c| {
            let v = c.axis(i);
            if v.abs() > best.abs() {
                v
            } else {
                best
            }
        })
    }

    /// Stick position from the device pushing it furthest.
    pub fn stick(&self, stick: Stick) -> (f32, f32) {
        let (ax, ay) = stick.axes();
        let mut best = (0.0, 0.0);
        let mut best_mag = 0.0;
        for core in self.connected_cores() {
            let (x, y) = (core.axis(ax), core.axis(ay));
            let mag = x * x + y * y;
            if mag > best_mag {
                best_mag = mag;
                best = (x, y);
            }
        }
        best
    }

    // ---- per-player queries ----

    /// Core of the connected device driving `player`.
    fn player_core(&self, player: usize) -> Option<&DeviceCore> {
        let id = self.players.get(&player)?;
        self.devices
            .iter()
            .find(|d| d.id() == id && d.is_connected())
            .map(|d| d.core())
    }

    pub fn is_button_pressed_for_player(&self, button: impl ButtonKey, player: usize) -> bool {
        self.player_button(button, player, |b| b.is_pressed())
    }

    pub fn is_button_just_pressed_for_player(&self, button: impl ButtonKey, player: usize) -> bool {
        self.player_button(button, player, |b| b.just_pressed())
    }

    pub fn is_button_just_released_for_player(&self, button: impl ButtonKey, player: usize) -> bool {
        self.player_button(button, player, |b| b.just_released())
    }

    pub fn button_press_duration_for_player(&self, button: impl ButtonKey, player: usize) -> Duration {
        let Some(i) = button.button_index() else {
            return Duration::ZERO;
        };
        self.player_core(player)
            .and_then(|c| c.button(i).map(|b| b.pressed_duration(c.now())))
            .unwrap_or(Duration::ZERO)
    }

    pub fn axis_for_player(&self, axis: impl AxisKey, player: usize) -> f32 {
        match (axis.axis_index(), self.player_core(player)) {
            (Some(i), Some(core)) => core.axis(i),
            _ => 0.0,
        }
    }

    pub fn stick_for_player(&self, stick: Stick, player: usize) -> (f32, f32) {
        let (ax, ay) = stick.axes();
        self.player_core(player)
            .map(|c| (c.axis(ax), c.axis(ay)))
            .unwrap_or((0.0, 0.0))
    }

    fn player_button(
        &self,
        button: impl ButtonKey,
        player: usize,
        test: impl Fn(&Button) -> bool,
    ) -> bool {
        let (Some(i), Some(core)) = (button.button_index(), self.player_core(player)) else {
            return false;
        };
        core.button(i).is_some_and(test)
    }

    // ---- internals ----

    fn poll_gamepads(&mut self) {
        let Some(source) = self.gamepad_source.clone() else {
            return;
        };
        let changes = source.borrow_mut().poll_connections();
        for change in changes {
            match change {
                GamepadConnection::Connected { index, info } => {
                    self.on_gamepad_connected(index, info, &source);
                }
                GamepadConnection::Disconnected { index } => self.on_gamepad_disconnected(index),
            }
        }
    }

    fn on_gamepad_connected(
        &mut self,
        index: u32,
        info: GamepadInfo,
        source: &SharedGamepadSource,
    ) {
        let id = gamepad_id(index);
        if self.devices.iter().any(|d| d.id() == id) {
            debug!(device = %id, "gamepad already registered");
            return;
        }

        let device = PhysicalGamepadDevice::new(index, Rc::clone(source), self.config.gamepad, info);
        if let Err(e) = self.add_device(device) {
            warn!(device = %id, error = %e, "could not register gamepad");
            return;
        }

        if !self.config.auto_assign_gamepads {
            return;
        }
        match (0..self.config.max_players).find(|p| !self.players.contains_key(p)) {
            Some(player) => {
                // The device was registered just above.
                if self.assign_device_to_player(&id, player).is_ok() {
                    if let Some(rumble) = self.config.assign_rumble {
                        if let Some(device) = self.device_mut(&id) {
                            device.vibrate(&rumble);
                        }
                    }
                }
            }
            None => warn!(device = %id, "no available player slot for gamepad"),
        }
    }

    fn on_gamepad_disconnected(&mut self, index: u32) {
        let id = gamepad_id(index);
        if !self.devices.iter().any(|d| d.id() == id) {
            return;
        }
        while let Some(player) = self.player_of(&id) {
            self.unassign_player(player);
        }
        self.remove_device(&id);
    }

    /// Re-emits queued device events with their player slot.
    fn flush(&mut self) {
        loop {
            let next = self.outbox.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            let player = self.player_of(&event.device_id);
            self.events.emit(&event.with_player(player));
        }
    }

    fn emit_manager(&mut self, device_id: &str, player: usize, kind: InputKind) {
        let event = InputEvent::new(device_id, self.clock, kind).with_player(Some(player));
        self.events.emit(&event);
    }
}

/// Queries scoped to one player, borrowed from the manager.
#[derive(Clone, Copy)]
pub struct PlayerInput<'a> {
    manager: &'a InputManager,
    player: usize,
}

impl<'a> PlayerInput<'a> {
    pub fn player(&self) -> usize {
        self.player
    }

    pub fn device(&self) -> Option<&'a dyn Device> {
        self.manager.player_device(self.player)
    }

    pub fn is_button_pressed(&self, button: impl ButtonKey) -> bool {
        self.manager.is_button_pressed_for_player(button, self.player)
    }

    pub fn is_button_just_pressed(&self, button: impl ButtonKey) -> bool {
        self.manager.is_button_just_pressed_for_player(button, self.player)
    }

    pub fn is_button_just_released(&self, button: impl ButtonKey) -> bool {
        self.manager.is_button_just_released_for_player(button, self.player)
    }

    pub fn button_press_duration(&self, button: impl ButtonKey) -> Duration {
        self.manager.button_press_duration_for_player(button, self.player)
    }

    pub fn axis(&self, axis: impl AxisKey) -> f32 {
        self.manager.axis_for_player(axis, self.player)
    }

    pub fn stick(&self, stick: Stick) -> (f32, f32) {
        self.manager.stick_for_player(stick, self.player)
    }
}
