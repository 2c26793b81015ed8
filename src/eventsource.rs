//! Minimal publish/subscribe capability.
//!
//! Devices, on-screen controls and the manager each *own* an [`EventSource`]
//! rather than inheriting from a common emitter. Events name their channel via
//! [`Event::channel`]; listeners subscribe to one channel or to all of them.
//!
//! # Dispatch rules
//! - Listeners run in subscription order.
//! - A panicking listener is caught and logged; the remaining listeners still
//!   receive the event and the source stays usable.
//! - A [`Subscription`] handle can be cancelled at any time, including from
//!   inside another listener while an event is being dispatched. Cancelled
//!   entries are skipped immediately and pruned after dispatch.
//! - `once` listeners are retired *before* they run, so a panicking one-shot
//!   listener is not retried.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{error, warn};

/// Default per-channel listener count above which a warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// An event that can be routed through an [`EventSource`].
pub trait Event {
    /// Fieldless channel identifier (e.g. `buttonDown`).
    type Channel: Copy + Eq + fmt::Debug;

    fn channel(&self) -> Self::Channel;
}

/// Something that reacts to events of type `E`.
///
/// Implemented for every `FnMut(&E)` closure.
pub trait Listener<E> {
    fn on_event(&mut self, event: &E);
}

impl<E, F> Listener<E> for F
where
    F: FnMut(&E),
{
    fn on_event(&mut self, event: &E) {
        self(event)
    }
}

/// Identifies a registered listener within one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Determines which events a listener wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter<C> {
    All,
    Channel(C),
}

impl<C: PartialEq> EventFilter<C> {
    fn accepts(&self, channel: &C) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Channel(wanted) => wanted == channel,
        }
    }
}

/// Handle to a registered listener.
///
/// Cloning the handle shares the same registration. Dropping it leaves the
/// listener registered.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: ListenerId,
    alive: Rc<Cell<bool>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unregisters the listener. Safe to call during dispatch.
    pub fn cancel(&self) {
        self.alive.set(false);
    }

    /// `false` once cancelled, removed, or (for `once`) delivered.
    pub fn is_active(&self) -> bool {
        self.alive.get()
    }
}

struct ListenerEntry<E: Event> {
    id: ListenerId,
    listener: Box<dyn Listener<E>>,
    filter: EventFilter<E::Channel>,
    enabled: bool,
    once: bool,
    alive: Rc<Cell<bool>>,
}

/// Named-channel event emitter.
pub struct EventSource<E: Event> {
    next_id: u64,
    max_listeners: usize,
    listeners: Vec<ListenerEntry<E>>,
}

impl<E: Event> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("listeners", &self.listeners.len())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl<E: Event> EventSource<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            max_listeners: DEFAULT_MAX_LISTENERS,
            listeners: Vec::new(),
        }
    }

    /// Subscribes `listener` to a single channel.
    pub fn on(&mut self, channel: E::Channel, listener: impl Listener<E> + 'static) -> Subscription {
        self.register(EventFilter::Channel(channel), Box::new(listener), false)
    }

    /// Subscribes `listener` to the next event on `channel` only.
    pub fn once(
        &mut self,
        channel: E::Channel,
        listener: impl Listener<E> + 'static,
    ) -> Subscription {
        self.register(EventFilter::Channel(channel), Box::new(listener), true)
    }

    /// Subscribes `listener` to every channel.
    pub fn on_any(&mut self, listener: impl Listener<E> + 'static) -> Subscription {
        self.register(EventFilter::All, Box::new(listener), false)
    }

    fn register(
        &mut self,
        filter: EventFilter<E::Channel>,
        listener: Box<dyn Listener<E>>,
        once: bool,
    ) -> Subscription {
        let existing = self
            .listeners
            .iter()
            .filter(|e| e.alive.get() && e.filter == filter)
            .count();
        if existing >= self.max_listeners {
            warn!(
                ?filter,
                existing, "possible listener leak: channel already has {} listeners", existing
            );
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let alive = Rc::new(Cell::new(true));
        self.listeners.push(ListenerEntry {
            id,
            listener,
            filter,
            enabled: true,
            once,
            alive: Rc::clone(&alive),
        });
        Subscription { id, alive }
    }

    /// Unregisters a listener entirely.
    pub fn off(&mut self, id: ListenerId) {
        self.listeners.retain(|e| {
            if e.id == id {
                e.alive.set(false);
                false
            } else {
                true
            }
        });
    }

    /// Enables a previously disabled listener.
    pub fn enable(&mut self, id: ListenerId) {
        if let Some(entry) = self.listeners.iter_mut().find(|e| e.id == id) {
            entry.enabled = true;
        }
    }

    /// Mutes a listener without removing it.
    pub fn disable(&mut self, id: ListenerId) {
        if let Some(entry) = self.listeners.iter_mut().find(|e| e.id == id) {
            entry.enabled = false;
        }
    }

    /// Removes listeners subscribed to `channel`, or every listener for `None`.
    ///
    /// Wildcard listeners are only removed by `clear(None)`.
    pub fn clear(&mut self, channel: Option<E::Channel>) {
        self.listeners.retain(|e| {
            let remove = match channel {
                None => true,
                Some(c) => e.filter == EventFilter::Channel(c),
            };
            if remove {
                e.alive.set(false);
            }
            !remove
        });
    }

    /// Number of live listeners that would receive an event on `channel`.
    pub fn listener_count(&self, channel: E::Channel) -> usize {
        self.listeners
            .iter()
            .filter(|e| e.alive.get() && e.filter.accepts(&channel))
            .count()
    }

    /// Channels with at least one dedicated listener, in subscription order.
    pub fn channels(&self) -> Vec<E::Channel> {
        let mut out = Vec::new();
        for entry in self.listeners.iter().filter(|e| e.alive.get()) {
            if let EventFilter::Channel(c) = entry.filter {
                if !out.contains(&c) {
                    out.push(c);
                }
            }
        }
        out
    }

    pub fn set_max_listeners(&mut self, n: usize) {
        self.max_listeners = n;
    }

    pub fn is_empty(&self) -> bool {
        !self.listeners.iter().any(|e| e.alive.get())
    }

    /// Delivers `event` to every enabled, matching listener.
    ///
    /// Returns `true` if at least one listener was invoked.
    pub fn emit(&mut self, event: &E) -> bool {
        let channel = event.channel();
        let mut delivered = false;

        for entry in self.listeners.iter_mut() {
            if !entry.alive.get() || !entry.enabled || !entry.filter.accepts(&channel) {
                continue;
            }
            if entry.once {
                entry.alive.set(false);
            }
            delivered = true;

            let listener = &mut entry.listener;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            if let Err(payload) = outcome {
                error!(
                    ?channel,
                    listener = entry.id.0,
                    "listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        self.listeners.retain(|e| e.alive.get());
        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ch {
        Ping,
        Pong,
    }

    #[derive(Debug)]
    struct Msg(Ch, u32);

    impl Event for Msg {
        type Channel = Ch;
        fn channel(&self) -> Ch {
            self.0
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl FnMut(&Msg) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |m: &Msg| sink.borrow_mut().push(m.1))
    }

    #[test]
    fn routes_by_channel() {
        let mut src = EventSource::new();
        let (pings, on_ping) = recorder();
        let (all, on_all) = recorder();
        src.on(Ch::Ping, on_ping);
        src.on_any(on_all);

        assert!(src.emit(&Msg(Ch::Ping, 1)));
        assert!(src.emit(&Msg(Ch::Pong, 2)));

        assert_eq!(*pings.borrow(), vec![1]);
        assert_eq!(*all.borrow(), vec![1, 2]);
        assert_eq!(src.listener_count(Ch::Ping), 2);
        assert_eq!(src.listener_count(Ch::Pong), 1);
    }

    #[test]
    fn once_fires_a_single_time() {
        let mut src = EventSource::new();
        let (log, l) = recorder();
        let sub = src.once(Ch::Ping, l);

        src.emit(&Msg(Ch::Ping, 1));
        src.emit(&Msg(Ch::Ping, 2));

        assert_eq!(*log.borrow(), vec![1]);
        assert!(!sub.is_active());
        assert!(src.is_empty());
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let mut src = EventSource::new();
        src.on(Ch::Ping, |_: &Msg| panic!("boom"));
        let (log, l) = recorder();
        src.on(Ch::Ping, l);

        src.emit(&Msg(Ch::Ping, 7));
        src.emit(&Msg(Ch::Ping, 8));

        assert_eq!(*log.borrow(), vec![7, 8]);
        assert_eq!(src.listener_count(Ch::Ping), 2);
    }

    #[test]
    fn cancel_during_dispatch_skips_later_listener() {
        let mut src = EventSource::new();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&victim);
        src.on(Ch::Ping, move |_: &Msg| {
            if let Some(sub) = handle.borrow().as_ref() {
                sub.cancel();
            }
        });
        let (log, l) = recorder();
        *victim.borrow_mut() = Some(src.on(Ch::Ping, l));

        src.emit(&Msg(Ch::Ping, 1));

        assert!(log.borrow().is_empty());
        assert_eq!(src.listener_count(Ch::Ping), 1);
    }

    #[test]
    fn disable_and_off() {
        let mut src = EventSource::new();
        let (log, l) = recorder();
        let sub = src.on(Ch::Pong, l);

        src.disable(sub.id());
        assert!(!src.emit(&Msg(Ch::Pong, 1)));
        src.enable(sub.id());
        src.emit(&Msg(Ch::Pong, 2));
        src.off(sub.id());
        src.emit(&Msg(Ch::Pong, 3));

        assert_eq!(*log.borrow(), vec![2]);
        assert!(!sub.is_active());
    }

    #[test]
    fn clear_by_channel_keeps_wildcards() {
        let mut src = EventSource::new();
        src.on(Ch::Ping, |_: &Msg| {});
        src.on(Ch::Pong, |_: &Msg| {});
        src.on_any(|_: &Msg| {});

        src.clear(Some(Ch::Ping));
        assert_eq!(src.channels(), vec![Ch::Pong]);
        assert_eq!(src.listener_count(Ch::Ping), 1);

        src.clear(None);
        assert!(src.is_empty());
    }
}
