//! Per-button state machine.
//!
//! A [`Button`] is owned by exactly one device and only that device's refresh
//! path calls [`Button::update`], once per frame. `prev_pressed` /
//! `prev_touched` therefore describe the previous frame, which is what the
//! device diffs against when it emits transition events.
//!
//! Timestamps come from the owning device's frame clock, so durations advance
//! only when the host calls `advance`.

use std::time::Duration;

/// Edges produced by one [`Button::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonTransition {
    pub just_pressed: bool,
    pub just_released: bool,
    pub just_touched: bool,
    pub just_untouched: bool,
    /// Current hold time while pressed; the completed hold time on release.
    pub press_duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Button {
    pressed: bool,
    touched: bool,
    value: f32,
    prev_pressed: bool,
    prev_touched: bool,
    /// Set on the rising edge of `pressed`, cleared on the falling edge.
    press_start: Option<Duration>,
    touch_start: Option<Duration>,
    long_press_emitted: bool,
    /// Hold time of the most recently completed press.
    last_press_duration: Duration,
    /// Whether that press had already been reported as a long press.
    last_press_long_reported: bool,
}

impl Button {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the current raw state.
    ///
    /// `value` defaults to `1.0` when pressed and `0.0` otherwise for digital
    /// sources; analog values are clamped to `[0, 1]`.
    pub fn update(
        &mut self,
        pressed: bool,
        touched: bool,
        value: Option<f32>,
        now: Duration,
    ) -> ButtonTransition {
        self.prev_pressed = self.pressed;
        self.prev_touched = self.touched;

        self.pressed = pressed;
        self.touched = touched;
        self.value = match value {
            Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ if pressed => 1.0,
            _ => 0.0,
        };

        let just_pressed = pressed && !self.prev_pressed;
        let just_released = !pressed && self.prev_pressed;

        if just_pressed {
            self.press_start = Some(now);
            self.long_press_emitted = false;
        } else if just_released {
            self.last_press_duration = self.held_for(now);
            self.last_press_long_reported = self.long_press_emitted;
            self.press_start = None;
            self.long_press_emitted = false;
        }

        if touched && !self.prev_touched {
            self.touch_start = Some(now);
        } else if !touched && self.prev_touched {
            self.touch_start = None;
        }

        ButtonTransition {
            just_pressed,
            just_released,
            just_touched: touched && !self.prev_touched,
            just_untouched: !touched && self.prev_touched,
            press_duration: if just_released {
                self.last_press_duration
            } else {
                self.held_for(now)
            },
        }
    }

    fn held_for(&self, now: Duration) -> Duration {
        self.press_start
            .map(|start| now.saturating_sub(start))
            .unwrap_or(Duration::ZERO)
    }

    /// Time held so far; zero when not pressed.
    pub fn pressed_duration(&self, now: Duration) -> Duration {
        self.held_for(now)
    }

    /// Time touched so far; zero when not touched.
    pub fn touched_duration(&self, now: Duration) -> Duration {
        self.touch_start
            .map(|start| now.saturating_sub(start))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn was_pressed(&self) -> bool {
        self.prev_pressed
    }

    pub fn was_touched(&self) -> bool {
        self.prev_touched
    }

    /// Pressed this frame but not the previous one.
    pub fn just_pressed(&self) -> bool {
        self.pressed && !self.prev_pressed
    }

    /// Released this frame after being pressed the previous one.
    pub fn just_released(&self) -> bool {
        !self.pressed && self.prev_pressed
    }

    pub fn press_start(&self) -> Option<Duration> {
        self.press_start
    }

    pub fn last_press_duration(&self) -> Duration {
        self.last_press_duration
    }

    pub fn last_press_long_reported(&self) -> bool {
        self.last_press_long_reported
    }

    pub fn long_press_emitted(&self) -> bool {
        self.long_press_emitted
    }

    pub(crate) fn mark_long_press(&mut self) {
        self.long_press_emitted = true;
    }
}
