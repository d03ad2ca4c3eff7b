//! Frame-clock tweens and one-shot deferred callbacks.
//!
//! Both are driven by the elapsed session time passed in each frame, so they
//! behave identically under a real clock and under a scripted one in tests.

use std::time::Duration;

use serde::Deserialize;

/// Easing functions for smooth animations.
///
/// These control the acceleration curve of a tween.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant speed throughout.
    #[default]
    Linear,
    /// Start slow, accelerate.
    EaseIn,
    /// Start fast, decelerate.
    EaseOut,
    /// Start slow, speed up, then slow down.
    EaseInOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// A numeric animation from one value to another over a fixed duration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use reveal::{Easing, Tween};
///
/// let fade = Tween::new(1.0, 0.0, Duration::ZERO, Duration::from_secs(3), Easing::Linear);
/// assert_eq!(fade.value_at(Duration::from_millis(1500)), 0.5);
/// assert_eq!(fade.value_at(Duration::from_secs(3)), 0.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub start: Duration,
    pub duration: Duration,
    pub easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, start: Duration, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            start,
            duration,
            easing,
        }
    }

    /// Linear progress in `[0, 1]` at `now`.
    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return if now >= self.start { 1.0 } else { 0.0 };
        }
        let elapsed = now.saturating_sub(self.start);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// Eased value at `now`. Exactly `to` once the tween has finished.
    pub fn value_at(&self, now: Duration) -> f32 {
        if self.is_finished(now) {
            return self.to;
        }
        let eased = self.easing.apply(self.progress(now));
        self.from + (self.to - self.from) * eased
    }

    pub fn end(&self) -> Duration {
        self.start + self.duration
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        now >= self.end()
    }
}

/// A callback deadline that fires exactly once.
#[derive(Clone, Copy, Debug)]
pub struct Deferred {
    fire_at: Duration,
    fired: bool,
}

impl Deferred {
    /// Schedule a deadline `delay` after `now`.
    pub fn after(now: Duration, delay: Duration) -> Self {
        Self {
            fire_at: now + delay,
            fired: false,
        }
    }

    pub fn fire_at(&self) -> Duration {
        self.fire_at
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns `true` the first time `now` reaches the deadline, `false` ever after.
    pub fn poll(&mut self, now: Duration) -> bool {
        if self.fired || now < self.fire_at {
            return false;
        }
        self.fired = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn easing_endpoints_are_fixed() {
        for easing in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(-3.0), 0.0);
            assert_eq!(easing.apply(7.0), 1.0);
        }
    }

    #[test]
    fn ease_out_leads_linear() {
        assert!(Easing::EaseOut.apply(0.25) > Easing::Linear.apply(0.25));
        assert!(Easing::EaseIn.apply(0.25) < Easing::Linear.apply(0.25));
    }

    #[test]
    fn tween_holds_from_before_start() {
        let t = Tween::new(1.0, 0.0, ms(100), ms(1000), Easing::EaseOut);
        assert_eq!(t.value_at(ms(0)), 1.0);
        assert_eq!(t.value_at(ms(100)), 1.0);
    }

    #[test]
    fn tween_lands_exactly_on_target() {
        let t = Tween::new(1.0, 0.0, ms(20), Duration::from_secs(3), Easing::EaseOut);
        assert!(!t.is_finished(ms(3019)));
        assert!(t.value_at(ms(3019)) > 0.0);
        assert!(t.is_finished(ms(3020)));
        assert_eq!(t.value_at(ms(3020)), 0.0);
        assert_eq!(t.value_at(ms(9000)), 0.0);
    }

    #[test]
    fn zero_duration_tween_jumps() {
        let t = Tween::new(0.0, 5.0, ms(10), Duration::ZERO, Easing::Linear);
        assert_eq!(t.value_at(ms(9)), 0.0);
        assert_eq!(t.value_at(ms(10)), 5.0);
    }

    #[test]
    fn deferred_fires_once_at_deadline() {
        let mut d = Deferred::after(ms(20), ms(500));
        assert_eq!(d.fire_at(), ms(520));
        assert!(!d.poll(ms(20)));
        assert!(!d.poll(ms(519)));
        assert!(d.poll(ms(520)));
        assert!(!d.poll(ms(521)));
        assert!(d.has_fired());
    }
}
