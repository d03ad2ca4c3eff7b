use std::time::Duration;

use super::tween::{Easing, Tween};
use crate::draw2d::Draw2d;
use crate::ui::{Color, Rect};

/// Default length of the bar's own scale transition.
///
/// The coordinator waits this long after the last load settles before ending
/// the bar, so the final fill animation is never cut short.
pub const DEFAULT_BAR_TRANSITION: Duration = Duration::from_millis(500);

/// Default length of the bar's exit animation once it is ended.
pub const DEFAULT_BAR_EXIT: Duration = Duration::from_millis(1500);

/// Which edge the bar's scale is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Right,
}

/// Static look and timing of the progress bar.
#[derive(Clone, Copy, Debug)]
pub struct ProgressBarStyle {
    /// Transition applied whenever the published progress changes.
    pub transition: Duration,
    pub easing: Easing,
    /// Transition applied when the bar is ended.
    pub exit: Duration,
    pub exit_easing: Easing,
    /// Bar thickness in pixels.
    pub thickness: f32,
    pub color: Color,
}

impl Default for ProgressBarStyle {
    fn default() -> Self {
        Self {
            transition: DEFAULT_BAR_TRANSITION,
            easing: Easing::Linear,
            exit: DEFAULT_BAR_EXIT,
            exit_easing: Easing::EaseInOut,
            thickness: 2.0,
            color: Color::WHITE,
        }
    }
}

/// A horizontal loading bar across the middle of the viewport.
///
/// Modelled on a styled DOM element:
/// - a `--progress` value published by the coordinator
/// - an explicit `scaleX(--progress)` transform override, anchored left
/// - an `ended` class whose rule is `scaleX(0)` anchored right
///
/// Every change of the target scale starts a new transition from the value
/// currently on screen. Ending the bar while a fill transition is still
/// running flips the anchor at a partial scale, which is the visible jump
/// the coordinator's grace delay avoids.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    style: ProgressBarStyle,
    progress: Option<f32>,
    transform: Option<f32>,
    ended: bool,
    anchor: Anchor,
    scale: Tween,
}

impl ProgressBar {
    pub fn new(style: ProgressBarStyle) -> Self {
        Self {
            style,
            progress: None,
            transform: None,
            ended: false,
            anchor: Anchor::Left,
            scale: Tween::new(0.0, 0.0, Duration::ZERO, Duration::ZERO, Easing::Linear),
        }
    }

    pub fn style(&self) -> &ProgressBarStyle {
        &self.style
    }

    /// Last published `--progress` value.
    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    /// Explicit transform override, if any.
    pub fn transform(&self) -> Option<f32> {
        self.transform
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Publish a new progress ratio and animate toward it.
    pub fn set_progress(&mut self, ratio: f32, now: Duration) {
        let ratio = ratio.clamp(0.0, 1.0);
        self.progress = Some(ratio);
        self.transform = Some(ratio);
        self.retarget(now);
    }

    /// Add the `ended` class and clear the transform override.
    pub fn end(&mut self, now: Duration) {
        self.ended = true;
        self.transform = None;
        self.retarget(now);
    }

    /// Displayed horizontal scale at `now`.
    pub fn scale_at(&self, now: Duration) -> f32 {
        self.scale.value_at(now)
    }

    /// True while the fill or exit transition is still running.
    pub fn is_animating(&self, now: Duration) -> bool {
        !self.scale.is_finished(now)
    }

    /// Screen-space rectangle covered by the bar at `now`.
    pub fn rect(&self, now: Duration, width: f32, height: f32) -> Rect {
        let w = width * self.scale_at(now);
        let x = match self.anchor {
            Anchor::Left => 0.0,
            Anchor::Right => width - w,
        };
        let h = self.style.thickness;
        Rect::new(x, (height - h) * 0.5, w, h)
    }

    pub fn draw(&self, draw: &mut Draw2d, now: Duration, width: f32, height: f32) {
        let rect = self.rect(now, width, height);
        if rect.width > 0.0 {
            draw.rect(rect.x, rect.y, rect.width, rect.height, self.style.color);
        }
    }

    fn target(&self) -> (f32, Anchor) {
        match (self.transform, self.ended) {
            (Some(scale), _) => (scale, Anchor::Left),
            (None, true) => (0.0, Anchor::Right),
            (None, false) => (0.0, Anchor::Left),
        }
    }

    fn retarget(&mut self, now: Duration) {
        let current = self.scale_at(now);
        let (to, anchor) = self.target();
        let (duration, easing) = if self.ended {
            (self.style.exit, self.style.exit_easing)
        } else {
            (self.style.transition, self.style.easing)
        };
        self.anchor = anchor;
        self.scale = Tween::new(current, to, now, duration, easing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn starts_empty() {
        let bar = ProgressBar::new(ProgressBarStyle::default());
        assert_eq!(bar.progress(), None);
        assert_eq!(bar.scale_at(ms(0)), 0.0);
        assert!(!bar.is_ended());
    }

    #[test]
    fn fill_eases_instead_of_jumping() {
        let mut bar = ProgressBar::new(ProgressBarStyle::default());
        bar.set_progress(0.5, ms(0));
        assert_eq!(bar.transform(), Some(0.5));

        let mid = bar.scale_at(ms(250));
        assert!(mid > 0.0 && mid < 0.5);
        assert_eq!(bar.scale_at(ms(500)), 0.5);
    }

    #[test]
    fn retarget_starts_from_displayed_value() {
        let mut bar = ProgressBar::new(ProgressBarStyle::default());
        bar.set_progress(0.5, ms(0));
        let shown = bar.scale_at(ms(100));
        bar.set_progress(1.0, ms(100));
        assert_eq!(bar.scale_at(ms(100)), shown);
        assert_eq!(bar.scale_at(ms(600)), 1.0);
    }

    #[test]
    fn ending_too_early_flips_anchor_mid_fill() {
        let mut bar = ProgressBar::new(ProgressBarStyle::default());
        bar.set_progress(1.0, ms(0));
        let before = bar.rect(ms(100), 800.0, 600.0);

        bar.end(ms(100));
        let after = bar.rect(ms(100), 800.0, 600.0);

        // Same width, but now pinned to the right edge: a visible jump.
        assert_eq!(before.width, after.width);
        assert!(before.width < 800.0);
        assert_ne!(before.x, after.x);
    }

    #[test]
    fn ending_after_transition_is_seamless() {
        let mut bar = ProgressBar::new(ProgressBarStyle::default());
        bar.set_progress(1.0, ms(0));
        let before = bar.rect(ms(500), 800.0, 600.0);

        bar.end(ms(500));
        let after = bar.rect(ms(500), 800.0, 600.0);

        assert_eq!(before.x, after.x);
        assert_eq!(before.width, after.width);
        assert_eq!(bar.anchor(), Anchor::Right);
        assert_eq!(bar.transform(), None);
        assert_eq!(bar.scale_at(ms(2000)), 0.0);
        assert!(!bar.is_animating(ms(2000)));
    }

    #[test]
    fn bar_is_centered_vertically() {
        let mut bar = ProgressBar::new(ProgressBarStyle::default());
        bar.set_progress(1.0, ms(0));
        let r = bar.rect(ms(500), 800.0, 600.0);
        assert_eq!(r.y, 299.0);
        assert_eq!(r.height, 2.0);
    }
}
