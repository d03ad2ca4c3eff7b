use std::time::Duration;

use super::progress_bar::{DEFAULT_BAR_TRANSITION, ProgressBar};
use super::tween::{Deferred, Easing, Tween};
use super::{LoadEvent, LoadProgress};

/// Default duration of the overlay fade once every asset has settled.
pub const DEFAULT_OVERLAY_FADE: Duration = Duration::from_secs(3);

/// Where the reveal sequence currently stands.
///
/// Moves strictly forward: `Loading → AllAssetsFetched → TransitionStarted → Revealed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RevealState {
    Loading,
    AllAssetsFetched,
    TransitionStarted,
    Revealed,
}

/// Timing contract between the coordinator and the visuals it drives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevealTiming {
    /// Wait between the last load settling and ending the progress bar.
    ///
    /// Must match the bar's own fill transition, otherwise ending the bar
    /// cuts that transition short and the bar visibly snaps.
    pub bar_grace_delay: Duration,
    /// Length of the overlay opacity fade.
    pub overlay_fade: Duration,
    pub overlay_easing: Easing,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            bar_grace_delay: DEFAULT_BAR_TRANSITION,
            overlay_fade: DEFAULT_OVERLAY_FADE,
            overlay_easing: Easing::EaseOut,
        }
    }
}

/// The visuals a [`LoadingCoordinator`] drives.
pub trait RevealSurface {
    /// Publish a progress ratio in `[0, 1]`.
    fn publish_progress(&mut self, ratio: f32, now: Duration);
    /// Mark the progress indicator as ended and drop its explicit transform.
    fn end_progress(&mut self, now: Duration);
    /// Current opacity of the dimming overlay.
    fn overlay_alpha(&self) -> f32;
    fn set_overlay_alpha(&mut self, alpha: f32);
    /// False while the progress indicator is still visibly moving.
    fn progress_settled(&self, _now: Duration) -> bool {
        true
    }
}

/// The progress bar and overlay opacity shown while the scene loads.
#[derive(Clone, Debug)]
pub struct LoadingScreen {
    pub bar: ProgressBar,
    pub overlay_alpha: f32,
}

impl LoadingScreen {
    pub fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            overlay_alpha: 1.0,
        }
    }
}

impl RevealSurface for LoadingScreen {
    fn publish_progress(&mut self, ratio: f32, now: Duration) {
        self.bar.set_progress(ratio, now);
    }

    fn end_progress(&mut self, now: Duration) {
        self.bar.end(now);
    }

    fn overlay_alpha(&self) -> f32 {
        self.overlay_alpha
    }

    fn set_overlay_alpha(&mut self, alpha: f32) {
        self.overlay_alpha = alpha;
    }

    fn progress_settled(&self, now: Duration) -> bool {
        !self.bar.is_animating(now)
    }
}

/// Hides the scene while assets load and reveals it without a visible jump.
///
/// Once every load has settled the coordinator starts two things at the same
/// instant:
/// - a fade of the overlay opacity to zero
/// - a deferred callback that ends the progress bar after
///   [`RevealTiming::bar_grace_delay`]
///
/// Ending the bar is deferred so that its last fill transition finishes
/// before its transform override is cleared.
#[derive(Debug)]
pub struct LoadingCoordinator {
    timing: RevealTiming,
    state: RevealState,
    progress: LoadProgress,
    fade: Option<Tween>,
    bar_end: Option<Deferred>,
}

impl LoadingCoordinator {
    pub fn new(timing: RevealTiming) -> Self {
        Self {
            timing,
            state: RevealState::Loading,
            progress: LoadProgress::default(),
            fade: None,
            bar_end: None,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    pub fn timing(&self) -> &RevealTiming {
        &self.timing
    }

    /// Dispatch one event from the loading manager.
    pub fn handle(&mut self, event: LoadEvent, now: Duration, surface: &mut impl RevealSurface) {
        match event {
            LoadEvent::Progress { url, loaded, total } => {
                self.on_progress(&url, loaded, total, now, surface)
            }
            LoadEvent::Error { url, message } => self.on_load_error(&url, &message),
            LoadEvent::AllLoaded => self.on_all_loaded(now, surface),
        }
    }

    pub fn on_progress(
        &mut self,
        url: &str,
        loaded: u32,
        total: u32,
        now: Duration,
        surface: &mut impl RevealSurface,
    ) {
        self.progress = LoadProgress::new(loaded.min(total), total);
        let Some(ratio) = self.progress.ratio() else {
            return;
        };
        log::debug!("progress {loaded}/{total} after '{url}'");
        surface.publish_progress(ratio, now);

        if loaded == total {
            log::info!("All assets loaded");
        }
    }

    pub fn on_load_error(&mut self, url: &str, message: &str) {
        log::error!("Error with loading '{url}': {message}");
    }

    /// Start the reveal. Calls after the first are ignored.
    pub fn on_all_loaded(&mut self, now: Duration, surface: &mut impl RevealSurface) {
        if self.state != RevealState::Loading {
            log::debug!("ignoring repeated all-loaded notification");
            return;
        }

        self.fade = Some(Tween::new(
            surface.overlay_alpha(),
            0.0,
            now,
            self.timing.overlay_fade,
            self.timing.overlay_easing,
        ));
        self.bar_end = Some(Deferred::after(now, self.timing.bar_grace_delay));
        self.set_state(RevealState::AllAssetsFetched);
    }

    /// Advance the fade and the deferred bar callback to `now`.
    ///
    /// The session counts as revealed once the fade is over and the bar has
    /// finished its exit.
    pub fn update(&mut self, now: Duration, surface: &mut impl RevealSurface) {
        if self.state < RevealState::Revealed {
            if let Some(fade) = &self.fade {
                surface.set_overlay_alpha(fade.value_at(now));
            }
        }

        if self.bar_end.as_mut().is_some_and(|d| d.poll(now)) {
            surface.end_progress(now);
            self.set_state(RevealState::TransitionStarted);
        }

        let fade_done = self.fade.is_some_and(|f| f.is_finished(now));
        let bar_done =
            self.bar_end.is_some_and(|d| d.has_fired()) && surface.progress_settled(now);
        if self.state == RevealState::TransitionStarted && fade_done && bar_done {
            self.set_state(RevealState::Revealed);
        }
    }

    fn set_state(&mut self, next: RevealState) {
        debug_assert!(next > self.state, "{:?} -> {next:?}", self.state);
        log::info!("reveal: {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::LoadingManager;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Records every call so tests can check order and timing.
    #[derive(Default)]
    struct Recorder {
        published: Vec<(f32, Duration)>,
        ended_at: Vec<Duration>,
        alpha: f32,
        alpha_history: Vec<f32>,
    }

    impl RevealSurface for Recorder {
        fn publish_progress(&mut self, ratio: f32, now: Duration) {
            self.published.push((ratio, now));
        }

        fn end_progress(&mut self, now: Duration) {
            self.ended_at.push(now);
        }

        fn overlay_alpha(&self) -> f32 {
            self.alpha
        }

        fn set_overlay_alpha(&mut self, alpha: f32) {
            self.alpha = alpha;
            self.alpha_history.push(alpha);
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            alpha: 1.0,
            ..Default::default()
        }
    }

    fn pump(
        manager: &mut LoadingManager,
        coordinator: &mut LoadingCoordinator,
        now: Duration,
        surface: &mut Recorder,
    ) {
        let events: Vec<_> = manager.drain_events().collect();
        for event in events {
            coordinator.handle(event, now, surface);
        }
        coordinator.update(now, surface);
    }

    #[test]
    fn three_assets_one_failing() {
        let mut manager = LoadingManager::new();
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut surface = recorder();

        for url in ["env.hdr", "helmet.glb", "normal.png"] {
            manager.item_start(url);
        }
        manager.seal();

        manager.item_end("env.hdr");
        pump(&mut manager, &mut coordinator, ms(0), &mut surface);
        manager.item_error("normal.png", "not found");
        pump(&mut manager, &mut coordinator, ms(10), &mut surface);
        manager.item_end("helmet.glb");
        pump(&mut manager, &mut coordinator, ms(20), &mut surface);

        assert_eq!(
            surface.published,
            vec![(1.0 / 3.0, ms(0)), (2.0 / 3.0, ms(10)), (1.0, ms(20))]
        );
        assert_eq!(coordinator.state(), RevealState::AllAssetsFetched);

        // Not at the moment everything settled, and not a millisecond early.
        assert!(surface.ended_at.is_empty());
        pump(&mut manager, &mut coordinator, ms(519), &mut surface);
        assert!(surface.ended_at.is_empty());

        pump(&mut manager, &mut coordinator, ms(520), &mut surface);
        assert_eq!(surface.ended_at, vec![ms(520)]);
        assert_eq!(coordinator.state(), RevealState::TransitionStarted);

        pump(&mut manager, &mut coordinator, ms(3019), &mut surface);
        assert!(surface.alpha > 0.0);
        assert_eq!(coordinator.state(), RevealState::TransitionStarted);

        pump(&mut manager, &mut coordinator, ms(3020), &mut surface);
        assert_eq!(surface.alpha, 0.0);
        assert_eq!(coordinator.state(), RevealState::Revealed);

        pump(&mut manager, &mut coordinator, ms(5000), &mut surface);
        assert_eq!(surface.ended_at.len(), 1);
    }

    #[test]
    fn opacity_falls_monotonically() {
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut surface = recorder();
        coordinator.on_all_loaded(ms(20), &mut surface);

        for t in (20..=3100).step_by(16) {
            coordinator.update(ms(t), &mut surface);
        }

        assert_eq!(surface.alpha_history.first(), Some(&1.0));
        assert!(
            surface
                .alpha_history
                .windows(2)
                .all(|pair| pair[1] <= pair[0])
        );
        assert_eq!(surface.alpha, 0.0);
    }

    #[test]
    fn repeated_all_loaded_does_not_restart_the_fade() {
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut surface = recorder();

        coordinator.on_all_loaded(ms(0), &mut surface);
        coordinator.update(ms(500), &mut surface);
        coordinator.update(ms(1000), &mut surface);
        let mid = surface.alpha;

        coordinator.on_all_loaded(ms(1000), &mut surface);
        coordinator.update(ms(1000), &mut surface);
        assert_eq!(surface.alpha, mid);

        coordinator.update(ms(3000), &mut surface);
        assert_eq!(surface.alpha, 0.0);
        assert_eq!(surface.ended_at, vec![ms(500)]);
    }

    #[test]
    fn empty_session_reveals_without_a_ratio() {
        let mut manager = LoadingManager::new();
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut surface = recorder();

        manager.seal();
        pump(&mut manager, &mut coordinator, ms(0), &mut surface);
        assert!(surface.published.is_empty());
        assert_eq!(coordinator.state(), RevealState::AllAssetsFetched);

        pump(&mut manager, &mut coordinator, ms(3000), &mut surface);
        assert_eq!(coordinator.state(), RevealState::Revealed);
        assert_eq!(surface.alpha, 0.0);
    }

    #[test]
    fn zero_total_progress_is_suppressed() {
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut surface = recorder();
        coordinator.on_progress("nothing", 0, 0, ms(0), &mut surface);
        assert!(surface.published.is_empty());
        assert_eq!(coordinator.state(), RevealState::Loading);
    }

    #[test]
    fn errors_do_not_change_state() {
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        coordinator.on_load_error("env.hdr", "bad header");
        assert_eq!(coordinator.state(), RevealState::Loading);
    }

    #[test]
    fn grace_delay_is_configurable() {
        let timing = RevealTiming {
            bar_grace_delay: ms(1200),
            ..RevealTiming::default()
        };
        let mut coordinator = LoadingCoordinator::new(timing);
        let mut surface = recorder();

        coordinator.on_all_loaded(ms(100), &mut surface);
        coordinator.update(ms(1299), &mut surface);
        assert!(surface.ended_at.is_empty());
        coordinator.update(ms(1300), &mut surface);
        assert_eq!(surface.ended_at, vec![ms(1300)]);
    }

    #[test]
    fn drives_the_real_loading_screen() {
        let mut coordinator = LoadingCoordinator::new(RevealTiming::default());
        let mut screen = LoadingScreen::new(ProgressBar::new(Default::default()));

        coordinator.on_progress("a", 1, 1, ms(0), &mut screen);
        coordinator.on_all_loaded(ms(0), &mut screen);
        coordinator.update(ms(500), &mut screen);

        assert!(screen.bar.is_ended());
        assert_eq!(screen.bar.transform(), None);
        assert_eq!(screen.bar.progress(), Some(1.0));
        assert!(screen.overlay_alpha < 1.0);
    }

    #[test]
    fn short_fade_waits_for_the_bar_exit() {
        let timing = RevealTiming {
            overlay_fade: ms(1000),
            ..RevealTiming::default()
        };
        let mut coordinator = LoadingCoordinator::new(timing);
        let mut screen = LoadingScreen::new(ProgressBar::new(Default::default()));

        coordinator.on_progress("a", 1, 1, ms(0), &mut screen);
        coordinator.on_all_loaded(ms(0), &mut screen);
        coordinator.update(ms(500), &mut screen);
        coordinator.update(ms(1000), &mut screen);
        assert_eq!(screen.overlay_alpha, 0.0);
        assert_eq!(coordinator.state(), RevealState::TransitionStarted);

        // ended at 500 ms, exit runs 1.5 s
        coordinator.update(ms(1999), &mut screen);
        assert_eq!(coordinator.state(), RevealState::TransitionStarted);
        coordinator.update(ms(2000), &mut screen);
        assert_eq!(coordinator.state(), RevealState::Revealed);
    }
}
