use std::collections::VecDeque;

use super::LoadProgress;

/// A session-level notification produced by [`LoadingManager`].
#[derive(Clone, Debug, PartialEq)]
pub enum LoadEvent {
    /// One load settled (successfully or not).
    Progress {
        url: String,
        loaded: u32,
        total: u32,
    },
    /// One load failed. Always followed by the matching `Progress`.
    Error { url: String, message: String },
    /// Every registered load has settled. Emitted at most once per session.
    AllLoaded,
}

/// Aggregates per-asset start/end/error notifications into session events.
///
/// Loads are registered with [`item_start`](Self::item_start) and settled
/// with [`item_end`](Self::item_end) or [`item_error`](Self::item_error).
/// Events queue up until the owner drains them, which keeps every consumer
/// on the thread that owns the manager.
///
/// A load registered from inside another load's completion handler (before
/// that load's `item_end`) keeps the session open, so chained loads never
/// trigger a premature [`LoadEvent::AllLoaded`].
#[derive(Debug, Default)]
pub struct LoadingManager {
    progress: LoadProgress,
    sealed: bool,
    finished: bool,
    events: VecDeque<LoadEvent>,
}

impl LoadingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    /// True once [`LoadEvent::AllLoaded`] has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Register a load.
    pub fn item_start(&mut self, url: &str) {
        if self.finished {
            log::warn!("'{url}' registered after the loading session finished");
        }
        self.progress.total += 1;
        log::debug!(
            "loading '{url}' ({}/{})",
            self.progress.loaded,
            self.progress.total
        );
    }

    /// Settle a load successfully.
    pub fn item_end(&mut self, url: &str) {
        if self.progress.loaded >= self.progress.total {
            log::warn!("'{url}' settled without a matching item_start");
            return;
        }
        self.progress.loaded += 1;
        self.events.push_back(LoadEvent::Progress {
            url: url.to_string(),
            loaded: self.progress.loaded,
            total: self.progress.total,
        });
        self.finish_if_settled();
    }

    /// Settle a load that failed. It still counts toward completion.
    pub fn item_error(&mut self, url: &str, message: impl Into<String>) {
        self.events.push_back(LoadEvent::Error {
            url: url.to_string(),
            message: message.into(),
        });
        self.item_end(url);
    }

    /// Mark the initial registrations as done.
    ///
    /// Emits [`LoadEvent::AllLoaded`] right away when nothing was registered,
    /// or when everything registered so far has already settled.
    pub fn seal(&mut self) {
        self.sealed = true;
        if self.progress.total == 0 && !self.finished {
            self.finished = true;
            self.events.push_back(LoadEvent::AllLoaded);
        } else {
            self.finish_if_settled();
        }
    }

    /// Take every queued event in emission order.
    pub fn drain_events(&mut self) -> impl Iterator<Item = LoadEvent> + '_ {
        self.events.drain(..)
    }

    fn finish_if_settled(&mut self) {
        if self.sealed && !self.finished && self.progress.is_complete() {
            self.finished = true;
            self.events.push_back(LoadEvent::AllLoaded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(m: &mut LoadingManager) -> Vec<LoadEvent> {
        m.drain_events().collect()
    }

    fn progress(url: &str, loaded: u32, total: u32) -> LoadEvent {
        LoadEvent::Progress {
            url: url.to_string(),
            loaded,
            total,
        }
    }

    #[test]
    fn progress_then_all_loaded() {
        let mut m = LoadingManager::new();
        m.item_start("a");
        m.item_start("b");
        m.seal();
        m.item_end("a");
        m.item_end("b");

        assert_eq!(
            drain(&mut m),
            vec![progress("a", 1, 2), progress("b", 2, 2), LoadEvent::AllLoaded]
        );
        assert!(m.is_finished());
    }

    #[test]
    fn errors_count_toward_settlement() {
        let mut m = LoadingManager::new();
        m.item_start("env.hdr");
        m.item_start("helmet.glb");
        m.seal();
        m.item_error("env.hdr", "404");
        m.item_end("helmet.glb");

        let events = drain(&mut m);
        assert_eq!(
            events,
            vec![
                LoadEvent::Error {
                    url: "env.hdr".into(),
                    message: "404".into()
                },
                progress("env.hdr", 1, 2),
                progress("helmet.glb", 2, 2),
                LoadEvent::AllLoaded,
            ]
        );
    }

    #[test]
    fn chained_load_keeps_session_open() {
        let mut m = LoadingManager::new();
        m.item_start("env.hdr");
        m.seal();

        // The environment's completion handler registers the model first.
        m.item_start("helmet.glb");
        m.item_end("env.hdr");
        assert!(!m.is_finished());

        m.item_end("helmet.glb");
        let events = drain(&mut m);
        assert_eq!(events.last(), Some(&LoadEvent::AllLoaded));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, LoadEvent::AllLoaded))
                .count(),
            1
        );
    }

    #[test]
    fn nothing_before_seal() {
        let mut m = LoadingManager::new();
        m.item_start("a");
        m.item_end("a");
        assert_eq!(drain(&mut m), vec![progress("a", 1, 1)]);

        m.seal();
        assert_eq!(drain(&mut m), vec![LoadEvent::AllLoaded]);
    }

    #[test]
    fn empty_session_finishes_on_seal() {
        let mut m = LoadingManager::new();
        m.seal();
        assert_eq!(drain(&mut m), vec![LoadEvent::AllLoaded]);

        m.seal();
        assert!(drain(&mut m).is_empty());
    }

    #[test]
    fn unmatched_end_is_ignored() {
        let mut m = LoadingManager::new();
        m.seal();
        drain(&mut m);
        m.item_end("ghost");
        assert!(drain(&mut m).is_empty());
        assert_eq!(m.progress(), LoadProgress::new(0, 0));
    }
}
