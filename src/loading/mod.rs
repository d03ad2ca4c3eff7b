//! Loading session bookkeeping and the reveal sequence.
//!
//! ```text
//! AssetLoader ──item_start/end/error──▶ LoadingManager ──LoadEvent──▶ LoadingCoordinator
//!                                                                       │
//!                                               ┌───────────────────────┴──────────┐
//!                                               ▼                                  ▼
//!                                     ProgressBar (--progress, ended)     overlay alpha (tween)
//! ```
//!
//! Everything here is driven by an explicit `now: Duration` so the whole
//! sequence can be replayed deterministically without a window or GPU.

mod coordinator;
mod manager;
mod progress;
mod progress_bar;
mod tween;

pub use coordinator::{
    DEFAULT_OVERLAY_FADE, LoadingCoordinator, LoadingScreen, RevealState, RevealSurface,
    RevealTiming,
};
pub use manager::{LoadEvent, LoadingManager};
pub use progress::LoadProgress;
pub use progress_bar::{Anchor, DEFAULT_BAR_EXIT, DEFAULT_BAR_TRANSITION, ProgressBar, ProgressBarStyle};
pub use tween::{Deferred, Easing, Tween};
