/// Counts of settled and registered asset loads for one session.
///
/// `loaded` never exceeds `total`. A failed load counts as settled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u32,
    pub total: u32,
}

impl LoadProgress {
    pub fn new(loaded: u32, total: u32) -> Self {
        debug_assert!(loaded <= total, "loaded ({loaded}) exceeds total ({total})");
        Self {
            loaded: loaded.min(total),
            total,
        }
    }

    /// Fraction of settled loads, or `None` while nothing is registered.
    pub fn ratio(&self) -> Option<f32> {
        if self.total == 0 {
            None
        } else {
            Some(self.loaded as f32 / self.total as f32)
        }
    }

    /// True once every registered load has settled.
    ///
    /// An empty session is never complete on its own; see
    /// [`LoadingManager::seal`](super::LoadingManager::seal).
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.loaded == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_session_has_no_ratio() {
        let p = LoadProgress::new(0, 0);
        assert_eq!(p.ratio(), None);
        assert!(!p.is_complete());
    }

    #[test]
    fn thirds() {
        assert_eq!(LoadProgress::new(1, 3).ratio(), Some(1.0 / 3.0));
        assert_eq!(LoadProgress::new(2, 3).ratio(), Some(2.0 / 3.0));
        assert_eq!(LoadProgress::new(3, 3).ratio(), Some(1.0));
        assert!(LoadProgress::new(3, 3).is_complete());
    }

    proptest! {
        #[test]
        fn ratio_is_exact_quotient(total in 1u32..10_000, pick in 0u32..10_000) {
            let loaded = pick % (total + 1);
            let ratio = LoadProgress::new(loaded, total).ratio().unwrap();
            prop_assert_eq!(ratio, loaded as f32 / total as f32);
            prop_assert!((0.0..=1.0).contains(&ratio));
            prop_assert!(!ratio.is_nan());
        }
    }
}
