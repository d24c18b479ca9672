use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    BetweenListings,
    BetweenPages,
    BetweenCatalogs,
}

/// Random politeness delays, in milliseconds.
#[derive(Debug, Clone)]
pub struct Pacer {
    listing_ms: RangeInclusive<u64>,
    page_ms: RangeInclusive<u64>,
    catalog_ms: RangeInclusive<u64>,
    enabled: bool,
}

impl Default for Pacer {
    fn default() -> Self {
        Self {
            listing_ms: 1_000..=3_000,
            page_ms: 3_000..=6_000,
            catalog_ms: 8_000..=15_000,
            enabled: true,
        }
    }
}

impl Pacer {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, pause: Pause) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        let range = match pause {
            Pause::BetweenListings => &self.listing_ms,
            Pause::BetweenPages => &self.page_ms,
            Pause::BetweenCatalogs => &self.catalog_ms,
        };
        Duration::from_millis(rand::thread_rng().gen_range(range.clone()))
    }

    pub fn pause(&self, pause: Pause) {
        let delay = self.delay_for(pause);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}
