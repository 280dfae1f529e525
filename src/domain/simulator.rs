//! Usage: Synthetic notification generator (stand-in for a real push-event source).

use crate::domain::notifications::NotificationCategory;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_EMIT_PROBABILITY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: &'static str,
    pub message: &'static str,
    pub category: NotificationCategory,
}

pub static TEMPLATE_CATALOG: [NotificationTemplate; 4] = [
    NotificationTemplate {
        title: "Traffic Update",
        message: "Light traffic on your route to downtown",
        category: NotificationCategory::Trip,
    },
    NotificationTemplate {
        title: "Weather Alert",
        message: "Rain expected in 30 minutes",
        category: NotificationCategory::General,
    },
    NotificationTemplate {
        title: "Ride Update",
        message: "Your driver is 5 minutes away",
        category: NotificationCategory::Ride,
    },
    NotificationTemplate {
        title: "Ticket Reminder",
        message: "Check-in opens in 1 hour",
        category: NotificationCategory::Ticket,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticNotifications {
    interval: Duration,
    probability: f64,
}

impl Default for SyntheticNotifications {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL, DEFAULT_EMIT_PROBABILITY)
    }
}

impl SyntheticNotifications {
    pub fn new(interval: Duration, probability: f64) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_EMIT_PROBABILITY
        };
        Self {
            interval: interval.max(Duration::from_millis(1)),
            probability,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// One tick: a template with probability `probability`, otherwise nothing.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> Option<&'static NotificationTemplate> {
        let draw: f64 = rng.gen();
        if draw >= self.probability {
            return None;
        }
        let idx = rng.gen_range(0..TEMPLATE_CATALOG.len());
        Some(&TEMPLATE_CATALOG[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn defaults_are_thirty_seconds_and_ten_percent() {
        let generator = SyntheticNotifications::default();
        assert_eq!(generator.interval(), Duration::from_secs(30));
        assert_eq!(generator.probability(), 0.1);
    }

    #[test]
    fn zero_probability_never_emits() {
        let generator = SyntheticNotifications::new(DEFAULT_TICK_INTERVAL, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..1_000).all(|_| generator.roll(&mut rng).is_none()));
    }

    #[test]
    fn certain_probability_always_emits_and_covers_catalog() {
        let generator = SyntheticNotifications::new(DEFAULT_TICK_INTERVAL, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut titles = HashSet::new();
        for _ in 0..200 {
            let template = generator.roll(&mut rng).expect("always emits");
            titles.insert(template.title);
        }
        assert_eq!(titles.len(), TEMPLATE_CATALOG.len());
    }

    #[test]
    fn default_probability_emits_roughly_one_in_ten() {
        let generator = SyntheticNotifications::default();
        let mut rng = StdRng::seed_from_u64(42);
        let hits = (0..10_000)
            .filter(|_| generator.roll(&mut rng).is_some())
            .count();
        assert!((800..1_200).contains(&hits), "hits={hits}");
    }

    #[test]
    fn out_of_range_parameters_are_clamped() {
        let generator = SyntheticNotifications::new(Duration::ZERO, 4.0);
        assert_eq!(generator.probability(), 1.0);
        assert!(generator.interval() > Duration::ZERO);
        assert_eq!(
            SyntheticNotifications::new(DEFAULT_TICK_INTERVAL, f64::NAN).probability(),
            DEFAULT_EMIT_PROBABILITY
        );
    }

    #[test]
    fn catalog_categories_match_event_kinds() {
        let categories: Vec<NotificationCategory> =
            TEMPLATE_CATALOG.iter().map(|t| t.category).collect();
        assert_eq!(
            categories,
            vec![
                NotificationCategory::Trip,
                NotificationCategory::General,
                NotificationCategory::Ride,
                NotificationCategory::Ticket,
            ]
        );
    }
}
