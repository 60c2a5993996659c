//! Travel time estimates between locations.

use std::collections::HashMap;

/// Estimates how long a train of a category takes between two locations.
pub trait TravelTimeEstimator {
    /// Estimated travel time in seconds, or `None` if unknown.
    fn estimate(&self, category: &str, from: &str, to: &str) -> Option<i64>;
}

/// Estimator learning from observed runs.
///
/// Keeps the shortest travel time seen per category and location pair.
/// When a category has never run between two locations, the shortest time
/// of any category is used.
#[derive(Debug, Clone, Default)]
pub struct ObservedTravelTimes {
    shortest: HashMap<(String, String, String), i64>,
}

impl ObservedTravelTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observed run. Non-positive durations are ignored.
    pub fn record(&mut self, category: &str, from: &str, to: &str, seconds: i64) {
        if seconds <= 0 {
            return;
        }
        self.shortest
            .entry((category.to_string(), from.to_string(), to.to_string()))
            .and_modify(|s| *s = (*s).min(seconds))
            .or_insert(seconds);
    }

    /// Number of distinct (category, from, to) combinations observed.
    pub fn len(&self) -> usize {
        self.shortest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortest.is_empty()
    }
}

impl TravelTimeEstimator for ObservedTravelTimes {
    fn estimate(&self, category: &str, from: &str, to: &str) -> Option<i64> {
        let key = (category.to_string(), from.to_string(), to.to_string());
        if let Some(seconds) = self.shortest.get(&key) {
            return Some(*seconds);
        }
        self.shortest
            .iter()
            .filter(|((_, f, t), _)| f == from && t == to)
            .map(|(_, seconds)| *seconds)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_shortest_observation() {
        let mut times = ObservedTravelTimes::new();
        times.record("RE", "Nord", "1", 240);
        times.record("RE", "Nord", "1", 180);
        times.record("RE", "Nord", "1", 300);

        assert_eq!(times.estimate("RE", "Nord", "1"), Some(180));
        assert_eq!(times.len(), 1);
    }

    #[test]
    fn falls_back_to_any_category() {
        let mut times = ObservedTravelTimes::new();
        times.record("ICE", "Nord", "1", 120);
        times.record("S", "Nord", "1", 200);

        assert_eq!(times.estimate("RE", "Nord", "1"), Some(120));
        assert_eq!(times.estimate("S", "Nord", "1"), Some(200));
        assert_eq!(times.estimate("RE", "1", "Nord"), None);
    }

    #[test]
    fn ignores_non_positive_durations() {
        let mut times = ObservedTravelTimes::new();
        times.record("RE", "Nord", "1", 0);
        times.record("RE", "Nord", "1", -60);

        assert!(times.is_empty());
    }
}
