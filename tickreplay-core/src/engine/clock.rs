//! Simulation clock with a forward-only cursor over the data timestamps.
//!
//! The cursor counts the data timestamps at or before the current clock time.
//! Because the clock only moves forward, both lookups below are O(1) and the
//! cursor advance is O(1) amortized per tick.

use crate::domain::Timestamp;

#[derive(Debug, Clone)]
pub struct SimulationClock {
    timestamps: Vec<Timestamp>,
    current: Timestamp,
    interval: i64,
    /// Number of data timestamps `<= current`.
    cursor: usize,
}

impl SimulationClock {
    /// `timestamps` must be sorted ascending without duplicates.
    pub fn new(timestamps: &[Timestamp], start: Timestamp, interval: i64) -> Self {
        debug_assert!(
            timestamps.windows(2).all(|w| w[0] < w[1]),
            "data timestamps must be strictly ascending"
        );
        let mut clock = Self {
            timestamps: timestamps.to_vec(),
            current: start,
            interval,
            cursor: 0,
        };
        clock.catch_up();
        clock
    }

    pub fn now(&self) -> Timestamp {
        self.current
    }

    /// Latest data timestamp at or before the clock.
    pub fn current_data_timestamp(&self) -> Option<Timestamp> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.timestamps[i])
    }

    /// First data timestamp strictly after the clock. New orders are stamped
    /// with it so they can never execute in the past.
    pub fn execution_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.get(self.cursor).copied()
    }

    /// Whether any data timestamp lies after the clock.
    pub fn has_future_data(&self) -> bool {
        self.cursor < self.timestamps.len()
    }

    /// Advance the clock by one interval.
    pub fn advance(&mut self) {
        self.current = self.current.saturating_add(self.interval);
        self.catch_up();
    }

    fn catch_up(&mut self) {
        while self
            .timestamps
            .get(self.cursor)
            .is_some_and(|&ts| ts <= self.current)
        {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_track_clock() {
        let mut clock = SimulationClock::new(&[100, 200, 300], 50, 50);
        assert_eq!(clock.current_data_timestamp(), None);
        assert_eq!(clock.execution_timestamp(), Some(100));

        clock.advance(); // 100
        assert_eq!(clock.current_data_timestamp(), Some(100));
        assert_eq!(clock.execution_timestamp(), Some(200));

        clock.advance(); // 150
        assert_eq!(clock.current_data_timestamp(), Some(100));
        assert_eq!(clock.execution_timestamp(), Some(200));

        clock.advance(); // 200
        clock.advance(); // 250
        clock.advance(); // 300
        assert_eq!(clock.current_data_timestamp(), Some(300));
        assert_eq!(clock.execution_timestamp(), None);
        assert!(!clock.has_future_data());
    }

    #[test]
    fn large_interval_skips_several_timestamps() {
        let mut clock = SimulationClock::new(&[1, 2, 3, 4, 10], 0, 5);
        clock.advance();
        assert_eq!(clock.current_data_timestamp(), Some(4));
        assert_eq!(clock.execution_timestamp(), Some(10));
    }

    #[test]
    fn start_inside_data() {
        let clock = SimulationClock::new(&[100, 200, 300], 200, 10);
        assert_eq!(clock.current_data_timestamp(), Some(200));
        assert_eq!(clock.execution_timestamp(), Some(300));
    }
}
