//! Monotonic server clock used to resolve timestamp sentinels.

use crate::model::value::Timestamp;
use std::sync::Mutex;

/// Issues strictly increasing timestamps for one store instance.
#[derive(Debug, Default)]
pub struct ServerClock {
    last: Mutex<Option<Timestamp>>,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next commit timestamp.
    pub fn issue(&self) -> Timestamp {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let issued = next_after(*last, Timestamp::now());
        *last = Some(issued);
        issued
    }
}

/// Wall-clock reading, bumped past `last` when the clock stalls or steps back.
pub fn next_after(last: Option<Timestamp>, now: Timestamp) -> Timestamp {
    match last {
        Some(last) if now <= last => last.next_tick(),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::{next_after, ServerClock};
    use crate::model::value::Timestamp;

    #[test]
    fn next_after_bumps_when_clock_goes_backwards() {
        let last = Timestamp::new(100, 5);
        assert_eq!(next_after(Some(last), Timestamp::new(99, 0)), Timestamp::new(100, 6));
        assert_eq!(next_after(Some(last), last), Timestamp::new(100, 6));
        assert_eq!(next_after(Some(last), Timestamp::new(101, 0)), Timestamp::new(101, 0));
        assert_eq!(next_after(None, Timestamp::new(7, 0)), Timestamp::new(7, 0));
    }

    #[test]
    fn issue_is_strictly_increasing() {
        let clock = ServerClock::new();
        let mut previous = clock.issue();
        for _ in 0..1_000 {
            let current = clock.issue();
            assert!(current > previous);
            previous = current;
        }
    }
}
