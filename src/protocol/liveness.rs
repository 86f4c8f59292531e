use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::Address;

/// Last-seen timestamps per destination. An address is refreshed whenever it
/// appears as a key in any received update's distance map, regardless of who
/// sent the update.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    last_seen: HashMap<Address, DateTime<Utc>>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, addr: Address, now: DateTime<Utc>) {
        self.last_seen.insert(addr, now);
    }

    pub fn is_tracked(&self, addr: &Address) -> bool {
        self.last_seen.contains_key(addr)
    }

    /// Drop and return every address whose last mention is older than
    /// `dead_after`.
    pub fn expire(&mut self, now: DateTime<Utc>, dead_after: Duration) -> Vec<Address> {
        let dead_secs = dead_after.as_secs() as i64;
        let dead: Vec<Address> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.signed_duration_since(**seen).num_seconds() > dead_secs)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &dead {
            self.last_seen.remove(addr);
        }
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn expire_returns_only_stale_addresses() {
        let mut tracker = LivenessTracker::new();
        let now = Utc::now();
        let fresh = addr("10.0.0.2");
        let stale = addr("10.0.0.3");

        tracker.touch(fresh, now - chrono::Duration::seconds(5));
        tracker.touch(stale, now - chrono::Duration::seconds(45));

        let dead = tracker.expire(now, Duration::from_secs(20));
        assert_eq!(dead, vec![stale]);
        assert!(tracker.is_tracked(&fresh));
        assert!(!tracker.is_tracked(&stale));
    }

    #[test]
    fn re_touching_resets_the_clock() {
        let mut tracker = LivenessTracker::new();
        let now = Utc::now();
        let b = addr("10.0.0.2");

        tracker.touch(b, now - chrono::Duration::seconds(45));
        tracker.touch(b, now);

        assert!(tracker.expire(now, Duration::from_secs(20)).is_empty());
        assert!(tracker.is_tracked(&b));
    }
}
