//! System clock and pass id generation.

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::ports::{Clock, IdGenerator};

/// Hex digits kept from a random UUID for a pass id.
const PASS_ID_LEN: usize = 12;

/// Wall clock, truncated to whole milliseconds so report timestamps stay short.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Generates short random pass ids such as `3f9c0a7d12be`.
#[derive(Debug, Default)]
pub struct PassIdGenerator;

impl IdGenerator for PassIdGenerator {
    fn generate_id(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(PASS_ID_LEN);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_current_to_the_millisecond() {
        let before = Utc::now().trunc_subsecs(3);
        let now = SystemClock.now();
        assert!(now >= before);
        assert!(now <= Utc::now());
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn pass_ids_are_short_hex_and_distinct() {
        let a = PassIdGenerator.generate_id();
        let b = PassIdGenerator.generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), PASS_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
