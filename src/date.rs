//! Dates as 100-nanosecond ticks since 0001-01-01 (the .NET `DateTime` epoch).
//!
//! The top two bits of the 64-bit wire value are the .NET "kind" bits; they are always written
//! as zero and masked off on read.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Ticks between 0001-01-01T00:00:00 and the Unix epoch.
pub const TICKS_BETWEEN_EPOCHS: u64 = 621_355_968_000_000_000;

/// Mask selecting the 62 tick bits.
pub const DATE_MASK: u64 = 0x3fff_ffff_ffff_ffff;

pub const TICKS_PER_MILLISECOND: u64 = 10_000;

/// A point in time with 100 ns resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Date {
    ticks: u64,
}

impl Date {
    pub const UNIX_EPOCH: Date = Date { ticks: TICKS_BETWEEN_EPOCHS };

    /// Build from a tick count. Kind bits are dropped.
    pub const fn from_ticks(ticks: u64) -> Self {
        Date { ticks: ticks & DATE_MASK }
    }

    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Milliseconds since the Unix epoch (negative before 1970).
    pub fn from_unix_millis(ms: i64) -> Self {
        let ticks = (ms as i128) * TICKS_PER_MILLISECOND as i128 + TICKS_BETWEEN_EPOCHS as i128;
        Date::from_ticks(ticks.clamp(0, DATE_MASK as i128) as u64)
    }

    /// Milliseconds since the Unix epoch, truncated toward zero.
    pub fn to_unix_millis(&self) -> i64 {
        let delta = self.ticks as i128 - TICKS_BETWEEN_EPOCHS as i128;
        (delta / TICKS_PER_MILLISECOND as i128) as i64
    }

    pub fn from_system_time(t: SystemTime) -> Self {
        let ticks = match t.duration_since(UNIX_EPOCH) {
            Ok(after) => TICKS_BETWEEN_EPOCHS as i128 + (after.as_nanos() / 100) as i128,
            Err(e) => TICKS_BETWEEN_EPOCHS as i128 - (e.duration().as_nanos() / 100) as i128,
        };
        Date::from_ticks(ticks.clamp(0, DATE_MASK as i128) as u64)
    }

    pub fn to_system_time(&self) -> SystemTime {
        if self.ticks >= TICKS_BETWEEN_EPOCHS {
            UNIX_EPOCH + ticks_to_duration(self.ticks - TICKS_BETWEEN_EPOCHS)
        } else {
            UNIX_EPOCH - ticks_to_duration(TICKS_BETWEEN_EPOCHS - self.ticks)
        }
    }
}

fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::new(ticks / 10_000_000, ((ticks % 10_000_000) * 100) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_is_offset() {
        assert_eq!(Date::from_unix_millis(0).ticks(), TICKS_BETWEEN_EPOCHS);
        assert_eq!(Date::UNIX_EPOCH.to_unix_millis(), 0);
    }

    #[test]
    fn kind_bits_are_dropped() {
        let d = Date::from_ticks(0xC000_0000_0000_0000 | 12345);
        assert_eq!(d.ticks(), 12345);
    }

    #[test]
    fn millis_roundtrip() {
        // 2023-01-01T00:00:00Z
        let ms = 1_672_531_200_000;
        assert_eq!(Date::from_unix_millis(ms).to_unix_millis(), ms);
        assert_eq!(Date::from_unix_millis(-86_400_000).to_unix_millis(), -86_400_000);
    }

    #[test]
    fn system_time_roundtrip() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(Date::from_system_time(t).to_system_time(), t);
        let before = UNIX_EPOCH - Duration::from_secs(3600);
        assert_eq!(Date::from_system_time(before).to_system_time(), before);
    }
}
