//! Core save identity types
//!
//! A save on disk is identified by three things: the nickname of the slot it
//! belongs to, the tick it was taken at, and its file extension. Everything
//! else (path, payload) is derived from that identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Number of ticks in one second (one tick is 100 nanoseconds)
pub const TICKS_PER_SECOND: u64 = 10_000_000;

const NANOS_PER_TICK: u64 = 100;

/// Tick value of 1970-01-01T00:00:00Z
pub const UNIX_EPOCH_TICKS: u64 = 621_355_968_000_000_000;

/// Integer clock value embedded in a save file name
///
/// Ticks count 100 ns intervals since 0001-01-01T00:00:00Z. The encoded tick
/// is the authoritative ordering key for saves; filesystem modification
/// times are never consulted.
///
/// Ticks are written without zero padding. For any date after year 1000
/// that yields 18-19 digits, so lexical and numeric order agree in practice,
/// but ordering always parses the number.
///
/// # Example
///
/// ```rust
/// use savekeep::Tick;
/// use std::time::Duration;
///
/// let t = Tick::from_duration(Duration::from_secs(2));
/// assert_eq!(t.as_u64(), 20_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    pub const fn new(ticks: u64) -> Self {
        Tick(ticks)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Ticks elapsed in `duration`, measured from tick zero
    pub fn from_duration(duration: Duration) -> Self {
        Tick(duration_to_ticks(duration))
    }

    /// Converts a UTC wall-clock time into ticks
    ///
    /// Times before 0001-01-01 clamp to [`Tick::ZERO`].
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        let ticks = UNIX_EPOCH_TICKS as i128
            + time.timestamp() as i128 * TICKS_PER_SECOND as i128
            + (time.timestamp_subsec_nanos() as u64 / NANOS_PER_TICK) as i128;
        Tick(ticks.clamp(0, u64::MAX as i128) as u64)
    }

    /// Converts back into a UTC wall-clock time, if representable
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let since_epoch = self.0 as i128 - UNIX_EPOCH_TICKS as i128;
        let secs = since_epoch.div_euclid(TICKS_PER_SECOND as i128);
        let rem = since_epoch.rem_euclid(TICKS_PER_SECOND as i128);
        let secs = i64::try_from(secs).ok()?;
        DateTime::from_timestamp(secs, (rem as u64 * NANOS_PER_TICK) as u32)
    }

    /// Signed number of ticks from `earlier` to `self`
    ///
    /// Negative when `earlier` is actually later than `self`.
    pub fn ticks_since(self, earlier: Tick) -> i128 {
        self.0 as i128 - earlier.0 as i128
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Tick {
    fn from(ticks: u64) -> Self {
        Tick(ticks)
    }
}

/// Converts a duration into whole ticks, saturating at `u64::MAX`
pub fn duration_to_ticks(duration: Duration) -> u64 {
    let ticks = duration.as_nanos() / NANOS_PER_TICK as u128;
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Identity of one versioned save file: `{nickname}_{ticks}{extension}`
///
/// Build validated identities with [`SaveIdentity::new`]. Identities decoded
/// from foreign file names skip nickname validation, since they describe
/// whatever is already on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SaveIdentity {
    pub(crate) nickname: String,
    pub(crate) timestamp: Tick,
    pub(crate) extension: String,
}

impl SaveIdentity {
    /// Creates an identity, validating the nickname and extension
    pub fn new(
        nickname: impl Into<String>,
        timestamp: Tick,
        extension: impl Into<String>,
    ) -> Result<Self, super::SaveError> {
        let nickname = nickname.into();
        let extension = extension.into();
        super::codec::validate_nickname(&nickname)?;
        super::codec::validate_extension(&extension)?;

        Ok(SaveIdentity {
            nickname,
            timestamp,
            extension,
        })
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn timestamp(&self) -> Tick {
        self.timestamp
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The file name this identity encodes to
    pub fn file_name(&self) -> String {
        super::codec::encode(self)
    }
}

impl fmt::Display for SaveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// What to do when a save's target path already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DuplicateFileResolution {
    /// Replace the existing file
    Overwrite,
    /// Refuse the save with `SaveError::DuplicateFile`
    #[default]
    Fail,
    /// Leave the existing file untouched and report success
    Skip,
}

/// How a successful save reached the disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new file was written
    Created,
    /// An existing file was replaced
    Overwritten,
    /// An existing file was kept and nothing was written
    Skipped,
}

impl WriteOutcome {
    /// Returns true if bytes actually reached the filesystem
    pub fn wrote(&self) -> bool {
        !matches!(self, WriteOutcome::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tick_from_datetime_matches_known_value() {
        let time = Utc.with_ymd_and_hms(2021, 9, 14, 0, 0, 0).unwrap();
        assert_eq!(Tick::from_datetime(time).as_u64(), 637_671_744_000_000_000);
    }

    #[test]
    fn test_tick_datetime_round_trip() {
        let time = Utc.with_ymd_and_hms(2024, 2, 29, 13, 37, 5).unwrap()
            + chrono::Duration::microseconds(1234);
        let tick = Tick::from_datetime(time);
        assert_eq!(tick.to_datetime(), Some(time));
    }

    #[test]
    fn test_tick_zero_is_year_one() {
        let time = Tick::ZERO.to_datetime().unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_tick_from_duration() {
        assert_eq!(Tick::from_duration(Duration::from_millis(4200)).as_u64(), 42_000_000);
        assert_eq!(Tick::from_duration(Duration::from_nanos(99)).as_u64(), 0);
    }

    #[test]
    fn test_ticks_since_is_signed() {
        let a = Tick::new(10);
        let b = Tick::new(25);
        assert_eq!(b.ticks_since(a), 15);
        assert_eq!(a.ticks_since(b), -15);
    }

    #[test]
    fn test_identity_rejects_bad_nickname() {
        assert!(SaveIdentity::new("", Tick::ZERO, ".sav").is_err());
        assert!(SaveIdentity::new("a/b", Tick::ZERO, ".sav").is_err());
    }

    #[test]
    fn test_identity_file_name() {
        let identity = SaveIdentity::new("AutoSave", Tick::new(637_671_744_000_000_000), ".sav.json").unwrap();
        assert_eq!(identity.file_name(), "AutoSave_637671744000000000.sav.json");
    }

    #[test]
    fn test_skipped_outcome_did_not_write() {
        assert!(WriteOutcome::Created.wrote());
        assert!(WriteOutcome::Overwritten.wrote());
        assert!(!WriteOutcome::Skipped.wrote());
    }
}
