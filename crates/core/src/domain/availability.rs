use std::fmt;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Minute-precision slot identifier in `YYYY-MM-DDTHH:MM` form.
///
/// The zero-padded ISO prefix makes lexicographic order on the inner string
/// equal to chronological order, so the reaper and the matcher compare slots
/// as plain strings instead of re-parsing dates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilitySlot(pub String);

impl AvailabilitySlot {
    /// Builds a slot key from a calendar date and minutes since midnight.
    pub fn from_parts(date: &str, minutes_since_midnight: u32) -> Self {
        let hour = minutes_since_midnight / 60;
        let minute = minutes_since_midnight % 60;
        Self(format!("{date}T{hour:02}:{minute:02}"))
    }

    /// The slot key for `at`, truncated to the minute.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y-%m-%dT%H:%M").to_string())
    }

    /// The half-hour boundary nearest to `at`.
    ///
    /// Minutes below 15 and from 45 upward map to `:00` of the same hour,
    /// everything else to `:30`.
    pub fn nearest_half_hour(at: DateTime<Utc>) -> Self {
        let rounded = if at.minute() < 15 || at.minute() >= 45 { 0 } else { 30 };
        Self::from_datetime(at.with_minute(rounded).unwrap_or(at))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `YYYY-MM-DD` prefix of the slot key.
    pub fn date(&self) -> &str {
        self.0.split_once('T').map(|(date, _)| date).unwrap_or(&self.0)
    }

    /// The `HH:MM` suffix of the slot key.
    pub fn time(&self) -> &str {
        self.0.split_once('T').map(|(_, time)| time).unwrap_or("")
    }

    /// Renders the 30-minute grid cell this slot starts as `HH:MM-HH:MM`.
    pub fn display_range(&self) -> String {
        let time = self.time();
        let (hour, minute) = time.split_once(':').unwrap_or((time, "00"));
        if minute == "30" {
            let next_hour = hour.parse::<u32>().map(|value| value + 1).unwrap_or(0);
            format!("{hour}:30-{next_hour:02}:00")
        } else {
            format!("{hour}:{minute}-{hour}:30")
        }
    }
}

impl fmt::Display for AvailabilitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user's claim of being free during one slot.
///
/// Identity is `(user_id, slot)`; `created_at` is informational only and a
/// record is never mutated after it is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub user_id: String,
    pub slot: AvailabilitySlot,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::AvailabilitySlot;

    #[test]
    fn slot_ordering_is_chronological() {
        let morning = AvailabilitySlot("2024-01-02T09:30".to_string());
        let afternoon = AvailabilitySlot("2024-01-02T13:00".to_string());
        let next_day = AvailabilitySlot("2024-01-03T00:00".to_string());

        assert!(morning < afternoon);
        assert!(afternoon < next_day);
    }

    #[test]
    fn from_parts_zero_pads_hour_and_minute() {
        let slot = AvailabilitySlot::from_parts("2024-01-02", 9 * 60 + 5);
        assert_eq!(slot.as_str(), "2024-01-02T09:05");
    }

    #[test]
    fn from_datetime_truncates_to_the_minute() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 13, 7, 42).unwrap();
        assert_eq!(AvailabilitySlot::from_datetime(at).as_str(), "2024-01-02T13:07");
    }

    #[test]
    fn nearest_half_hour_rounds_within_the_hour() {
        let cases = [(10, 5, "10:00"), (10, 14, "10:00"), (10, 15, "10:30"), (10, 44, "10:30"), (10, 45, "10:00")];
        for (hour, minute, expected) in cases {
            let at = Utc.with_ymd_and_hms(2024, 1, 2, hour, minute, 0).unwrap();
            assert_eq!(
                AvailabilitySlot::nearest_half_hour(at).time(),
                expected,
                "{hour}:{minute} should round to {expected}"
            );
        }
    }

    #[test]
    fn date_and_time_split_on_the_separator() {
        let slot = AvailabilitySlot("2024-01-02T10:30".to_string());
        assert_eq!(slot.date(), "2024-01-02");
        assert_eq!(slot.time(), "10:30");
    }

    #[test]
    fn display_range_advances_half_hour_cells() {
        assert_eq!(AvailabilitySlot("2024-01-02T10:00".to_string()).display_range(), "10:00-10:30");
        assert_eq!(AvailabilitySlot("2024-01-02T10:30".to_string()).display_range(), "10:30-11:00");
        assert_eq!(AvailabilitySlot("2024-01-02T23:30".to_string()).display_range(), "23:30-24:00");
    }
}
