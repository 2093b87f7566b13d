use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::domain::AvailabilitySlot;
use crate::errors::ScheduleError;

/// Length of one bookable cell on the scheduling grid.
pub const SLOT_MINUTES: u32 = 30;

/// Expands `date` + `"HH:MM-HH:MM"` into the slot keys the range covers.
///
/// One slot is emitted per 30-minute step from the literal start minute
/// (inclusive) to the end (exclusive); a 30-minute range yields exactly one
/// slot. Alignment to :00/:30 is a caller convention, so `13:05-14:05`
/// parses and steps 13:05, 13:35. The date string is passed through
/// unvalidated; the admission window owns date parsing.
pub fn parse_time_range(
    date: &str,
    range: &str,
) -> Result<Vec<AvailabilitySlot>, ScheduleError> {
    let (start, end) = split_range(range)?;
    let start_minutes = minutes_since_midnight(start)?;
    let end_minutes = minutes_since_midnight(end)?;

    if start_minutes >= end_minutes {
        return Err(ScheduleError::RangeOrder { range: range.to_string() });
    }

    let mut slots = Vec::new();
    let mut cursor = start_minutes;
    while cursor < end_minutes {
        slots.push(AvailabilitySlot::from_parts(date, cursor));
        cursor += SLOT_MINUTES;
    }
    Ok(slots)
}

fn split_range(range: &str) -> Result<(&str, &str), ScheduleError> {
    let mut parts = range.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) if !start.is_empty() && !end.is_empty() => {
            Ok((start, end))
        }
        _ => Err(ScheduleError::RangeFormat { range: range.to_string() }),
    }
}

fn minutes_since_midnight(time: &str) -> Result<u32, ScheduleError> {
    let (hour_str, minute_str) = match time.split_once(':') {
        Some((hour, minute)) => (hour, minute),
        None => (time, "00"),
    };

    let hour = hour_str
        .parse::<u32>()
        .map_err(|_| ScheduleError::TimeFormat { time: time.to_string() })?;
    let minute = minute_str
        .parse::<u32>()
        .map_err(|_| ScheduleError::TimeFormat { time: time.to_string() })?;

    // 24 is only valid as the 24:00 end-of-day marker.
    if minute > 59 || hour > 24 || (hour == 24 && minute > 0) {
        return Err(ScheduleError::TimeFormat { time: time.to_string() });
    }

    Ok(hour * 60 + minute)
}

/// Rolling admission period for new registrations.
///
/// Gates registration only; listing and deletion are always allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionWindow {
    pub days: i64,
}

impl Default for AdmissionWindow {
    fn default() -> Self {
        Self { days: 14 }
    }
}

impl AdmissionWindow {
    pub fn new(days: i64) -> Self {
        Self { days }
    }

    /// True iff `date_str` parses and falls in `[now, now + days]`.
    ///
    /// Accepts bare dates (taken as midnight UTC) and full instants.
    pub fn admits(&self, date_str: &str, now: DateTime<Utc>) -> bool {
        let Some(parsed) = parse_date_or_instant(date_str) else {
            return false;
        };
        parsed >= now && parsed <= now + Duration::days(self.days)
    }

    /// `admits` as a gate: the failure carries the rejected date so the
    /// dispatch layer can echo it back.
    pub fn check(&self, date_str: &str, now: DateTime<Utc>) -> Result<(), ScheduleError> {
        if parse_date_or_instant(date_str).is_none() {
            return Err(ScheduleError::DateFormat { date: date_str.to_string() });
        }
        if !self.admits(date_str, now) {
            return Err(ScheduleError::OutsideWindow {
                date: date_str.to_string(),
                window_days: self.days,
            });
        }
        Ok(())
    }
}

/// Two-week variant used by the registration path.
pub fn is_within_two_weeks(date_str: &str, now: DateTime<Utc>) -> bool {
    AdmissionWindow::default().admits(date_str, now)
}

fn parse_date_or_instant(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}
