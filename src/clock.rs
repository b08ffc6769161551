//! Human-readable time and date strings.

use chrono::{DateTime, Local, TimeZone};

/// Formats a wall-clock time, e.g. `03:07 PM`.
pub fn format_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%I:%M %p").to_string()
}

/// Formats a calendar date, e.g. `Saturday, October 17, 2026`.
pub fn format_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %B %d, %Y").to_string()
}

/// Timestamp prefix used for note lines, e.g. `2026-10-17 15:07`.
pub fn format_note_stamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y-%m-%d %H:%M").to_string()
}

pub fn current_time() -> String {
    format_time(&Local::now())
}

pub fn current_date() -> String {
    format_date(&Local::now())
}
