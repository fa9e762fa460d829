//! Calendar domain types shared by the tools and the Google adapter.
#[cfg(test)]
pub mod fake;
pub mod slots;
pub mod time;

pub use slots::{SLOT_LENGTH, free_slots};
pub use time::{LocalZone, parse_timestamp};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::core::BookingError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeInterval {
    /// Returns `None` unless `start` is strictly before `end`.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A validated request to create an event. Built by the booking tool
/// and submitted once.
#[derive(Clone, Debug, PartialEq)]
pub struct BookingRequest {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
    pub description: Option<String>,
}

impl BookingRequest {
    pub fn new(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        summary: &str,
        description: Option<&str>,
    ) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::InvalidBooking(format!(
                "end time {} must be after start time {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(BookingError::InvalidBooking(
                "a title for the appointment is required".to_string(),
            ));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        Ok(Self {
            start,
            end,
            summary: summary.to_string(),
            description,
        })
    }
}

/// Reference to an event created on the provider's side.
#[derive(Clone, Debug, PartialEq)]
pub struct EventRef {
    pub id: String,
    pub html_link: Option<String>,
}

/// The two calendar operations the assistant needs. Implemented by
/// `google::GoogleCalendar`.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals overlapping `[start, end)`, sorted by start time.
    async fn list_busy_intervals(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeInterval>, BookingError>;

    async fn create_event(&self, booking: &BookingRequest) -> Result<EventRef, BookingError>;
}
