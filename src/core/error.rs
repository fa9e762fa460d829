//! Failure conditions surfaced by the booking assistant.
//!
//! Everything that can go wrong while answering a turn ends up as one
//! of these variants so the chat session can turn it into a message
//! the user can act on.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    /// A timestamp string could not be understood
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),

    /// A booking request was rejected before reaching the calendar
    #[error("Invalid booking: {0}")]
    InvalidBooking(String),

    /// No usable calendar credential. Requires running `booker auth`.
    #[error("Calendar authorization required: {0}")]
    AuthenticationRequired(String),

    /// The calendar API failed (network, quota, malformed request)
    #[error("Calendar provider error: {0}")]
    Provider(String),

    #[error("Agent did not produce a reply within {0} steps")]
    AgentLoopDivergence(usize),

    #[error("Agent did not produce a reply within {0:?}")]
    AgentTimeout(Duration),
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        BookingError::Provider(err.to_string())
    }
}
