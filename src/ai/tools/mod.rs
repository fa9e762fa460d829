use std::sync::Arc;

use chrono::{DateTime, FixedOffset};

use crate::calendar::{CalendarProvider, LocalZone, parse_timestamp};
use crate::openai::BoxedToolCall;

pub mod availability;
pub use availability::CheckAvailabilityTool;

pub mod booking;
pub use booking::BookAppointmentTool;

/// Every tool the booking assistant is allowed to call.
pub fn calendar_tools(calendar: Arc<dyn CalendarProvider>, zone: LocalZone) -> Vec<BoxedToolCall> {
    vec![
        Box::new(CheckAvailabilityTool::new(calendar.clone(), zone.clone())) as BoxedToolCall,
        Box::new(BookAppointmentTool::new(calendar, zone)) as BoxedToolCall,
    ]
}

// The model sends whatever it likes as a time so failures are
// rendered as a tool result it can correct itself from.
fn parse_time_arg(
    field: &str,
    value: &str,
    zone: &LocalZone,
) -> Result<DateTime<FixedOffset>, String> {
    parse_timestamp(value, zone).map_err(|e| {
        tracing::debug!("Rejected {} argument {:?}: {}", field, value, e);
        format!(
            "I'm sorry, I couldn't understand the {} '{}'. Please provide times in ISO 8601 format, for example 2025-03-10T14:00:00.",
            field.replace('_', " "),
            value
        )
    })
}

fn invalid_args_message(tool: &str, err: serde_json::Error) -> String {
    tracing::warn!("Invalid arguments for {}: {}", tool, err);
    format!(
        "The arguments for {} could not be read ({}). Please call it again with valid JSON arguments.",
        tool, err
    )
}
