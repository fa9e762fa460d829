use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::{invalid_args_message, parse_time_arg};
use crate::calendar::{CalendarProvider, LocalZone, TimeInterval, free_slots};
use crate::core::BookingError;
use crate::openai::{Function, Parameters, Property, ToolCall, ToolType};

const NO_SLOTS: &str = "No 1-hour slots are available in the requested timeframe.";
const CHECK_FAILED: &str =
    "An error occurred while checking the calendar. Please try again or specify a different time.";
// Long windows are summarized after this many slots
const MAX_LISTED_SLOTS: usize = 20;

/// Fetch busy time for the window and return the free 1-hour slots.
pub async fn find_free_slots(
    calendar: &dyn CalendarProvider,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<Vec<TimeInterval>, BookingError> {
    let busy = calendar.list_busy_intervals(start, end).await?;
    tracing::debug!("Found {} busy intervals between {} and {}", busy.len(), start, end);
    Ok(free_slots(start, end, &busy))
}

/// Label a slot in wall-clock time for `zone`. Each end is converted
/// separately since a slot keeps the window start's offset even after
/// a DST change.
pub fn format_slot(slot: &TimeInterval, zone: &LocalZone) -> String {
    let start = zone.from_utc(&slot.start.with_timezone(&Utc));
    let end = zone.from_utc(&slot.end.with_timezone(&Utc));
    format!(
        "{} - {} ({})",
        start.format("%A, %B %d %I:%M %p"),
        end.format("%I:%M %p"),
        start.to_rfc3339()
    )
}

pub fn format_slots(slots: &[TimeInterval], zone: &LocalZone) -> String {
    if slots.is_empty() {
        return NO_SLOTS.to_string();
    }
    let listed: Vec<String> = slots
        .iter()
        .take(MAX_LISTED_SLOTS)
        .map(|slot| format_slot(slot, zone))
        .collect();
    let remaining = slots.len().saturating_sub(MAX_LISTED_SLOTS);
    if remaining == 0 {
        return format!(
            "Here are the available 1-hour slots: {}. Please suggest these to the user.",
            listed.join(", ")
        );
    }
    format!(
        "Here are the available 1-hour slots: {}, and {} more. Please suggest the earliest of these to the user, or ask them to narrow the time range.",
        listed.join(", "),
        remaining
    )
}

#[derive(Serialize)]
pub struct CheckAvailabilityProps {
    pub start_time: Property,
    pub end_time: Property,
}

#[derive(Deserialize)]
pub struct CheckAvailabilityArgs {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize)]
pub struct CheckAvailabilityTool {
    pub r#type: ToolType,
    pub function: Function<CheckAvailabilityProps>,
    #[serde(skip)]
    calendar: Arc<dyn CalendarProvider>,
    #[serde(skip)]
    zone: LocalZone,
}

#[async_trait]
impl ToolCall for CheckAvailabilityTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: CheckAvailabilityArgs = match serde_json::from_str(args) {
            Ok(a) => a,
            Err(e) => return Ok(invalid_args_message(&self.function.name, e)),
        };
        let start = match parse_time_arg("start_time", &fn_args.start_time, &self.zone) {
            Ok(dt) => dt,
            Err(msg) => return Ok(msg),
        };
        let end = match parse_time_arg("end_time", &fn_args.end_time, &self.zone) {
            Ok(dt) => dt,
            Err(msg) => return Ok(msg),
        };
        if end <= start {
            return Ok(String::from(
                "The end time must be after the start time. Please provide a valid time range.",
            ));
        }

        match find_free_slots(self.calendar.as_ref(), start, end).await {
            Ok(slots) => Ok(format_slots(&slots, &self.zone)),
            Err(e @ BookingError::AuthenticationRequired(_)) => Err(e.into()),
            Err(e) => {
                tracing::error!("Checking availability failed: {}", e);
                Ok(CHECK_FAILED.to_string())
            }
        }
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl CheckAvailabilityTool {
    pub fn new(calendar: Arc<dyn CalendarProvider>, zone: LocalZone) -> Self {
        let function = Function {
            name: String::from("check_availability"),
            description: String::from(
                "Checks the calendar for available 1-hour slots within a time range. Both times must be in ISO 8601 format.",
            ),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: CheckAvailabilityProps {
                    start_time: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "Start of the range to check, e.g. 2025-03-10T12:00:00.",
                        ),
                    },
                    end_time: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "End of the range to check, e.g. 2025-03-10T17:00:00.",
                        ),
                    },
                },
                required: vec![String::from("start_time"), String::from("end_time")],
                additional_properties: false,
            },
            strict: true,
        };

        Self {
            r#type: ToolType::Function,
            function,
            calendar,
            zone,
        }
    }
}
