use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{invalid_args_message, parse_time_arg};
use crate::calendar::{BookingRequest, CalendarProvider, EventRef, LocalZone};
use crate::core::BookingError;
use crate::openai::{Function, Parameters, Property, ToolCall, ToolType};

const BOOKING_FAILED: &str =
    "An error occurred while booking the appointment. Please check the details and try again.";

#[derive(Serialize)]
pub struct BookAppointmentProps {
    pub start_time: Property,
    pub end_time: Property,
    pub summary: Property,
    pub description: Property,
}

#[derive(Deserialize)]
pub struct BookAppointmentArgs {
    pub start_time: String,
    pub end_time: String,
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct BookAppointmentTool {
    pub r#type: ToolType,
    pub function: Function<BookAppointmentProps>,
    #[serde(skip)]
    calendar: Arc<dyn CalendarProvider>,
    #[serde(skip)]
    zone: LocalZone,
}

fn confirmation(booking: &BookingRequest, event: &EventRef) -> String {
    let reference = match &event.html_link {
        Some(link) => format!("The event link is: {}", link),
        None => format!("The event ID is: {}", event.id),
    };
    format!(
        "Success! The appointment '{}' has been booked for {}. {}",
        booking.summary,
        booking.start.format("%A, %B %d at %I:%M %p"),
        reference
    )
}

#[async_trait]
impl ToolCall for BookAppointmentTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        let fn_args: BookAppointmentArgs = match serde_json::from_str(args) {
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

        let booking = match BookingRequest::new(
            start,
            end,
            &fn_args.summary,
            fn_args.description.as_deref(),
        ) {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!("Rejected booking: {}", e);
                return Ok(format!("The appointment was not booked. {}", e));
            }
        };

        match self.calendar.create_event(&booking).await {
            Ok(event) => {
                tracing::info!("Booked '{}' as event {}", booking.summary, event.id);
                Ok(confirmation(&booking, &event))
            }
            Err(e @ BookingError::AuthenticationRequired(_)) => Err(e.into()),
            Err(e) => {
                tracing::error!("Booking appointment failed: {}", e);
                Ok(BOOKING_FAILED.to_string())
            }
        }
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl BookAppointmentTool {
    pub fn new(calendar: Arc<dyn CalendarProvider>, zone: LocalZone) -> Self {
        let function = Function {
            name: String::from("book_appointment"),
            description: String::from(
                "Books an appointment in the calendar. Only call this after the user has confirmed the time slot and title.",
            ),
            parameters: Parameters {
                r#type: String::from("object"),
                properties: BookAppointmentProps {
                    start_time: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "Start of the appointment in ISO 8601 format, e.g. 2025-03-10T14:00:00.",
                        ),
                    },
                    end_time: Property {
                        r#type: String::from("string"),
                        description: String::from(
                            "End of the appointment in ISO 8601 format, e.g. 2025-03-10T15:00:00.",
                        ),
                    },
                    summary: Property {
                        r#type: String::from("string"),
                        description: String::from("Title of the appointment."),
                    },
                    description: Property {
                        r#type: String::from("string"),
                        description: String::from("Optional longer description of the appointment."),
                    },
                },
                required: vec![
                    String::from("start_time"),
                    String::from("end_time"),
                    String::from("summary"),
                ],
                additional_properties: false,
            },
            // Strict mode requires every property to be listed as
            // required and `description` is optional
            strict: false,
        };

        Self {
            r#type: ToolType::Function,
            function,
            calendar,
            zone,
        }
    }
}
