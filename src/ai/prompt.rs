//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. Strict mode makes a missing
//! variable an error instead of silently rendering an empty string.

use std::fmt;

use anyhow::Result;
use handlebars::Handlebars;
use serde::Serialize;

#[derive(Debug)]
pub enum Prompt {
    BookingAssistant,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<Prompt> for String {
    fn from(item: Prompt) -> String {
        format!("{:?}", item)
    }
}

const BOOKING_ASSISTANT_PROMPT: &str = r"You are a helpful assistant that helps users book appointments in their Google Calendar.
Your primary tasks are to check for availability and book appointments.

Conversation Flow:
1. Greet the user and understand their request. The request might be vague (e.g., 'tomorrow afternoon').
2. Clarify any ambiguities. You must determine a specific date and a time range to check for availability. For 'morning', assume 9 AM to 12 PM. For 'afternoon', 12 PM to 5 PM. For 'evening', 5 PM to 8 PM.
3. Use the `check_availability` tool to find open slots. You MUST provide both a start and end time in ISO 8601 format to this tool.
4. Present the available slots to the user in a clear, friendly way.
5. Once the user confirms a time slot, ask for a title/summary for the meeting.
6. With all details confirmed (start time, end time, summary), use the `book_appointment` tool to create the event in the calendar.
7. Finally, confirm the booking with the user and provide the event details.

Important Rules:
- Today's date is {{current_date}}. Times without an offset are interpreted in the {{timezone}} timezone.
- Always confirm with the user before calling the `book_appointment` tool.
- If no slots are available, inform the user and ask if they'd like to try a different day or time.
- Your final response after a successful booking should be a confirmation message, not a tool call.
";

#[derive(Serialize)]
pub struct BookingAssistantContext<'a> {
    pub current_date: String,
    pub timezone: &'a str,
}

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Prompts are plain text sent to the model, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    registry
        .register_template_string(
            &Prompt::BookingAssistant.to_string(),
            BOOKING_ASSISTANT_PROMPT,
        )
        .expect("Failed to register template");
    registry
}

pub fn render_booking_prompt(ctx: &BookingAssistantContext) -> Result<String> {
    let prompt = templates().render(&Prompt::BookingAssistant.to_string(), ctx)?;
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_renders_date_and_timezone() {
        let prompt = render_booking_prompt(&BookingAssistantContext {
            current_date: String::from("2025-03-10"),
            timezone: "America/New_York",
        })
        .unwrap();
        assert!(prompt.contains("Today's date is 2025-03-10."));
        assert!(prompt.contains("interpreted in the America/New_York timezone"));
        assert!(prompt.contains("`check_availability`"));
        assert!(prompt.contains("`book_appointment`"));
    }

    #[test]
    fn it_fails_on_missing_variables() {
        let result = templates().render(
            &Prompt::BookingAssistant.to_string(),
            &serde_json::json!({"current_date": "2025-03-10"}),
        );
        assert!(result.is_err());
    }
}
