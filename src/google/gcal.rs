//! Google Calendar API client for reading busy time and creating
//! events on a single calendar.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::oauth::CredentialStore;
use crate::calendar::{BookingRequest, CalendarProvider, EventRef, LocalZone, TimeInterval};
use crate::core::BookingError;

/// Either `dateTime` for timed events or `date` for all-day events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(rename = "htmlLink")]
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEventsResponse {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewEvent<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventDateTime,
    end: EventDateTime,
}

pub struct GoogleCalendar {
    api_base_url: String,
    calendar_id: String,
    credentials: CredentialStore,
    zone: LocalZone,
    client: Client,
}

impl GoogleCalendar {
    pub fn new(
        api_base_url: &str,
        calendar_id: &str,
        credentials: CredentialStore,
        zone: LocalZone,
    ) -> Self {
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            credentials,
            zone,
            client: Client::new(),
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendar/v3/calendars/{}/events",
            self.api_base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    /// Every event overlapping `[start, end)`, recurring events expanded
    /// and sorted by start time.
    pub async fn list_events(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Event>, BookingError> {
        let access_token = self.credentials.access_token().await?;
        let time_min = start.to_rfc3339();
        let time_max = end.to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.as_str()));
            }

            let res = self
                .client
                .get(self.events_url())
                .bearer_auth(&access_token)
                .query(&query)
                .send()
                .await?;
            let page: ListEventsResponse = parse_response(res, "Event list").await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    pub async fn insert_event(&self, booking: &BookingRequest) -> Result<Event, BookingError> {
        let access_token = self.credentials.access_token().await?;
        let time_zone = self.zone.name();
        let body = NewEvent {
            summary: &booking.summary,
            description: booking.description.as_deref(),
            start: EventDateTime {
                date_time: Some(booking.start),
                date: None,
                time_zone: time_zone.clone(),
            },
            end: EventDateTime {
                date_time: Some(booking.end),
                date: None,
                time_zone,
            },
        };

        let res = self
            .client
            .post(self.events_url())
            .bearer_auth(&access_token)
            .json(&body)
            .send()
            .await?;
        parse_response(res, "Event insert").await
    }

    /// The busy interval an event occupies. All-day events block from
    /// local midnight of their first day to local midnight after the
    /// last.
    fn busy_interval(&self, event: &Event) -> Option<TimeInterval> {
        let start = self.event_instant(&event.start)?;
        let end = self.event_instant(&event.end)?;
        TimeInterval::new(start, end)
    }

    fn event_instant(&self, at: &EventDateTime) -> Option<DateTime<FixedOffset>> {
        if let Some(dt) = at.date_time {
            return Some(dt);
        }
        let date = at.date?;
        self.zone.localize(date.and_time(NaiveTime::MIN)).ok()
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    async fn list_busy_intervals(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeInterval>, BookingError> {
        let events = self.list_events(start, end).await?;
        let busy = events
            .iter()
            .filter_map(|event| {
                let interval = self.busy_interval(event);
                if interval.is_none() {
                    tracing::warn!("Skipping event {} with unusable start/end", event.id);
                }
                interval
            })
            .collect();
        Ok(busy)
    }

    async fn create_event(&self, booking: &BookingRequest) -> Result<EventRef, BookingError> {
        let event = self.insert_event(booking).await?;
        tracing::info!("Created event {}", event.id);
        Ok(EventRef {
            id: event.id,
            html_link: event.html_link,
        })
    }
}

/// Decode a successful response or turn the failure into a
/// `BookingError` with Google's error message when there is one.
async fn parse_response<T: for<'de> Deserialize<'de>>(
    res: Response,
    what: &str,
) -> Result<T, BookingError> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(text);
        tracing::error!("{} failed: {} ({})", what, status, message);
        return match status {
            StatusCode::UNAUTHORIZED => Err(BookingError::AuthenticationRequired(format!(
                "{} ({})",
                message, status
            ))),
            _ => Err(BookingError::Provider(format!(
                "{} failed: {} ({})",
                what, status, message
            ))),
        };
    }
    serde_json::from_str(&text)
        .map_err(|e| BookingError::Provider(format!("{} returned an invalid response: {}", what, e)))
}
