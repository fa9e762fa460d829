//! In-memory calendar for tests.
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use super::{BookingRequest, CalendarProvider, EventRef, TimeInterval};
use crate::core::BookingError;

#[derive(Default)]
pub struct FakeCalendar {
    pub busy: Vec<TimeInterval>,
    // Returned by the next call, then cleared
    pub error: Mutex<Option<BookingError>>,
    pub list_calls: Mutex<Vec<(DateTime<FixedOffset>, DateTime<FixedOffset>)>>,
    pub created: Mutex<Vec<BookingRequest>>,
}

impl FakeCalendar {
    pub fn with_busy(busy: Vec<TimeInterval>) -> Self {
        Self {
            busy,
            ..Default::default()
        }
    }

    pub fn failing(err: BookingError) -> Self {
        Self {
            error: Mutex::new(Some(err)),
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<BookingRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn list_busy_intervals(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeInterval>, BookingError> {
        self.list_calls.lock().unwrap().push((start, end));
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self
            .busy
            .iter()
            .filter(|b| b.start < end && start < b.end)
            .cloned()
            .collect())
    }

    async fn create_event(&self, booking: &BookingRequest) -> Result<EventRef, BookingError> {
        if let Some(err) = self.error.lock().unwrap().take() {
            return Err(err);
        }
        let mut created = self.created.lock().unwrap();
        created.push(booking.clone());
        let id = format!("evt{}", created.len());
        Ok(EventRef {
            html_link: Some(format!("https://calendar.google.com/event?eid={}", id)),
            id,
        })
    }
}
