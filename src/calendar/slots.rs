//! Turns a query window and the busy intervals inside it into free
//! one hour slots.

use chrono::{DateTime, FixedOffset, TimeDelta};

use super::TimeInterval;

pub const SLOT_LENGTH: TimeDelta = TimeDelta::hours(1);

/// Sweep a cursor across the window emitting every whole slot that
/// fits before the next busy interval.
///
/// Slots stay on a one hour grid anchored at `window_start`: after a
/// busy interval the cursor resumes at the first grid boundary at or
/// after its end, so a 10:00-10:30 meeting frees 11:00 rather than
/// 10:30.
///
/// `busy` must be sorted by start time, which is how the calendar
/// API returns events. Busy intervals that hang off either end of the
/// window are clipped by the sweep itself and any remainder shorter
/// than a slot is dropped. Slots carry the offset of `window_start`.
pub fn free_slots(
    window_start: DateTime<FixedOffset>,
    window_end: DateTime<FixedOffset>,
    busy: &[TimeInterval],
) -> Vec<TimeInterval> {
    let offset = *window_start.offset();
    let mut slots = Vec::new();
    let mut cursor = window_start;

    for interval in busy {
        let limit = interval.start.min(window_end);
        emit_until(&mut cursor, limit, &mut slots);
        let resume = next_boundary(window_start, interval.end.with_timezone(&offset));
        cursor = cursor.max(resume);
    }
    emit_until(&mut cursor, window_end, &mut slots);

    slots
}

fn next_boundary(anchor: DateTime<FixedOffset>, t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    if t <= anchor {
        return anchor;
    }
    let whole = (t - anchor).num_seconds() / SLOT_LENGTH.num_seconds();
    let mut boundary = anchor + SLOT_LENGTH * whole as i32;
    if boundary < t {
        boundary += SLOT_LENGTH;
    }
    boundary
}

fn emit_until(
    cursor: &mut DateTime<FixedOffset>,
    limit: DateTime<FixedOffset>,
    slots: &mut Vec<TimeInterval>,
) {
    while *cursor + SLOT_LENGTH <= limit {
        let end = *cursor + SLOT_LENGTH;
        slots.push(TimeInterval {
            start: *cursor,
            end,
        });
        *cursor = end;
    }
}
