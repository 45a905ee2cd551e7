//! Calendar event types and the conversion from raw provider rows.

use crate::common::Rgb;
use chrono::{DateTime, Utc};
use tracing::debug;

/// A single time-bounded calendar event.
///
/// Events are immutable once built. Collections of events are kept sorted by
/// `begin`, with ties left in the order they arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    color: Rgb,
}

impl Event {
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>, color: Rgb) -> Self {
        Self { begin, end, color }
    }

    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn color(&self) -> Rgb {
        self.color
    }
}

/// A raw event row as a calendar provider reports it.
///
/// Each color column may be missing, and a value of `0` means the provider had
/// nothing to say either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub display_color: Option<u32>,
    pub event_color: Option<u32>,
    pub calendar_color: Option<u32>,
    pub all_day: bool,
}

impl EventRecord {
    /// A timed record with only a display color.
    pub fn timed(begin: DateTime<Utc>, end: DateTime<Utc>, color: Rgb) -> Self {
        Self {
            begin,
            end,
            display_color: Some(color.to_u32()),
            event_color: None,
            calendar_color: None,
            all_day: false,
        }
    }

    /// Picks the first usable color: display, then event, then calendar.
    /// Falls back to `default` when every column is absent or zero.
    pub fn resolve_color(&self, default: Rgb) -> Rgb {
        [self.display_color, self.event_color, self.calendar_color]
            .into_iter()
            .flatten()
            .find(|&c| c != 0)
            .map(Rgb::from_u32)
            .unwrap_or_else(|| {
                debug!("No event color could be found, using default {}", default);
                default
            })
    }
}

/// Turns provider rows into a sorted event list.
///
/// All-day rows are dropped. The sort is stable so rows sharing a begin time
/// keep their provider order.
pub fn events_from_records<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    default_color: Rgb,
) -> Vec<Event> {
    let mut events: Vec<Event> = records
        .into_iter()
        .filter(|record| !record.all_day)
        .map(|record| Event::new(record.begin, record.end, record.resolve_color(default_color)))
        .collect();
    events.sort_by_key(Event::begin);
    events
}
