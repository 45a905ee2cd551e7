//! The boundary to whatever supplies calendar events.

use crate::calendar::{events_from_records, Event, EventRecord};
use crate::common::Rgb;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::RwLock;

/// Fetches the events overlapping `[window_start, window_end)`, sorted by
/// begin.
///
/// Loads run on their own task and may be abandoned at any await point when
/// the face is hidden or a newer load supersedes them.
pub trait EventLoader: Send + Sync + 'static {
    fn load(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<Vec<Event>>> + Send;
}

/// An in-process calendar holding raw provider rows.
#[derive(Debug)]
pub struct MemoryCalendar {
    records: RwLock<Vec<EventRecord>>,
    default_color: Rgb,
}

impl MemoryCalendar {
    pub fn new(default_color: Rgb) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            default_color,
        }
    }

    pub fn with_records(default_color: Rgb, records: Vec<EventRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            default_color,
        }
    }

    pub fn insert(&self, record: EventRecord) {
        match self.records.write() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    pub fn clear(&self) {
        match self.records.write() {
            Ok(mut records) => records.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rows overlapping the window, converted and sorted.
    pub fn events_between(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("calendar store is poisoned"))?;
        let overlapping = records
            .iter()
            .filter(|record| record.end >= window_start && record.begin < window_end);
        Ok(events_from_records(overlapping, self.default_color))
    }
}

impl EventLoader for MemoryCalendar {
    async fn load(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        self.events_between(window_start, window_end)
    }
}
