//! Turns the event list into the wedges drawn over the dial.
//!
//! Only the next `window_hours` are shown, which is half a day and exactly one
//! turn of the hour hand. Events that touch or overlap the previously placed
//! event are stacked inward by `stack_step`; any gap resets to the full radius.
//!
//! The stacking is greedy and only compares against the furthest end seen so
//! far, so three or more concurrent events of different lengths can stack
//! deeper than a true interval packing would.

use crate::calendar::Event;
use crate::common::Rgb;
use crate::geometry::DEGREES_PER_HOUR;
use chrono::{DateTime, TimeZone, Timelike, Utc};
use std::iter::FusedIterator;
use tracing::trace;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// One event's sector on the dial. Angles are in degrees, clockwise from
/// 3 o'clock, so the top of the dial is -90.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wedge {
    pub start_angle_deg: f32,
    pub sweep_angle_deg: f32,
    pub radius: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub window_hours: u32,
    /// Radius of an unstacked wedge, normally the hour hand length.
    pub full_radius: f32,
    pub stack_step: f32,
}

impl LayoutParams {
    pub fn new(full_radius: f32) -> Self {
        Self {
            window_hours: 12,
            full_radius,
            stack_step: 10.0,
        }
    }

    fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.window_hours))
    }
}

/// Lays out `events` (sorted by begin) as seen at `now`.
///
/// The returned iterator is lazy and borrows the list for its lifetime. Call
/// again for every frame.
pub fn layout<'a, T: TimeZone>(
    events: &'a [Event],
    now: &DateTime<T>,
    params: LayoutParams,
) -> Wedges<'a, T> {
    let now_utc = now.with_timezone(&Utc);
    Wedges {
        events: events.iter(),
        now: now_utc,
        window_end: now_utc + params.window(),
        tz: now.timezone(),
        radius: params.full_radius,
        params,
        last_end: None,
    }
}

/// Iterator returned by [`layout`].
pub struct Wedges<'a, T: TimeZone> {
    events: std::slice::Iter<'a, Event>,
    now: DateTime<Utc>,
    window_end: DateTime<Utc>,
    tz: T,
    params: LayoutParams,
    last_end: Option<DateTime<Utc>>,
    radius: f32,
}

impl<T: TimeZone> Wedges<'_, T> {
    /// Stacked tiers stop shrinking at zero, or at the full radius when the
    /// dial is already too small for a positive one.
    fn radius_floor(&self) -> f32 {
        self.params.full_radius.min(0.0)
    }

    /// Fractional hour on the twelve hour dial, in `[0, 12)`.
    fn dial_hour(&self, at: DateTime<Utc>) -> f32 {
        let local = at.with_timezone(&self.tz);
        let hour = local.hour() as f32 + local.minute() as f32 / 60.0;
        if hour >= 12.0 {
            hour - 12.0
        } else {
            hour
        }
    }
}

impl<T: TimeZone> Iterator for Wedges<'_, T> {
    type Item = Wedge;

    fn next(&mut self) -> Option<Wedge> {
        for event in self.events.by_ref() {
            if event.end() < self.now || event.begin() > self.window_end {
                continue;
            }
            let begin = event.begin().max(self.now);
            let end = event.end().min(self.window_end);
            if end < begin {
                trace!("Skipping event ending before it begins at {}", event.begin());
                continue;
            }

            self.radius = match self.last_end {
                Some(last_end) if begin <= last_end => {
                    (self.radius - self.params.stack_step).max(self.radius_floor())
                }
                _ => self.params.full_radius,
            };
            self.last_end = Some(self.last_end.map_or(end, |last_end| last_end.max(end)));

            let start_hour = self.dial_hour(begin);
            let duration_hours =
                ((end - begin).num_milliseconds() as f64 / MILLIS_PER_HOUR) as f32;

            return Some(Wedge {
                start_angle_deg: start_hour * DEGREES_PER_HOUR - 90.0,
                sweep_angle_deg: duration_hours * DEGREES_PER_HOUR,
                radius: self.radius,
                color: event.color(),
            });
        }
        None
    }
}

impl<T: TimeZone> FusedIterator for Wedges<'_, T> {}
