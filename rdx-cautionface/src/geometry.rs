//! Dial geometry: where the center is, how long each hand is, and which way
//! a hand points for a given time.
//!
//! Angles are measured clockwise from 12 o'clock. A value `v` on a dial with
//! period `p` points at `v / p * 2π`, and a point `length` units out along that
//! angle sits at `(sin * length, -cos * length)` from the center.

use chrono::Timelike;
use std::f32::consts::TAU;

pub const MINUTE_HAND_INSET: f32 = 40.0;
pub const HOUR_HAND_INSET: f32 = 80.0;
pub const TICK1_INSET: f32 = 2.0;
pub const TICK5_INSET: f32 = 4.0;
pub const TICK15_INSET: f32 = 8.0;
pub const CENTER_CAP_RADIUS: f32 = 6.0;
/// Gap between the hour hand's reach and the baseline of the date label.
pub const DATE_LABEL_GAP: f32 = 20.0;

/// Degrees swept by one hour on a twelve hour dial.
pub const DEGREES_PER_HOUR: f32 = 360.0 / 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An axis-aligned rectangle, used as the oval bounds of an arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// The square that circumscribes a circle.
    pub fn around(center: Point, radius: f32) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }
}

/// Maps `value` on a dial of `period` to radians.
pub fn dial_angle(value: f32, period: f32) -> f32 {
    value / period * TAU
}

/// Offset from the center of a point `length` units out at `angle` radians.
pub fn polar_offset(angle: f32, length: f32) -> (f32, f32) {
    (angle.sin() * length, -angle.cos() * length)
}

/// Center and reach of the face for a given surface.
///
/// Window insets are ignored, so a round face with a flat "chin" still centers
/// on the whole screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGeometry {
    pub width: f32,
    pub height: f32,
    pub center: Point,
    pub radius: f32,
}

impl FaceGeometry {
    /// Returns `None` when the surface has nothing drawable.
    pub fn from_bounds(width: f32, height: f32) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return None;
        }
        let center = Point::new(width / 2.0, height / 2.0);
        Some(Self {
            width,
            height,
            center,
            radius: center.x.max(center.y),
        })
    }

    pub fn second_hand_length(&self) -> f32 {
        self.radius
    }

    pub fn minute_hand_length(&self) -> f32 {
        self.radius - MINUTE_HAND_INSET
    }

    pub fn hour_hand_length(&self) -> f32 {
        self.radius - HOUR_HAND_INSET
    }

    /// The point `length` units from the center at `angle` radians.
    pub fn point_at(&self, angle: f32, length: f32) -> Point {
        let (dx, dy) = polar_offset(angle, length);
        self.center.offset(dx, dy)
    }

    /// The full-surface oval the 12 o'clock notch is cut against.
    pub fn bounds_oval(&self) -> Rect {
        Rect::new(0.0, 0.0, self.center.x * 2.0, self.center.y * 2.0)
    }
}

/// Hand directions for one instant, in degrees clockwise from 12.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAngles {
    pub hour: f32,
    pub minute: f32,
    pub second: f32,
}

impl HandAngles {
    /// The hour hand creeps with the minutes; the minute and second hands jump
    /// in whole steps.
    pub fn at<T: Timelike>(time: &T) -> Self {
        let hour = (time.hour() % 12) as f32 + time.minute() as f32 / 60.0;
        Self {
            hour: hour * DEGREES_PER_HOUR,
            minute: time.minute() as f32 * 6.0,
            second: time.second().min(59) as f32 * 6.0,
        }
    }

    pub fn hour_radians(&self) -> f32 {
        self.hour.to_radians()
    }

    pub fn minute_radians(&self) -> f32 {
        self.minute.to_radians()
    }

    pub fn second_radians(&self) -> f32 {
        self.second.to_radians()
    }
}
