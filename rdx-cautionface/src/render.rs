//! Describes one frame of the face as a list of draw operations.

use crate::common::DisplayMode;
use crate::config::Palette;
use crate::draw::{DrawOp, Paint, Path};
use crate::geometry::{
    dial_angle, polar_offset, FaceGeometry, HandAngles, Point, Rect, CENTER_CAP_RADIUS,
    DATE_LABEL_GAP, TICK15_INSET, TICK1_INSET, TICK5_INSET,
};
use crate::layout::Wedge;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Depth of the 12 o'clock notch below the top edge.
const NOTCH_DEPTH: f32 = 8.0;
const NOTCH_HALF_WIDTH: f32 = 4.0;
const NOTCH_ARC_START_DEG: f32 = 267.0;
const NOTCH_ARC_SWEEP_DEG: f32 = 4.0;

/// Weekday and month-day, e.g. "Mon 03-02".
const DATE_FORMAT: &str = "%a %m-%d";

/// Display flags the host reports alongside the mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceProperties {
    /// The panel shows fewer bits per color in ambient mode, so anti-aliasing
    /// only smears it.
    pub low_bit_ambient: bool,
}

/// Builds frames from the current time and the event wedges.
#[derive(Debug, Clone)]
pub struct FaceRenderer {
    palette: Palette,
}

/// A tick ring: lines every `period`th of a turn, then a background disc
/// that leaves only the outer `inset` of each line visible.
struct TickRing {
    period: f32,
    inset: f32,
}

const TICK_RINGS: [TickRing; 3] = [
    TickRing { period: 60.0, inset: TICK1_INSET },
    TickRing { period: 12.0, inset: TICK5_INSET },
    TickRing { period: 4.0, inset: TICK15_INSET },
];

impl FaceRenderer {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Renders one frame. Returns no operations when the surface is empty.
    pub fn render<T, I>(
        &self,
        now: &DateTime<T>,
        wedges: I,
        mode: DisplayMode,
        properties: FaceProperties,
        width: f32,
        height: f32,
    ) -> Vec<DrawOp>
    where
        T: TimeZone,
        T::Offset: Display,
        I: IntoIterator<Item = Wedge>,
    {
        let Some(geometry) = FaceGeometry::from_bounds(width, height) else {
            return Vec::new();
        };
        let ambient = mode.is_ambient();
        let anti_alias = !(ambient && properties.low_bit_ambient);
        let angles = HandAngles::at(now);
        let palette = &self.palette;
        let background = Paint::fill(palette.background);

        let mut ops = vec![DrawOp::FillRect {
            rect: Rect::new(0.0, 0.0, width, height),
            paint: background,
        }];

        if !ambient {
            self.push_tick_rings(&mut ops, &geometry);
        }

        let notch = Path::new()
            .move_to(Point::new(geometry.center.x, NOTCH_DEPTH))
            .line_to(Point::new(geometry.center.x - NOTCH_HALF_WIDTH, 0.0))
            .arc_to(geometry.bounds_oval(), NOTCH_ARC_START_DEG, NOTCH_ARC_SWEEP_DEG)
            .close();
        ops.push(DrawOp::Path {
            path: notch.clone(),
            paint: background,
        });
        ops.push(DrawOp::Path {
            path: notch,
            paint: Paint {
                stroke_width: palette.tick12_width,
                ..Paint::fill(palette.ticks)
            }
            .with_anti_alias(anti_alias),
        });

        let event_stroke = Paint::stroke(palette.event_stroke, palette.event_stroke_width);
        for wedge in wedges {
            let path = Self::wedge_path(&geometry, &wedge);
            let fill = if ambient {
                palette.event_fill_ambient
            } else {
                wedge.color
            };
            ops.push(DrawOp::Path {
                path: path.clone(),
                paint: Paint::fill(fill),
            });
            ops.push(DrawOp::Path {
                path,
                paint: event_stroke,
            });
        }

        let hand = |angle: f32, length: f32, stroke: f32| DrawOp::Line {
            from: geometry.center,
            to: geometry.point_at(angle, length),
            paint: Paint::stroke(palette.hands, stroke).with_anti_alias(anti_alias),
        };
        ops.push(hand(
            angles.minute_radians(),
            geometry.minute_hand_length(),
            palette.minute_hand_width,
        ));
        ops.push(hand(
            angles.hour_radians(),
            geometry.hour_hand_length(),
            palette.hour_hand_width,
        ));

        if !ambient {
            ops.push(hand(
                angles.second_radians(),
                geometry.second_hand_length(),
                palette.second_hand_width,
            ));
            ops.push(DrawOp::Text {
                text: now.format(DATE_FORMAT).to_string(),
                origin: Point::new(
                    geometry.center.x,
                    geometry.center.y - (geometry.hour_hand_length() + DATE_LABEL_GAP),
                ),
                size: palette.date_text_size,
                paint: Paint::fill(palette.text),
            });
        }

        ops.push(DrawOp::Circle {
            center: geometry.center,
            radius: CENTER_CAP_RADIUS,
            paint: background,
        });
        ops.push(DrawOp::Circle {
            center: geometry.center,
            radius: CENTER_CAP_RADIUS,
            paint: event_stroke,
        });
        ops
    }

    fn push_tick_rings(&self, ops: &mut Vec<DrawOp>, geometry: &FaceGeometry) {
        let widths = [
            self.palette.tick1_width,
            self.palette.tick5_width,
            self.palette.tick15_width,
        ];
        let center = geometry.center;
        for (ring, width) in TICK_RINGS.iter().zip(widths) {
            let paint = Paint::stroke(self.palette.ticks, width);
            // Each line is a full diameter, so half a turn covers the dial.
            let steps = (ring.period / 2.0) as u32;
            for step in 0..=steps {
                let (dx, dy) = polar_offset(
                    dial_angle(step as f32, ring.period),
                    geometry.radius,
                );
                ops.push(DrawOp::Line {
                    from: Point::new(center.x - dx, center.y - dy),
                    to: Point::new(center.x + dx, center.y + dy),
                    paint,
                });
            }
            ops.push(DrawOp::Circle {
                center,
                radius: geometry.radius - ring.inset,
                paint: Paint::fill(self.palette.background),
            });
        }
    }

    fn wedge_path(geometry: &FaceGeometry, wedge: &Wedge) -> Path {
        // Wedge angles are measured from 3 o'clock; the dial's from 12.
        let edge = (wedge.start_angle_deg + 90.0).to_radians();
        Path::new()
            .move_to(geometry.center)
            .line_to(geometry.point_at(edge, wedge.radius))
            .arc_to(
                Rect::around(geometry.center, wedge.radius),
                wedge.start_angle_deg,
                wedge.sweep_angle_deg,
            )
            .close()
    }
}
