//! The draw-call vocabulary a frame is described in.
//!
//! A renderer produces a list of `DrawOp`s; whatever owns the real canvas
//! replays them in order. Nothing here touches pixels.

use crate::common::Rgb;
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    Fill,
    Stroke,
}

/// How a primitive is colored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Rgb,
    pub stroke_width: f32,
    pub style: PaintStyle,
    pub anti_alias: bool,
}

impl Paint {
    pub fn fill(color: Rgb) -> Self {
        Self {
            color,
            stroke_width: 0.0,
            style: PaintStyle::Fill,
            anti_alias: true,
        }
    }

    pub fn stroke(color: Rgb, width: f32) -> Self {
        Self {
            color,
            stroke_width: width,
            style: PaintStyle::Stroke,
            anti_alias: true,
        }
    }

    pub fn with_anti_alias(mut self, anti_alias: bool) -> Self {
        self.anti_alias = anti_alias;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Appends an arc of the ellipse inscribed in `oval`, connected to the
    /// current point by a straight segment. Degrees run clockwise from 3 o'clock.
    ArcTo {
        oval: Rect,
        start_deg: f32,
        sweep_deg: f32,
    },
    Close,
}

/// An even-odd filled outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, to: Point) -> Self {
        self.commands.push(PathCommand::MoveTo(to));
        self
    }

    pub fn line_to(mut self, to: Point) -> Self {
        self.commands.push(PathCommand::LineTo(to));
        self
    }

    pub fn arc_to(mut self, oval: Rect, start_deg: f32, sweep_deg: f32) -> Self {
        self.commands.push(PathCommand::ArcTo {
            oval,
            start_deg,
            sweep_deg,
        });
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }
}

/// What a frame is made of.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        rect: Rect,
        paint: Paint,
    },
    Line {
        from: Point,
        to: Point,
        paint: Paint,
    },
    Path {
        path: Path,
        paint: Paint,
    },
    Circle {
        center: Point,
        radius: f32,
        paint: Paint,
    },
    /// Text centered horizontally on `origin`, sitting on its baseline.
    Text {
        text: String,
        origin: Point,
        size: f32,
        paint: Paint,
    },
}

impl DrawOp {
    pub fn paint(&self) -> &Paint {
        match self {
            DrawOp::FillRect { paint, .. }
            | DrawOp::Line { paint, .. }
            | DrawOp::Path { paint, .. }
            | DrawOp::Circle { paint, .. }
            | DrawOp::Text { paint, .. } => paint,
        }
    }
}
