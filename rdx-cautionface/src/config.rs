//! Defines all configuration structures for the caution face.
//!
//! These structs are designed to be deserialized from a configuration file
//! (a TOML file) using `serde` and the `config` crate, with environment
//! overrides layered on top. Every field has a default, so an empty or
//! missing file yields the stock face.

use crate::common::Rgb;
use crate::layout::LayoutParams;
use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `CAUTIONFACE__TICK_RATE_MS=500`.
pub const ENV_PREFIX: &str = "CAUTIONFACE";

/// The top-level configuration for the `FaceEngine`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Interval of the interactive redraw timer, in milliseconds.
    pub tick_rate_ms: u64,

    /// How far ahead events are shown. Half the dial is twelve hours.
    pub window_hours: u32,

    /// Radius lost by each event stacked onto a running tier.
    pub stack_step: f32,

    /// Size of the drawing surface until the host reports otherwise.
    pub surface: SurfaceConfig,

    /// Timezone the dial reads in. Uses IANA names (e.g. "Europe/Oslo").
    pub timezone: Tz,

    /// Colors and stroke widths.
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: f32,
    pub height: f32,
}

/// Paint settings for every element of the face.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Rgb,
    pub hands: Rgb,
    pub ticks: Rgb,
    pub text: Rgb,
    pub event_stroke: Rgb,
    pub event_fill_ambient: Rgb,
    /// Used for events whose provider row carries no usable color.
    pub event_fill_default: Rgb,

    pub hour_hand_width: f32,
    pub minute_hand_width: f32,
    pub second_hand_width: f32,
    pub event_stroke_width: f32,
    pub tick1_width: f32,
    pub tick5_width: f32,
    pub tick15_width: f32,
    pub tick12_width: f32,
    pub date_text_size: f32,
}

impl FaceConfig {
    /// Loads the configuration from an optional TOML file plus environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read face configuration")?
            .try_deserialize()
            .context("invalid face configuration")
    }

    /// Parses the configuration from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .context("failed to parse face configuration")?
            .try_deserialize()
            .context("invalid face configuration")
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.window_hours))
    }

    /// Layout parameters for a face whose hour hand is `full_radius` long.
    pub fn layout_params(&self, full_radius: f32) -> LayoutParams {
        LayoutParams {
            window_hours: self.window_hours,
            full_radius,
            stack_step: self.stack_step,
        }
    }
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 1000,
            window_hours: 12,
            stack_step: 10.0,
            surface: SurfaceConfig::default(),
            timezone: Tz::UTC,
            palette: Palette::default(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 320.0,
            height: 320.0,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb::BLACK,
            hands: Rgb::WHITE,
            ticks: Rgb::new(0xBD, 0xBD, 0xBD),
            text: Rgb::new(0xEE, 0xEE, 0xEE),
            event_stroke: Rgb::new(0x42, 0x42, 0x42),
            event_fill_ambient: Rgb::new(0x61, 0x61, 0x61),
            event_fill_default: Rgb::new(0xFF, 0xA0, 0x00),
            hour_hand_width: 6.0,
            minute_hand_width: 4.0,
            second_hand_width: 2.0,
            event_stroke_width: 2.0,
            tick1_width: 1.0,
            tick5_width: 3.0,
            tick15_width: 5.0,
            tick12_width: 1.0,
            date_text_size: 28.0,
        }
    }
}
