//! Contains common, primitive types shared across the face.
//!
//! This module defines the color type, the display mode and the identifiers
//! used to track event reloads. Using distinct types improves type safety and
//! code clarity.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A 24-bit RGB color.
///
/// Colors are written as `#RRGGBB` in configuration files. When built from an
/// integer, the high byte is ignored so that ARGB values coming from a calendar
/// provider can be passed straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from a packed `0x??RRGGBB` value.
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            anyhow::bail!("expected a color like #RRGGBB, got '{}'", s);
        }
        let packed = u32::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("invalid color '{}': {}", s, e))?;
        Ok(Self::from_u32(packed))
    }
}

impl TryFrom<String> for Rgb {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How much fidelity the face is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Full color, ticking second hand, tick rings and date label.
    Interactive,
    /// Low-power rendering with no per-second updates.
    Ambient,
}

impl DisplayMode {
    pub fn is_ambient(self) -> bool {
        matches!(self, DisplayMode::Ambient)
    }
}

/// Identifies one event reload request.
///
/// Ids are handed out in increasing order and never reused, so a completion
/// carrying a stale id can always be told apart from the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReloadId(pub u64);

impl fmt::Display for ReloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reload#{}", self.0)
    }
}
