//! Where the logo sits on the frame.

use std::str::FromStr;

/// Anchor for the logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    #[default]
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
    /// Centred on the frame.
    Center,
    /// Explicit offset of the logo's top-left corner. May be negative.
    At {
        /// Horizontal offset in pixels.
        x: i64,
        /// Vertical offset in pixels.
        y: i64,
    },
}

impl FromStr for Position {
    type Err = String;

    /// Parse a corner name (`top-right`, `br`, `center`, ...) or an
    /// explicit `X,Y` offset.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "top-left" | "tl" => return Ok(Position::TopLeft),
            "top-right" | "tr" => return Ok(Position::TopRight),
            "bottom-left" | "bl" => return Ok(Position::BottomLeft),
            "bottom-right" | "br" => return Ok(Position::BottomRight),
            "center" | "centre" | "c" => return Ok(Position::Center),
            _ => {}
        }

        let (x, y) = normalized
            .split_once(',')
            .ok_or_else(|| format!("unknown position: {value}"))?;
        let x = x
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid x offset in position: {value}"))?;
        let y = y
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid y offset in position: {value}"))?;
        Ok(Position::At { x, y })
    }
}

/// A position plus a margin from the anchored edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Anchor.
    pub position: Position,
    /// Distance in pixels from the anchored edges. Ignored for
    /// [`Position::Center`] and [`Position::At`].
    pub margin: u32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Position::TopRight,
            margin: 20,
        }
    }
}

impl Placement {
    /// Create a placement.
    pub fn new(position: Position, margin: u32) -> Self {
        Self { position, margin }
    }

    /// Offset of the logo's top-left corner for the given frame and logo
    /// sizes. The result may lie partly or wholly outside the frame.
    pub fn offset(
        &self,
        frame_width: u32,
        frame_height: u32,
        logo_width: u32,
        logo_height: u32,
    ) -> (i64, i64) {
        let margin = i64::from(self.margin);
        let right = i64::from(frame_width) - i64::from(logo_width) - margin;
        let bottom = i64::from(frame_height) - i64::from(logo_height) - margin;

        match self.position {
            Position::TopLeft => (margin, margin),
            Position::TopRight => (right, margin),
            Position::BottomLeft => (margin, bottom),
            Position::BottomRight => (right, bottom),
            Position::Center => (
                (i64::from(frame_width) - i64::from(logo_width)) / 2,
                (i64::from(frame_height) - i64::from(logo_height)) / 2,
            ),
            Position::At { x, y } => (x, y),
        }
    }
}
