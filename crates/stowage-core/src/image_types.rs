//! Resize strategy types shared by configuration and the image pipeline.

use std::str::FromStr;

/// How a source aspect ratio is mapped onto the requested box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the box exactly, cropping the overflow around the anchor
    #[default]
    Cover,
    /// Fit inside the box, letterboxing the remainder
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio
    Fill,
    /// Scale down (never up) so both sides fit inside the box
    Inside,
    /// Scale so both sides cover the box, without cropping
    Outside,
}

impl FromStr for FitMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            "outside" => Ok(FitMode::Outside),
            _ => Err(anyhow::anyhow!("Invalid fit mode: {}", s)),
        }
    }
}

/// Named gravity used for crop anchoring and watermark placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Center,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Anchor {
    /// Horizontal and vertical weights in {0, 0.5, 1}
    pub fn weights(self) -> (f32, f32) {
        match self {
            Anchor::Center => (0.5, 0.5),
            Anchor::North => (0.5, 0.0),
            Anchor::NorthEast => (1.0, 0.0),
            Anchor::East => (1.0, 0.5),
            Anchor::SouthEast => (1.0, 1.0),
            Anchor::South => (0.5, 1.0),
            Anchor::SouthWest => (0.0, 1.0),
            Anchor::West => (0.0, 0.5),
            Anchor::NorthWest => (0.0, 0.0),
        }
    }
}

impl FromStr for Anchor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace(['-', '_', ' '], "");
        match normalized.as_str() {
            "center" | "centre" => Ok(Anchor::Center),
            "north" | "top" => Ok(Anchor::North),
            "northeast" | "topright" | "righttop" => Ok(Anchor::NorthEast),
            "east" | "right" => Ok(Anchor::East),
            "southeast" | "bottomright" | "rightbottom" => Ok(Anchor::SouthEast),
            "south" | "bottom" => Ok(Anchor::South),
            "southwest" | "bottomleft" | "leftbottom" => Ok(Anchor::SouthWest),
            "west" | "left" => Ok(Anchor::West),
            "northwest" | "topleft" | "lefttop" => Ok(Anchor::NorthWest),
            _ => Err(anyhow::anyhow!("Invalid position: {}", s)),
        }
    }
}
