// Qualitative direction/size zones derived from a normalized bounding box.
//
// Layout of the boundaries, left to right:
// [0.0]--[far_left]--[near_left]--[center_left]--[center_right]--[near_right]--[far_right]--[1.0]

use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::BoundingBox;

/// The sixteen zones, ordered left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Zone {
    FarLeft,
    Left,
    LeftLeaningRight,
    FrontLeftLeaningLeft,
    FrontLeft,
    FrontLeftLeaningRight,
    /// Large or near object spanning the visual centre.
    FrontWide,
    FrontLeaningLeft,
    Front,
    FrontLeaningRight,
    FrontRightLeaningLeft,
    FrontRight,
    FrontRightLeaningRight,
    RightLeaningLeft,
    Right,
    FarRight,
}

impl Zone {
    pub fn all() -> &'static [Zone] {
        &[
            Self::FarLeft,
            Self::Left,
            Self::LeftLeaningRight,
            Self::FrontLeftLeaningLeft,
            Self::FrontLeft,
            Self::FrontLeftLeaningRight,
            Self::FrontWide,
            Self::FrontLeaningLeft,
            Self::Front,
            Self::FrontLeaningRight,
            Self::FrontRightLeaningLeft,
            Self::FrontRight,
            Self::FrontRightLeaningRight,
            Self::RightLeaningLeft,
            Self::Right,
            Self::FarRight,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FarLeft => "far-left",
            Self::Left => "left",
            Self::LeftLeaningRight => "left-leaning-right",
            Self::FrontLeftLeaningLeft => "front-left-leaning-left",
            Self::FrontLeft => "front-left",
            Self::FrontLeftLeaningRight => "front-left-leaning-right",
            Self::FrontWide => "front-wide",
            Self::FrontLeaningLeft => "front-leaning-left",
            Self::Front => "front",
            Self::FrontLeaningRight => "front-leaning-right",
            Self::FrontRightLeaningLeft => "front-right-leaning-left",
            Self::FrontRight => "front-right",
            Self::FrontRightLeaningRight => "front-right-leaning-right",
            Self::RightLeaningLeft => "right-leaning-left",
            Self::Right => "right",
            Self::FarRight => "far-right",
        }
    }

    /// Zones that overlap the walking path.
    pub fn is_in_path(&self) -> bool {
        (Self::FrontLeftLeaningRight..=Self::FrontRightLeaningLeft).contains(self)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Empirical boundary constants. All values are fractions of frame width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneBoundaries {
    pub far_left: f32,
    pub near_left: f32,
    pub center_left: f32,
    pub center_right: f32,
    pub near_right: f32,
    pub far_right: f32,
    /// How far an edge must cross a boundary to count as "leaning".
    pub edge_margin: f32,
    /// Fraction of box width added to the centre for the far-left/far-right tests.
    pub width_offset: f32,
    /// Boxes wider than this in the central band are reported as front-wide.
    pub wide_width: f32,
}

impl Default for ZoneBoundaries {
    fn default() -> Self {
        Self {
            far_left: 0.15,
            near_left: 0.30,
            center_left: 0.40,
            center_right: 0.60,
            near_right: 0.70,
            far_right: 0.85,
            edge_margin: 0.05,
            width_offset: 0.35,
            wide_width: 0.3,
        }
    }
}

/// Classify a normalized box. Checks run left to right, first match wins.
pub fn classify(b: &BoundingBox, z: &ZoneBoundaries) -> Zone {
    let center_x = b.center_x();
    let width = b.width();
    let spread = width * z.width_offset;

    if center_x - spread < z.far_left {
        Zone::FarLeft
    } else if center_x < z.near_left {
        if b.right > z.near_left {
            Zone::LeftLeaningRight
        } else {
            Zone::Left
        }
    } else if center_x < z.center_left {
        if b.right > z.center_left + z.edge_margin {
            Zone::FrontLeftLeaningRight
        } else if b.left < z.near_left - z.edge_margin {
            Zone::FrontLeftLeaningLeft
        } else {
            Zone::FrontLeft
        }
    } else if center_x < z.center_right {
        if width > z.wide_width {
            Zone::FrontWide
        } else if b.left < z.center_left - z.edge_margin {
            Zone::FrontLeaningLeft
        } else if b.right > z.center_right + z.edge_margin {
            Zone::FrontLeaningRight
        } else {
            Zone::Front
        }
    } else if center_x < z.near_right {
        if b.left < z.center_right - z.edge_margin {
            Zone::FrontRightLeaningLeft
        } else if b.right > z.near_right + z.edge_margin {
            Zone::FrontRightLeaningRight
        } else {
            Zone::FrontRight
        }
    } else if center_x + spread > z.far_right {
        Zone::FarRight
    } else if b.left < z.near_right {
        Zone::RightLeaningLeft
    } else {
        Zone::Right
    }
}
