use log::debug;
use serde::{Deserialize, Serialize};

use super::error::FeedbackError;

pub type Label = String;

/// Axis-aligned box. Units are either sensor pixels or normalized [0,1],
/// consistently within one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Box of the given size centred on `(center_x, center_y)`.
    pub fn centered(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self::new(
            center_x - width / 2.0,
            center_y - height / 2.0,
            center_x + width / 2.0,
            center_y + height / 2.0,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    /// Intersection over union. Zero when the union is empty, so two
    /// degenerate boxes never collide.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let inter_w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let inter_h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        let intersection = inter_w * inter_h;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    fn clamped_unit(&self) -> Self {
        Self::new(
            self.left.clamp(0.0, 1.0),
            self.top.clamp(0.0, 1.0),
            self.right.clamp(0.0, 1.0),
            self.bottom.clamp(0.0, 1.0),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub label: Label,
    pub score: f32,
}

impl Category {
    pub fn new(label: impl Into<Label>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// One detector result: a box plus one or more (label, confidence) pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    pub categories: Vec<Category>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<Category>) -> Self {
        Self {
            bounding_box,
            categories,
        }
    }

    pub fn single(bounding_box: BoundingBox, label: &str, score: f32) -> Self {
        Self::new(bounding_box, vec![Category::new(label, score)])
    }

    /// The only category used downstream.
    pub fn top_category(&self) -> Option<&Category> {
        self.categories
            .iter()
            .filter(|c| c.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Clockwise rotation needed to bring a sensor frame upright.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Result<Self, FeedbackError> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(FeedbackError::InvalidRotation(other)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

impl TryFrom<u32> for Rotation {
    type Error = FeedbackError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_degrees(value)
    }
}

impl From<Rotation> for u32 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Sensor frame size and rotation metadata delivered by the camera pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: Rotation,
}

impl FrameGeometry {
    /// Rotate a sensor-space box upright and scale it into [0,1].
    pub fn normalize(&self, b: &BoundingBox) -> BoundingBox {
        let (w, h) = (self.width, self.height);
        let (upright, out_w, out_h) = match self.rotation {
            Rotation::Deg0 => (*b, w, h),
            Rotation::Deg90 => (
                BoundingBox::new(h - b.bottom, b.left, h - b.top, b.right),
                h,
                w,
            ),
            Rotation::Deg180 => (
                BoundingBox::new(w - b.right, h - b.bottom, w - b.left, h - b.top),
                w,
                h,
            ),
            Rotation::Deg270 => (
                BoundingBox::new(b.top, w - b.right, b.bottom, w - b.left),
                h,
                w,
            ),
        };
        BoundingBox::new(
            upright.left / out_w,
            upright.top / out_h,
            upright.right / out_w,
            upright.bottom / out_h,
        )
        .clamped_unit()
    }
}

/// Everything the detector produced for one processed camera frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    #[serde(default)]
    pub geometry: Option<FrameGeometry>,
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn normalized(detections: Vec<Detection>) -> Self {
        Self {
            geometry: None,
            detections,
        }
    }

    pub fn in_pixels(geometry: FrameGeometry, detections: Vec<Detection>) -> Self {
        Self {
            geometry: Some(geometry),
            detections,
        }
    }

    /// Detections in normalized upright coordinates. Malformed entries are
    /// dropped rather than reported.
    pub fn into_normalized(self) -> Vec<Detection> {
        let geometry = self
            .geometry
            .filter(|g| g.width > 0.0 && g.height > 0.0);
        if self.geometry.is_some() && geometry.is_none() {
            debug!("Dropping frame with empty geometry");
            return Vec::new();
        }

        self.detections
            .into_iter()
            .filter_map(|mut detection| {
                if detection.categories.is_empty() || !detection.bounding_box.is_finite() {
                    debug!("Dropping malformed detection: {:?}", detection);
                    return None;
                }
                detection.bounding_box = match &geometry {
                    Some(g) => g.normalize(&detection.bounding_box),
                    None => detection.bounding_box.clamped_unit(),
                };
                Some(detection)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_overlap_ratio_identical_boxes() {
        let b = BoundingBox::new(0.1, 0.1, 0.5, 0.5);
        assert!(approx(b.overlap_ratio(&b), 1.0));
    }

    #[test]
    fn test_overlap_ratio_zero_area() {
        let a = BoundingBox::new(0.2, 0.2, 0.2, 0.2);
        assert_eq!(a.overlap_ratio(&a), 0.0);
    }

    #[test]
    fn test_overlap_ratio_partial() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 1.0);
        let b = BoundingBox::new(1.0, 0.0, 3.0, 1.0);
        // intersection 1, union 3
        assert!(approx(a.overlap_ratio(&b), 1.0 / 3.0));
    }

    #[test]
    fn test_top_category() {
        let d = Detection::new(
            BoundingBox::new(0.0, 0.0, 0.1, 0.1),
            vec![Category::new("cup", 0.3), Category::new("bowl", 0.8)],
        );
        assert_eq!(d.top_category().unwrap().label, "bowl");
    }

    #[test]
    fn test_rotation_parse() {
        assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::Deg270);
        assert!(Rotation::from_degrees(45).is_err());
    }

    #[test]
    fn test_normalize_without_rotation() {
        let g = FrameGeometry {
            width: 640.0,
            height: 480.0,
            rotation: Rotation::Deg0,
        };
        let b = g.normalize(&BoundingBox::new(320.0, 0.0, 640.0, 240.0));
        assert!(approx(b.left, 0.5) && approx(b.right, 1.0) && approx(b.bottom, 0.5));
    }

    #[test]
    fn test_normalize_rotations() {
        let sensor = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        let g = |rotation| FrameGeometry {
            width: 400.0,
            height: 200.0,
            rotation,
        };

        // Top-left of the sensor lands top-right when turned 90 degrees clockwise.
        let b = g(Rotation::Deg90).normalize(&sensor);
        assert!(approx(b.left, 0.75) && approx(b.right, 1.0));
        assert!(approx(b.top, 0.0) && approx(b.bottom, 0.25));

        let b = g(Rotation::Deg180).normalize(&sensor);
        assert!(approx(b.left, 0.75) && approx(b.top, 0.75));

        let b = g(Rotation::Deg270).normalize(&sensor);
        assert!(approx(b.left, 0.0) && approx(b.right, 0.25));
        assert!(approx(b.top, 0.75) && approx(b.bottom, 1.0));
    }

    #[test]
    fn test_into_normalized_drops_malformed() {
        let frame = DetectionFrame::normalized(vec![
            Detection::new(BoundingBox::new(0.0, 0.0, 0.1, 0.1), Vec::new()),
            Detection::single(BoundingBox::new(f32::NAN, 0.0, 0.1, 0.1), "cup", 0.9),
            Detection::single(BoundingBox::new(-0.2, 0.0, 0.3, 1.4), "cup", 0.9),
        ]);
        let out = frame.into_normalized();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bounding_box.left, 0.0);
        assert_eq!(out[0].bounding_box.bottom, 1.0);
    }

    #[test]
    fn test_frame_json_shape() {
        let json = r#"{"geometry":{"width":640,"height":480,"rotation":90},
            "detections":[{"box":{"left":1,"top":2,"right":3,"bottom":4},
            "categories":[{"label":"car","score":0.9}]}]}"#;
        let frame: DetectionFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.geometry.unwrap().rotation, Rotation::Deg90);
        assert_eq!(frame.detections[0].categories[0].label, "car");
    }
}
