// Collapses near-duplicate detections gathered during one batch window.

use log::debug;

use super::labels;
use super::model::Detection;

fn label_key(detection: &Detection) -> Option<String> {
    detection.top_category().map(|c| labels::canonical(&c.label))
}

/// Keep one detection per physical object. Candidates are taken widest
/// first; a candidate is dropped when an already kept detection has the same
/// canonical top label and overlaps it by more than `overlap_threshold`.
pub fn merge(mut detections: Vec<Detection>, overlap_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.bounding_box.width().total_cmp(&a.bounding_box.width()));

    let mut kept: Vec<(Option<String>, Detection)> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let key = label_key(&candidate);
        let duplicate = kept.iter().any(|(kept_key, k)| {
            *kept_key == key
                && k.bounding_box.overlap_ratio(&candidate.bounding_box) > overlap_threshold
        });
        if duplicate {
            debug!("Merged duplicate {:?}", key);
        } else {
            kept.push((key, candidate));
        }
    }
    kept.into_iter().map(|(_, detection)| detection).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::BoundingBox;

    fn det(label: &str, b: BoundingBox) -> Detection {
        Detection::single(b, label, 0.8)
    }

    #[test]
    fn test_identical_boxes_merge() {
        let b = BoundingBox::new(0.4, 0.4, 0.6, 0.6);
        let merged = merge(vec![det("cup", b), det("cup", b)], 0.6);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_different_labels_kept() {
        let b = BoundingBox::new(0.4, 0.4, 0.6, 0.6);
        let merged = merge(vec![det("cup", b), det("bowl", b)], 0.6);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_label_spelling_variants_merge() {
        let b = BoundingBox::new(0.4, 0.4, 0.6, 0.6);
        assert_eq!(merge(vec![det("Car", b), det("car", b)], 0.6).len(), 1);
        assert_eq!(
            merge(vec![det("traffic_light", b), det("traffic light", b)], 0.6).len(),
            1
        );
    }

    #[test]
    fn test_widest_instance_wins() {
        let small = BoundingBox::new(0.40, 0.4, 0.58, 0.6);
        let large = BoundingBox::new(0.40, 0.4, 0.60, 0.6);
        let merged = merge(vec![det("cup", small), det("cup", large)], 0.6);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bounding_box, large);
    }

    #[test]
    fn test_separate_objects_kept() {
        let left = BoundingBox::new(0.0, 0.4, 0.2, 0.6);
        let right = BoundingBox::new(0.8, 0.4, 1.0, 0.6);
        assert_eq!(merge(vec![det("cup", left), det("cup", right)], 0.6).len(), 2);
    }

    #[test]
    fn test_zero_area_boxes_never_collide() {
        let point = BoundingBox::new(0.5, 0.5, 0.5, 0.5);
        assert_eq!(merge(vec![det("cup", point), det("cup", point)], 0.6).len(), 2);
    }
}
