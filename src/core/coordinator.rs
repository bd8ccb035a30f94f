use std::time::Instant;

use super::alerts::builder::MessageBuilder;
use super::alerts::model::SpeechItem;
use super::config::Settings;
use super::merger;
use super::model::{Detection, DetectionFrame};

pub struct CoordinatorOutput {
    pub items: Vec<SpeechItem>,
    /// Detections that survived merging this cycle.
    pub merged: usize,
}

/// Batch side of the pipeline: collects frames between ticks, then merges
/// and builds messages once per batch interval.
pub struct Coordinator {
    builder: MessageBuilder,
    pending: Vec<Detection>,
}

impl Coordinator {
    pub fn new(builder: MessageBuilder) -> Self {
        Self {
            builder,
            pending: Vec::new(),
        }
    }

    /// Normalize and hold a frame until the next tick.
    pub fn push(&mut self, frame: DetectionFrame) {
        self.pending.extend(frame.into_normalized());
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn tick(&mut self, settings: &Settings, now: Instant) -> CoordinatorOutput {
        let batch = std::mem::take(&mut self.pending);
        self.process_batch(batch, settings, now)
    }

    pub fn process_batch(
        &mut self,
        detections: Vec<Detection>,
        settings: &Settings,
        now: Instant,
    ) -> CoordinatorOutput {
        if detections.is_empty() {
            return CoordinatorOutput {
                items: Vec::new(),
                merged: 0,
            };
        }

        self.builder.configure(&settings.tuning);
        let merged = merger::merge(detections, settings.tuning.merge_overlap);
        let items = merged
            .iter()
            .filter_map(|detection| self.builder.build(detection, settings, now))
            .collect();

        CoordinatorOutput {
            items,
            merged: merged.len(),
        }
    }

    pub fn builder(&self) -> &MessageBuilder {
        &self.builder
    }
}
