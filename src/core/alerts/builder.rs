// Message builder - turns one merged detection into at most one alert.

use std::time::Instant;

use log::debug;

use super::model::{Direction, Priority, SpeechItem};
use super::phrases::{self, PhraseSelector, RandomPhrase};
use crate::core::config::{Settings, Tuning};
use crate::core::context::ContextMemory;
use crate::core::labels;
use crate::core::model::Detection;
use crate::core::zone;

pub struct MessageBuilder {
    memory: ContextMemory,
    selector: Box<dyn PhraseSelector>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(Box::new(RandomPhrase::new()))
    }
}

impl MessageBuilder {
    pub fn new(selector: Box<dyn PhraseSelector>) -> Self {
        Self {
            memory: ContextMemory::default(),
            selector,
        }
    }

    /// Pick up rate-limit tuning changes.
    pub fn configure(&mut self, tuning: &Tuning) {
        self.memory.set_limits(tuning.rate_limit.clone());
    }

    pub fn memory(&self) -> &ContextMemory {
        &self.memory
    }

    /// Critical check first (never rate limited), then the routine path
    /// through context memory. `None` means the detection is silently dropped.
    pub fn build(
        &mut self,
        detection: &Detection,
        settings: &Settings,
        now: Instant,
    ) -> Option<SpeechItem> {
        let category = detection.top_category()?;
        if category.score < settings.confidence_threshold() || labels::is_placeholder(&category.label)
        {
            return None;
        }

        let tuning = &settings.tuning;
        let spoken = labels::localize(&category.label, settings.language);
        let bounds = &detection.bounding_box;

        if labels::is_dangerous(&category.label)
            && category.score > tuning.critical_confidence
            && bounds.width() > tuning.critical_width
        {
            let phrase = phrases::critical(&spoken, settings.language, self.selector.as_mut());
            return Some(SpeechItem::new(
                phrase.text,
                Direction::Center,
                Priority::Critical,
                spoken,
                now,
            ));
        }

        let zone = zone::classify(bounds, &tuning.zones);
        let phrase = phrases::routine(&spoken, zone, settings.language, self.selector.as_mut());
        if !self.memory.should_report(&spoken, phrase.urgency, now) {
            debug!("Rate limited {} in {}", spoken, zone);
            return None;
        }

        let priority = if zone.is_in_path() {
            Priority::High
        } else {
            Priority::Normal
        };
        Some(SpeechItem::new(
            phrase.text,
            Direction::Zone(zone),
            priority,
            spoken,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::phrases::FixedPhrase;
    use crate::core::labels::Language;
    use crate::core::model::BoundingBox;
    use crate::core::zone::Zone;
    use std::time::Duration;

    fn builder() -> MessageBuilder {
        MessageBuilder::new(Box::new(FixedPhrase(0)))
    }

    fn at(center_x: f32, width: f32, label: &str, score: f32) -> Detection {
        Detection::single(BoundingBox::centered(center_x, 0.5, width, 0.3), label, score)
    }

    #[test]
    fn test_low_confidence_dropped() {
        let mut b = builder();
        let settings = Settings::default();
        assert!(b.build(&at(0.5, 0.1, "cup", 0.35), &settings, Instant::now()).is_none());
        assert!(b.memory().is_empty());
    }

    #[test]
    fn test_placeholder_dropped() {
        let mut b = builder();
        let settings = Settings::default();
        let now = Instant::now();
        assert!(b.build(&at(0.5, 0.1, "unknown", 0.9), &settings, now).is_none());
        assert!(b.build(&at(0.5, 0.1, "background", 0.9), &settings, now).is_none());
    }

    #[test]
    fn test_large_car_is_critical() {
        let mut b = builder();
        let settings = Settings::default();
        let item = b
            .build(&at(0.2, 0.4, "car", 0.9), &settings, Instant::now())
            .unwrap();
        assert_eq!(item.priority, Priority::Critical);
        assert_eq!(item.direction, Direction::Center);
        assert_eq!(item.text, "Danger! car directly ahead");
        assert_eq!(item.vibration, Some(Priority::Critical.waveform()));
        // Critical alerts never touch context memory.
        assert!(b.memory().get("car").is_none());
    }

    #[test]
    fn test_critical_bypasses_rate_limit() {
        let mut b = builder();
        let settings = Settings::default();
        let t0 = Instant::now();
        for ms in [0, 10, 20] {
            let item = b.build(
                &at(0.5, 0.4, "truck", 0.95),
                &settings,
                t0 + Duration::from_millis(ms),
            );
            assert!(item.is_some());
        }
    }

    #[test]
    fn test_small_car_is_routine() {
        let mut b = builder();
        let settings = Settings::default();
        let item = b
            .build(&at(0.5, 0.1, "car", 0.9), &settings, Instant::now())
            .unwrap();
        assert_eq!(item.direction, Direction::Zone(Zone::Front));
        assert_eq!(item.priority, Priority::High);
        assert_eq!(item.text, "car straight ahead");
    }

    #[test]
    fn test_side_zone_is_normal_priority() {
        let mut b = builder();
        let settings = Settings::default();
        let item = b
            .build(&at(0.22, 0.05, "chair", 0.6), &settings, Instant::now())
            .unwrap();
        assert_eq!(item.direction, Direction::Zone(Zone::Left));
        assert_eq!(item.priority, Priority::Normal);
    }

    #[test]
    fn test_routine_repeat_rate_limited() {
        let mut b = builder();
        let settings = Settings::default();
        let t0 = Instant::now();
        let cup = at(0.5, 0.1, "cup", 0.5);
        assert!(b.build(&cup, &settings, t0).is_some());
        assert!(b.build(&cup, &settings, t0 + Duration::from_millis(200)).is_none());
        assert!(b.build(&cup, &settings, t0 + Duration::from_secs(3)).is_some());
    }

    #[test]
    fn test_chinese_labels() {
        let mut b = builder();
        let settings = Settings {
            language: Language::Chinese,
            ..Settings::default()
        };
        let item = b
            .build(&at(0.5, 0.1, "cup", 0.8), &settings, Instant::now())
            .unwrap();
        assert_eq!(item.label, "杯子");
        assert!(item.text.contains("杯子"));
    }
}
