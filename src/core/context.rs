// Per-label memory that throttles repeated routine reports.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::alerts::model::Urgency;

/// Tuning for the adaptive re-report interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimit {
    pub min_report_interval_ms: u64,
    pub min_speed_factor: f32,
    pub max_speed_factor: f32,
    /// Applied on every evaluation of an already-known label.
    pub decay_rate: f32,
    /// Applied when a report is accepted.
    pub growth_rate: f32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            min_report_interval_ms: 800,
            min_speed_factor: 0.5,
            max_speed_factor: 2.0,
            decay_rate: 0.9,
            growth_rate: 1.1,
        }
    }
}

impl RateLimit {
    fn base_interval(&self, urgency: Urgency) -> Duration {
        let ms = self.min_report_interval_ms;
        Duration::from_millis(match urgency {
            Urgency::Caution => ms / 2,
            Urgency::Danger => ms * 2 / 3,
            Urgency::Plain => ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectContext {
    pub last_report: Option<Instant>,
    pub speed_factor: f32,
    pub accepted: u32,
    pub suppressed: u32,
}

impl Default for ObjectContext {
    fn default() -> Self {
        Self {
            last_report: None,
            speed_factor: 1.0,
            accepted: 0,
            suppressed: 0,
        }
    }
}

/// Keyed by spoken label. Entries live for the whole session; the label
/// vocabulary is small and fixed.
#[derive(Debug, Default)]
pub struct ContextMemory {
    contexts: HashMap<String, ObjectContext>,
    limits: RateLimit,
}

impl ContextMemory {
    pub fn new(limits: RateLimit) -> Self {
        Self {
            contexts: HashMap::new(),
            limits,
        }
    }

    pub fn set_limits(&mut self, limits: RateLimit) {
        self.limits = limits;
    }

    /// Decide whether a routine report for `label` may go out now, updating
    /// the label's context either way.
    pub fn should_report(&mut self, label: &str, urgency: Urgency, now: Instant) -> bool {
        let limits = &self.limits;
        let context = self
            .contexts
            .entry(label.to_string())
            .and_modify(|c| {
                c.speed_factor = (c.speed_factor * limits.decay_rate).max(limits.min_speed_factor);
            })
            .or_default();

        let required = limits
            .base_interval(urgency)
            .div_f32(context.speed_factor.max(f32::EPSILON));
        let due = context
            .last_report
            .map_or(true, |last| now.saturating_duration_since(last) > required);

        if due {
            context.last_report = Some(now);
            context.speed_factor =
                (context.speed_factor * limits.growth_rate).min(limits.max_speed_factor);
            context.accepted += 1;
        } else {
            context.suppressed += 1;
        }
        due
    }

    pub fn get(&self, label: &str) -> Option<&ObjectContext> {
        self.contexts.get(label)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
