// Alert model types: priorities, directions, speech items and their tuning.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::zone::Zone;

static NEXT_ALERT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque request id handed to the speech device and echoed in its callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlertId(pub u64);

impl AlertId {
    pub fn next() -> Self {
        Self(NEXT_ALERT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Normal,
}

impl Priority {
    /// Vibration pattern (alternating off/on milliseconds) paired with each priority.
    pub fn waveform(&self) -> Waveform {
        Waveform(match self {
            Self::Critical => vec![0, 500, 200, 300],
            Self::High => vec![0, 300, 100, 200],
            Self::Normal => vec![0, 200],
        })
    }
}

/// How urgent a phrase sounds; shortens the per-label report interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Plain,
    Caution,
    Danger,
}

/// Where an alert points the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Used by critical alerts regardless of the precise zone.
    Center,
    Zone(Zone),
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Center => f.write_str("center"),
            Self::Zone(zone) => fmt::Display::fmt(zone, f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waveform(pub Vec<u64>);

impl Waveform {
    pub fn total(&self) -> Duration {
        Duration::from_millis(self.0.iter().sum())
    }
}

/// Base weights and the ageing window for dynamic priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub critical: f64,
    pub high: f64,
    pub normal: f64,
    pub decay_window_ms: u64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            critical: 1000.0,
            high: 800.0,
            normal: 500.0,
            decay_window_ms: 5000,
        }
    }
}

impl PriorityWeights {
    pub fn weight(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Normal => self.normal,
        }
    }
}

/// Minimum time between two emissions sharing a dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionWindows {
    pub critical_ms: u64,
    pub high_ms: u64,
    pub normal_ms: u64,
}

impl Default for SuppressionWindows {
    fn default() -> Self {
        Self {
            critical_ms: 5000,
            high_ms: 3000,
            normal_ms: 2000,
        }
    }
}

impl SuppressionWindows {
    pub fn window(&self, priority: Priority) -> Duration {
        Duration::from_millis(match priority {
            Priority::Critical => self.critical_ms,
            Priority::High => self.high_ms,
            Priority::Normal => self.normal_ms,
        })
    }

    pub fn longest(&self) -> Duration {
        Duration::from_millis(self.critical_ms.max(self.high_ms).max(self.normal_ms))
    }
}

/// Key of the recent-message ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub label: String,
    pub direction: Direction,
    pub text_hash: u64,
}

/// One alert waiting to be spoken. Equality is (label, direction, text);
/// the id only correlates device callbacks.
#[derive(Debug, Clone)]
pub struct SpeechItem {
    pub id: AlertId,
    pub text: String,
    pub direction: Direction,
    pub priority: Priority,
    pub label: String,
    pub created_at: Instant,
    pub vibration: Option<Waveform>,
}

impl SpeechItem {
    pub fn new(
        text: impl Into<String>,
        direction: Direction,
        priority: Priority,
        label: impl Into<String>,
        created_at: Instant,
    ) -> Self {
        Self {
            id: AlertId::next(),
            text: text.into(),
            direction,
            priority,
            label: label.into(),
            created_at,
            vibration: Some(priority.waveform()),
        }
    }

    /// `weight * (1 - min(age, window) / window)`: reaches zero once the
    /// item has waited a full decay window.
    pub fn dynamic_priority(&self, now: Instant, weights: &PriorityWeights) -> f64 {
        let window = weights.decay_window_ms.max(1) as f64;
        let age = now.saturating_duration_since(self.created_at).as_secs_f64() * 1000.0;
        let age_factor = 1.0 - age.min(window) / window;
        weights.weight(self.priority) * age_factor
    }

    /// Same object in the same zone.
    pub fn same_slot(&self, other: &SpeechItem) -> bool {
        self.label == other.label && self.direction == other.direction
    }

    pub fn ledger_key(&self) -> LedgerKey {
        let mut hasher = DefaultHasher::new();
        self.text.hash(&mut hasher);
        LedgerKey {
            label: self.label.clone(),
            direction: self.direction,
            text_hash: hasher.finish(),
        }
    }
}

impl PartialEq for SpeechItem {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.direction == other.direction && self.text == other.text
    }
}

impl Eq for SpeechItem {}
