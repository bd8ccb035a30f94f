use std::fs;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use super::alerts::model::{PriorityWeights, SuppressionWindows};
use super::context::RateLimit;
use super::error::Result;
use super::labels::Language;
use super::zone::ZoneBoundaries;

pub const MIN_SPEECH_RATE: f32 = 0.5;
pub const MAX_SPEECH_RATE: f32 = 2.0;

/// Danger sensitivity, mapped to a detector confidence cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityTier {
    High,
    #[default]
    Medium,
    Low,
}

impl SensitivityTier {
    pub fn confidence_cutoff(self) -> f32 {
        match self {
            Self::High => 0.3,
            Self::Medium => 0.4,
            Self::Low => 0.5,
        }
    }
}

/// Empirical tuning constants. Every field has a serde default so a
/// settings file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub zones: ZoneBoundaries,
    pub rate_limit: RateLimit,
    pub suppression: SuppressionWindows,
    pub priority: PriorityWeights,
    /// Same-label detections overlapping more than this are merged.
    pub merge_overlap: f32,
    pub critical_confidence: f32,
    /// Normalized box width above which a dangerous object is critical.
    pub critical_width: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            zones: ZoneBoundaries::default(),
            rate_limit: RateLimit::default(),
            suppression: SuppressionWindows::default(),
            priority: PriorityWeights::default(),
            merge_overlap: 0.6,
            critical_confidence: 0.7,
            critical_width: 0.25,
        }
    }
}

/// User-facing feedback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub speech_enabled: bool,
    /// Multiplier passed to the speech engine, kept within
    /// [`MIN_SPEECH_RATE`, `MAX_SPEECH_RATE`].
    pub speech_rate: f32,
    pub language: Language,
    pub sensitivity: SensitivityTier,
    /// Overrides the sensitivity tier when set.
    pub confidence_threshold: Option<f32>,
    pub batch_interval_ms: u64,
    /// Pause before each speak call, for engines that drop requests issued
    /// right after the previous utterance.
    pub speech_dispatch_delay_ms: u64,
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            speech_rate: 1.2,
            language: Language::English,
            sensitivity: SensitivityTier::Medium,
            confidence_threshold: None,
            batch_interval_ms: 50,
            speech_dispatch_delay_ms: 0,
            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
            .filter(|t| t.is_finite())
            .map_or_else(|| self.sensitivity.confidence_cutoff(), |t| t.clamp(0.0, 1.0))
    }

    pub fn speech_rate(&self) -> f32 {
        if self.speech_rate.is_finite() {
            self.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE)
        } else {
            1.0
        }
    }

    pub fn batch_interval_ms(&self) -> u64 {
        self.batch_interval_ms.max(1)
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => warn!("Ignoring malformed {}: {}", self.config_path.display(), e),
                },
                Err(e) => warn!("Failed to read {}: {}", self.config_path.display(), e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}
