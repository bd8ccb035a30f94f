// Console stand-ins for the speech engine and vibration motor, used by the
// trace replay binary.

use std::time::Duration;

use log::info;

use crate::app::DeviceEventSender;
use crate::core::alerts::model::Waveform;
use crate::core::devices::{SpeechDevice, Utterance, Vibrator};
use crate::core::error::DeviceError;
use crate::core::labels::Language;

const MS_PER_CHAR: f64 = 60.0;
const MIN_UTTERANCE_MS: f64 = 300.0;

/// How long a real engine would need for `utterance`.
pub fn speaking_time(utterance: &Utterance) -> Duration {
    let rate = if utterance.rate > 0.0 {
        f64::from(utterance.rate)
    } else {
        1.0
    };
    let chars = utterance.text.chars().count() as f64;
    Duration::from_secs_f64((chars * MS_PER_CHAR / rate).max(MIN_UTTERANCE_MS) / 1000.0)
}

/// Logs each utterance and reports completion after `speaking_time`.
pub struct ConsoleSpeech {
    events: DeviceEventSender,
}

impl ConsoleSpeech {
    pub fn new(events: DeviceEventSender) -> Self {
        Self { events }
    }
}

impl SpeechDevice for ConsoleSpeech {
    fn speak(&self, utterance: &Utterance) -> Result<(), DeviceError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| DeviceError::Unavailable)?;
        info!("[speech x{:.1}] {}", utterance.rate, utterance.text);

        let events = self.events.clone();
        let id = utterance.id;
        let duration = speaking_time(utterance);
        events.started(id);
        runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            events.done(id);
        });
        Ok(())
    }

    fn stop(&self) {
        info!("[speech] stop");
    }

    fn set_language(&self, language: Language) -> Result<(), DeviceError> {
        info!("[speech] language {}", language);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleVibrator;

impl Vibrator for ConsoleVibrator {
    fn vibrate(&self, waveform: &Waveform) -> Result<(), DeviceError> {
        info!("[vibrate] {:?} ({} ms)", waveform.0, waveform.total().as_millis());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::model::AlertId;

    #[test]
    fn test_speaking_time_scales_with_rate() {
        let utterance = Utterance {
            id: AlertId::next(),
            text: "a".repeat(20),
            rate: 1.0,
        };
        assert_eq!(speaking_time(&utterance), Duration::from_millis(1200));

        let faster = Utterance {
            rate: 2.0,
            ..utterance.clone()
        };
        assert_eq!(speaking_time(&faster), Duration::from_millis(600));

        let short = Utterance {
            text: "hi".into(),
            ..utterance
        };
        assert_eq!(speaking_time(&short), Duration::from_millis(300));
    }
}
