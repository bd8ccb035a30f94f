// Recording fakes for the external devices.

use std::sync::{Arc, Mutex};

use super::alerts::model::{AlertId, Waveform};
use super::devices::{Devices, Notice, Notifier, SpeechDevice, Utterance, Vibrator};
use super::error::DeviceError;
use super::labels::Language;

#[derive(Default)]
struct RecState {
    utterances: Vec<Utterance>,
    vibrations: Vec<Waveform>,
    notices: Vec<Notice>,
    stops: usize,
    speak_failure: Option<DeviceError>,
    language_failure: Option<DeviceError>,
    vibration_fails: bool,
}

/// Shared view of everything the fake devices were asked to do.
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<Mutex<RecState>>,
}

impl Recorder {
    pub fn spoken(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .utterances
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn spoken_ids(&self) -> Vec<AlertId> {
        self.state.lock().unwrap().utterances.iter().map(|u| u.id).collect()
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.state.lock().unwrap().utterances.clone()
    }

    pub fn vibrations(&self) -> Vec<Waveform> {
        self.state.lock().unwrap().vibrations.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.state.lock().unwrap().notices.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn fail_next_speak(&self, error: DeviceError) {
        self.state.lock().unwrap().speak_failure = Some(error);
    }

    pub fn reject_language(&self, error: Option<DeviceError>) {
        self.state.lock().unwrap().language_failure = error;
    }

    pub fn fail_vibration(&self, fails: bool) {
        self.state.lock().unwrap().vibration_fails = fails;
    }
}

impl SpeechDevice for Recorder {
    fn speak(&self, utterance: &Utterance) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.speak_failure.take() {
            return Err(error);
        }
        state.utterances.push(utterance.clone());
        Ok(())
    }

    fn stop(&self) {
        self.state.lock().unwrap().stops += 1;
    }

    fn set_language(&self, _language: Language) -> Result<(), DeviceError> {
        match &self.state.lock().unwrap().language_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Vibrator for Recorder {
    fn vibrate(&self, waveform: &Waveform) -> Result<(), DeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.vibration_fails {
            return Err(DeviceError::Unavailable);
        }
        state.vibrations.push(waveform.clone());
        Ok(())
    }
}

impl Notifier for Recorder {
    fn notify(&self, notice: &Notice) {
        self.state.lock().unwrap().notices.push(notice.clone());
    }
}

pub fn recording_devices() -> (Devices, Recorder) {
    let recorder = Recorder::default();
    let devices = Devices::new(Arc::new(recorder.clone()), Arc::new(recorder.clone()))
        .with_notifier(Arc::new(recorder.clone()));
    (devices, recorder)
}
