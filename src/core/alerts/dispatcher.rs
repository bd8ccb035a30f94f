// Output dispatcher: drives the speech device through its asynchronous
// start/done/error protocol and fires vibration alongside accepted alerts.
//
//   Idle --dispatch(item)--> Speaking(item)
//   Speaking(id) --Done(id) | Error(id)--> Idle
//
// Callbacks carrying any other id are stale and ignored.

use std::sync::Arc;

use log::{debug, info, warn};

use super::model::{AlertId, SpeechItem, Waveform};
use crate::core::devices::{
    DeviceEvent, Devices, Notice, Notifier, SpeechDevice, Utterance, Vibrator,
};
use crate::core::error::DeviceError;
use crate::core::labels::Language;

#[derive(Debug, Clone, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    Speaking(SpeechItem),
}

pub struct OutputDispatcher {
    state: DispatchState,
    speech: Arc<dyn SpeechDevice>,
    vibrator: Arc<dyn Vibrator>,
    notifier: Arc<dyn Notifier>,
    enabled: bool,
    rate: f32,
    /// Cleared by configuration errors until a language is set successfully.
    ready: bool,
    /// Whether the current outage has already been surfaced.
    notified: bool,
}

impl OutputDispatcher {
    pub fn new(devices: Devices) -> Self {
        Self {
            state: DispatchState::Idle,
            speech: devices.speech,
            vibrator: devices.vibrator,
            notifier: devices.notifier,
            enabled: true,
            rate: 1.0,
            ready: true,
            notified: false,
        }
    }

    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DispatchState::Idle)
    }

    pub fn current(&self) -> Option<&SpeechItem> {
        match &self.state {
            DispatchState::Speaking(item) => Some(item),
            DispatchState::Idle => None,
        }
    }

    pub fn current_id(&self) -> Option<AlertId> {
        self.current().map(|item| item.id)
    }

    /// Speech output is possible at all (vibration works regardless).
    pub fn can_speak(&self) -> bool {
        self.enabled && self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    /// Hand `item` to the speech device. On failure the slot is released and
    /// the item is gone for good.
    pub fn dispatch(&mut self, item: SpeechItem) -> Result<(), DeviceError> {
        let utterance = Utterance {
            id: item.id,
            text: item.text.clone(),
            rate: self.rate,
        };
        debug!("Dispatching {} [{}] {:?}", item.id, item.direction, item.text);
        self.state = DispatchState::Speaking(item);

        if let Err(e) = self.speech.speak(&utterance) {
            self.state = DispatchState::Idle;
            if e.is_configuration() {
                self.degrade(&e);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Apply a device callback. Returns true when the speaking slot was freed.
    pub fn on_event(&mut self, event: DeviceEvent) -> bool {
        let is_current = self.current_id() == Some(event.id());
        match event {
            DeviceEvent::Started(id) if is_current => {
                debug!("Speech started for {}", id);
                false
            }
            DeviceEvent::Done(id) | DeviceEvent::Error(id) if is_current => {
                if let DeviceEvent::Error(_) = event {
                    warn!("Speech device reported an error for {}", id);
                }
                self.state = DispatchState::Idle;
                true
            }
            _ => {
                debug!("Ignoring stale device event {:?}", event);
                false
            }
        }
    }

    pub fn vibrate(&self, waveform: &Waveform) {
        if let Err(e) = self.vibrator.vibrate(waveform) {
            warn!("Vibration failed: {}", e);
        }
    }

    /// Silence the device and forget the in-flight utterance; its completion
    /// callback, if any, becomes stale.
    pub fn stop(&mut self) {
        if let DispatchState::Speaking(item) = std::mem::take(&mut self.state) {
            debug!("Abandoning in-flight {}", item.id);
        }
        self.speech.stop();
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), DeviceError> {
        match self.speech.set_language(language) {
            Ok(()) => {
                info!("Speech language set to {}", language);
                if !self.ready && self.notified {
                    self.notifier.notify(&Notice::SpeechRestored);
                }
                self.ready = true;
                self.notified = false;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to set speech language {}: {}", language, e);
                if e.is_configuration() {
                    self.degrade(&e);
                }
                Err(e)
            }
        }
    }

    fn degrade(&mut self, error: &DeviceError) {
        self.ready = false;
        if !self.notified {
            self.notifier
                .notify(&Notice::SpeechUnavailable(error.to_string()));
            self.notified = true;
        }
    }
}
