// Interfaces of the external output devices.
//
// Implementations wrap platform TTS engines and vibration motors; the core
// only ever talks to these traits.

use std::fmt;
use std::sync::Arc;

use super::alerts::model::{AlertId, Waveform};
use super::error::DeviceError;
use super::labels::Language;

/// One speak request. The device must echo `id` in its callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: AlertId,
    pub text: String,
    pub rate: f32,
}

/// Asynchronous progress reports from the speech device. Delivered at most
/// once per request, on any thread, possibly out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Started(AlertId),
    Done(AlertId),
    Error(AlertId),
}

impl DeviceEvent {
    pub fn id(&self) -> AlertId {
        match self {
            Self::Started(id) | Self::Done(id) | Self::Error(id) => *id,
        }
    }
}

pub trait SpeechDevice: Send + Sync {
    /// Queue `utterance` for output. Returns once the request is accepted,
    /// completion is reported through a `DeviceEvent`.
    fn speak(&self, utterance: &Utterance) -> Result<(), DeviceError>;

    /// Stop any output immediately. No completion is expected afterwards.
    fn stop(&self);

    fn set_language(&self, language: Language) -> Result<(), DeviceError>;
}

pub trait Vibrator: Send + Sync {
    /// Fire-and-forget.
    fn vibrate(&self, waveform: &Waveform) -> Result<(), DeviceError>;
}

/// One-time user-visible notices (the platform shows them as toasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Speech is unusable; only vibration feedback remains.
    SpeechUnavailable(String),
    SpeechRestored,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpeechUnavailable(reason) => {
                write!(f, "Voice feedback unavailable ({reason}); vibration only")
            }
            Self::SpeechRestored => f.write_str("Voice feedback restored"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Logs notices instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        log::warn!("{}", notice);
    }
}

/// The device set one scheduler drives.
#[derive(Clone)]
pub struct Devices {
    pub speech: Arc<dyn SpeechDevice>,
    pub vibrator: Arc<dyn Vibrator>,
    pub notifier: Arc<dyn Notifier>,
}

impl Devices {
    pub fn new(speech: Arc<dyn SpeechDevice>, vibrator: Arc<dyn Vibrator>) -> Self {
        Self {
            speech,
            vibrator,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
