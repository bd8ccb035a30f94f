use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::alerts::builder::MessageBuilder;
use crate::core::alerts::model::{AlertId, SpeechItem};
use crate::core::alerts::phrases::PhraseSelector;
use crate::core::alerts::scheduler::AlertScheduler;
use crate::core::config::Settings;
use crate::core::coordinator::Coordinator;
use crate::core::devices::{DeviceEvent, Devices, SpeechDevice, Utterance};
use crate::core::error::{DeviceError, FeedbackError, Result};
use crate::core::labels::Language;
use crate::core::model::DetectionFrame;

enum Command {
    Enqueue(Vec<SpeechItem>),
    ApplySettings(Settings),
    Clear,
    Shutdown,
}

/// Speech devices post their progress callbacks here, from any thread.
#[derive(Clone)]
pub struct DeviceEventSender {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl DeviceEventSender {
    /// Fire-and-forget; events sent after shutdown are dropped.
    pub fn send(&self, event: DeviceEvent) {
        let _ = self.tx.send(event);
    }

    pub fn started(&self, id: AlertId) {
        self.send(DeviceEvent::Started(id));
    }

    pub fn done(&self, id: AlertId) {
        self.send(DeviceEvent::Done(id));
    }

    pub fn error(&self, id: AlertId) {
        self.send(DeviceEvent::Error(id));
    }
}

pub struct DeviceEventReceiver {
    rx: mpsc::UnboundedReceiver<DeviceEvent>,
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl DeviceEventReceiver {
    pub fn sender(&self) -> DeviceEventSender {
        DeviceEventSender {
            tx: self.tx.clone(),
        }
    }
}

pub fn device_event_channel() -> (DeviceEventSender, DeviceEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        DeviceEventSender { tx: tx.clone() },
        DeviceEventReceiver { rx, tx },
    )
}

/// Waits before every speak call, for engines that drop requests issued
/// right after the previous utterance. A `stop` during the wait cancels
/// the pending request.
pub struct DelayedSpeech {
    inner: Arc<dyn SpeechDevice>,
    delay: Duration,
    events: DeviceEventSender,
    generation: Arc<AtomicU64>,
}

impl DelayedSpeech {
    pub fn new(inner: Arc<dyn SpeechDevice>, delay: Duration, events: DeviceEventSender) -> Self {
        Self {
            inner,
            delay,
            events,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl SpeechDevice for DelayedSpeech {
    fn speak(&self, utterance: &Utterance) -> std::result::Result<(), DeviceError> {
        if self.delay.is_zero() {
            return self.inner.speak(utterance);
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            std::thread::sleep(self.delay);
            return self.inner.speak(utterance);
        };

        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let generation = Arc::clone(&self.generation);
        let issued = generation.load(Ordering::SeqCst);
        let delay = self.delay;
        let utterance = utterance.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) != issued {
                return;
            }
            if let Err(e) = inner.speak(&utterance) {
                warn!("Delayed speak of {} failed: {}", utterance.id, e);
                events.error(utterance.id);
            }
        });
        Ok(())
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }

    fn set_language(&self, language: Language) -> std::result::Result<(), DeviceError> {
        self.inner.set_language(language)
    }
}

/// Cloneable entry point for producers and the settings surface.
#[derive(Clone)]
pub struct FeedbackHandle {
    frames: mpsc::UnboundedSender<DetectionFrame>,
    commands: mpsc::UnboundedSender<Command>,
    settings: Arc<watch::Sender<Settings>>,
}

impl FeedbackHandle {
    /// Queue a detector frame for the next batch. Never blocks.
    pub fn submit(&self, frame: DetectionFrame) -> Result<()> {
        self.frames
            .send(frame)
            .map_err(|_| FeedbackError::ChannelClosed)
    }

    /// New settings apply from the next batch cycle. Disabling speech or
    /// changing language clears the queue immediately.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        self.settings.send_replace(settings.clone());
        self.send(Command::ApplySettings(settings))
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| FeedbackError::ChannelClosed)
    }
}

/// The running pipeline: a batch task that merges and builds messages on a
/// fixed interval, and a sequencer task that owns the scheduler and is the
/// only place device state changes.
pub struct FeedbackService {
    handle: FeedbackHandle,
    batch_task: JoinHandle<()>,
    sequencer_task: JoinHandle<()>,
}

impl FeedbackService {
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        settings: Settings,
        mut devices: Devices,
        device_events: DeviceEventReceiver,
        selector: Box<dyn PhraseSelector>,
    ) -> Self {
        if settings.speech_dispatch_delay_ms > 0 {
            devices.speech = Arc::new(DelayedSpeech::new(
                devices.speech,
                Duration::from_millis(settings.speech_dispatch_delay_ms),
                device_events.sender(),
            ));
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (settings_tx, settings_rx) = watch::channel(settings.clone());

        let coordinator = Coordinator::new(MessageBuilder::new(selector));
        let scheduler = AlertScheduler::with_tuning(
            devices,
            settings.tuning.suppression.clone(),
            settings.tuning.priority.clone(),
        );

        let batch_task = tokio::spawn(batch_loop(
            coordinator,
            frames_rx,
            settings_rx,
            commands_tx.clone(),
        ));
        let sequencer_task = tokio::spawn(sequencer_loop(
            scheduler,
            commands_rx,
            device_events,
            settings,
        ));
        info!("Feedback service started");

        Self {
            handle: FeedbackHandle {
                frames: frames_tx,
                commands: commands_tx,
                settings: Arc::new(settings_tx),
            },
            batch_task,
            sequencer_task,
        }
    }

    pub fn handle(&self) -> FeedbackHandle {
        self.handle.clone()
    }

    /// Stop both tasks and silence the speech device.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.handle.send(Command::Shutdown);
        if let Err(e) = self.sequencer_task.await {
            warn!("Sequencer task ended abnormally: {}", e);
        }
        if let Err(e) = self.batch_task.await {
            warn!("Batch task ended abnormally: {}", e);
        }
        info!("Feedback service stopped");
        Ok(())
    }
}

/// Scheduler time follows the runtime clock, so paused test runtimes drive
/// decay and cooldowns too.
fn runtime_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn batch_loop(
    mut coordinator: Coordinator,
    mut frames: mpsc::UnboundedReceiver<DetectionFrame>,
    settings: watch::Receiver<Settings>,
    commands: mpsc::UnboundedSender<Command>,
) {
    loop {
        let interval = Duration::from_millis(settings.borrow().batch_interval_ms());
        tokio::time::sleep(interval).await;
        if commands.is_closed() {
            break;
        }

        while let Ok(frame) = frames.try_recv() {
            coordinator.push(frame);
        }

        // Hot-reload: settings are read fresh every cycle
        let current = settings.borrow().clone();
        let output = coordinator.tick(&current, runtime_now());
        if !output.items.is_empty() && commands.send(Command::Enqueue(output.items)).is_err() {
            break;
        }
    }
    info!("Batch loop stopped");
}

async fn sequencer_loop(
    mut scheduler: AlertScheduler,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut device_events: DeviceEventReceiver,
    mut settings: Settings,
) {
    scheduler.set_speech_enabled(settings.speech_enabled);
    scheduler.set_speech_rate(settings.speech_rate());
    // Failure leaves the scheduler in vibrate-only mode; already logged.
    let _ = scheduler.set_language(settings.language, runtime_now());

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Enqueue(items)) => {
                    let now = runtime_now();
                    for item in items {
                        scheduler.enqueue(item, now);
                    }
                }
                Some(Command::ApplySettings(next)) => {
                    apply_settings(&mut scheduler, &settings, &next);
                    settings = next;
                }
                Some(Command::Clear) => scheduler.clear(),
                Some(Command::Shutdown) | None => break,
            },
            Some(event) = device_events.rx.recv() => {
                scheduler.on_device_event(event, runtime_now());
            }
        }
    }

    scheduler.clear();
    let stats = scheduler.stats();
    info!(
        "Sequencer stopped: {} dispatched, {} suppressed, {} duplicates",
        stats.dispatched, stats.suppressed, stats.duplicates
    );
}

fn apply_settings(scheduler: &mut AlertScheduler, previous: &Settings, next: &Settings) {
    scheduler.set_tuning(next.tuning.suppression.clone(), next.tuning.priority.clone());
    scheduler.set_speech_rate(next.speech_rate());
    if next.speech_enabled != previous.speech_enabled {
        info!("Speech enabled: {}", next.speech_enabled);
        scheduler.set_speech_enabled(next.speech_enabled);
    }
    if next.language != previous.language {
        let _ = scheduler.set_language(next.language, runtime_now());
    }
}
