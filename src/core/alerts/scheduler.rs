// Alert scheduler - deduplicates, rate-limits and orders speech items, and
// releases them one at a time to the output dispatcher.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::dispatcher::OutputDispatcher;
use super::model::{AlertId, LedgerKey, PriorityWeights, SpeechItem, SuppressionWindows};
use crate::core::devices::{DeviceEvent, Devices};
use crate::core::error::DeviceError;
use crate::core::labels::Language;

/// Ledger size above which expired entries are dropped.
const LEDGER_PURGE_THRESHOLD: usize = 64;

/// What happened to an item passed to `enqueue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Waiting in the queue (or already handed to the speech device).
    Queued,
    /// Speech is off or unusable: the item vibrated but will not be spoken.
    VibrateOnly,
    /// Same (label, direction, text) was emitted within its suppression window.
    Suppressed,
    /// Same (label, direction) is already queued or speaking.
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub queued: u64,
    pub vibrate_only: u64,
    pub suppressed: u64,
    pub duplicates: u64,
    pub dispatched: u64,
    pub expired: u64,
    pub device_errors: u64,
}

#[derive(Debug)]
struct Queued {
    seq: u64,
    item: SpeechItem,
}

/// Owns the pending queue, the recent-message ledger and (through the
/// dispatcher) the single speaking slot. Every mutation goes through
/// `&mut self`, so whoever owns the scheduler serializes them.
pub struct AlertScheduler {
    queue: Vec<Queued>,
    ledger: HashMap<LedgerKey, Instant>,
    next_seq: u64,
    windows: SuppressionWindows,
    weights: PriorityWeights,
    dispatcher: OutputDispatcher,
    stats: SchedulerStats,
}

impl AlertScheduler {
    pub fn new(devices: Devices) -> Self {
        Self::with_tuning(devices, SuppressionWindows::default(), PriorityWeights::default())
    }

    pub fn with_tuning(
        devices: Devices,
        windows: SuppressionWindows,
        weights: PriorityWeights,
    ) -> Self {
        Self {
            queue: Vec::new(),
            ledger: HashMap::new(),
            next_seq: 0,
            windows,
            weights,
            dispatcher: OutputDispatcher::new(devices),
            stats: SchedulerStats::default(),
        }
    }

    pub fn set_tuning(&mut self, windows: SuppressionWindows, weights: PriorityWeights) {
        self.windows = windows;
        self.weights = weights;
    }

    pub fn enqueue(&mut self, item: SpeechItem, now: Instant) -> EnqueueOutcome {
        let key = item.ledger_key();
        let window = self.windows.window(item.priority);
        if let Some(last) = self.ledger.get(&key) {
            if now.saturating_duration_since(*last) < window {
                debug!("Suppressed repeat of {:?} [{}]", item.text, item.direction);
                self.stats.suppressed += 1;
                return EnqueueOutcome::Suppressed;
            }
        }

        if self.slot_taken(&item) {
            debug!("Already pending: {} [{}]", item.label, item.direction);
            self.stats.duplicates += 1;
            return EnqueueOutcome::Duplicate;
        }

        self.ledger.insert(key, now);
        if self.ledger.len() > LEDGER_PURGE_THRESHOLD {
            self.purge_ledger(now);
        }

        // Tactile feedback is immediate, even while an earlier utterance plays.
        if let Some(waveform) = &item.vibration {
            self.dispatcher.vibrate(waveform);
        }

        if !self.dispatcher.can_speak() {
            self.stats.vibrate_only += 1;
            return EnqueueOutcome::VibrateOnly;
        }

        self.queue.push(Queued {
            seq: self.next_seq,
            item,
        });
        self.next_seq += 1;
        self.stats.queued += 1;
        self.advance(now);
        EnqueueOutcome::Queued
    }

    /// If nothing is speaking, release the item with the highest dynamic
    /// priority (earliest insertion on ties). Items that decayed to zero are
    /// dropped on the way.
    pub fn advance(&mut self, now: Instant) -> Option<AlertId> {
        while self.dispatcher.is_idle() && self.dispatcher.can_speak() {
            let index = self.best_index(now)?;
            let Queued { item, .. } = self.queue.swap_remove(index);

            if item.dynamic_priority(now, &self.weights) <= 0.0 {
                debug!("Dropping stale alert {} {:?}", item.id, item.text);
                self.stats.expired += 1;
                continue;
            }

            let id = item.id;
            match self.dispatcher.dispatch(item) {
                Ok(()) => {
                    self.stats.dispatched += 1;
                    return Some(id);
                }
                Err(e) => {
                    warn!("Speech request {} failed: {}", id, e);
                    self.stats.device_errors += 1;
                }
            }
        }
        None
    }

    /// Feed a speech device callback back in; frees the slot and releases
    /// the next item when it matches the in-flight request.
    pub fn on_device_event(&mut self, event: DeviceEvent, now: Instant) -> Option<AlertId> {
        if self.dispatcher.on_event(event) {
            self.advance(now)
        } else {
            None
        }
    }

    /// Empty the queue and silence the device. The in-flight request's
    /// completion is no longer tracked.
    pub fn clear(&mut self) {
        if !self.queue.is_empty() || !self.dispatcher.is_idle() {
            debug!("Clearing {} queued alerts", self.queue.len());
        }
        self.queue.clear();
        self.dispatcher.stop();
    }

    pub fn set_speech_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.clear();
        }
        self.dispatcher.set_enabled(enabled);
    }

    pub fn set_speech_rate(&mut self, rate: f32) {
        self.dispatcher.set_rate(rate);
    }

    /// Switch the speech language. Pending alerts were phrased in the old
    /// language and are discarded.
    pub fn set_language(&mut self, language: Language, now: Instant) -> Result<(), DeviceError> {
        self.clear();
        let result = self.dispatcher.set_language(language);
        self.advance(now);
        result
    }

    pub fn in_flight(&self) -> Option<&SpeechItem> {
        self.dispatcher.current()
    }

    pub fn queued(&self) -> impl Iterator<Item = &SpeechItem> {
        self.queue.iter().map(|q| &q.item)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn can_speak(&self) -> bool {
        self.dispatcher.can_speak()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    fn slot_taken(&self, item: &SpeechItem) -> bool {
        self.queue.iter().any(|q| q.item.same_slot(item))
            || self.dispatcher.current().is_some_and(|c| c.same_slot(item))
    }

    fn best_index(&self, now: Instant) -> Option<usize> {
        self.queue
            .iter()
            .enumerate()
            .map(|(i, q)| (i, q.item.dynamic_priority(now, &self.weights), q.seq))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.2.cmp(&a.2)))
            .map(|(i, _, _)| i)
    }

    fn purge_ledger(&mut self, now: Instant) {
        let horizon: Duration = self.windows.longest();
        self.ledger
            .retain(|_, emitted| now.saturating_duration_since(*emitted) < horizon);
    }
}
