// Recorded detection traces and their timed playback.
//
// A trace is JSON lines, one processed camera frame per line:
//   {"timestamp":"2025-01-01T12:00:00.000Z","geometry":{...},"detections":[...]}

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::error::{FeedbackError, Result};
use super::model::DetectionFrame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub frame: DetectionFrame,
}

/// Parse a trace file. Blank lines are skipped; records come back in
/// timestamp order.
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceRecord>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: TraceRecord =
            serde_json::from_str(trimmed).map_err(|e| FeedbackError::Trace {
                line: index + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }

    records.sort_by_key(|r| r.timestamp);
    info!(
        "Loaded {} trace records from {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(records)
}

pub fn write_trace(path: impl AsRef<Path>, records: &[TraceRecord]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Fastest accepted playback multiplier.
pub const MAX_SPEED: f64 = 1000.0;

/// Releases trace frames as playback time reaches their offset from the
/// first record.
pub struct TraceReplay {
    records: Vec<TraceRecord>,
    cursor: usize,
    state: PlaybackState,
    speed: f64,
    position: Duration,
    duration: Duration,
}

impl TraceReplay {
    pub fn new(mut records: Vec<TraceRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        let duration = match (records.first(), records.last()) {
            (Some(first), Some(last)) => offset_between(first, last),
            _ => Duration::ZERO,
        };
        Self {
            records,
            cursor: 0,
            state: PlaybackState::Paused,
            speed: 1.0,
            position: Duration::ZERO,
            duration,
        }
    }

    pub fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Non-positive or non-finite speeds are ignored; anything above
    /// `MAX_SPEED` is capped.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed.min(MAX_SPEED);
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> usize {
        self.records.len() - self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.records.len()
    }

    /// Jump to `offset`; frames before it are skipped.
    pub fn seek(&mut self, offset: Duration) {
        self.position = offset.min(self.duration);
        self.cursor = match self.records.first() {
            Some(first) => {
                let position = self.position;
                self.records
                    .partition_point(|r| offset_between(first, r) < position)
            }
            None => 0,
        };
    }

    /// Advance playback by `elapsed` wall time and return the frames whose
    /// time has come.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<DetectionFrame> {
        if self.state == PlaybackState::Paused {
            return Vec::new();
        }
        let step = Duration::try_from_secs_f64(elapsed.as_secs_f64() * self.speed)
            .unwrap_or(Duration::MAX);
        self.position = self.position.saturating_add(step);

        let Some(first) = self.records.first() else {
            return Vec::new();
        };
        let mut due = 0;
        while let Some(record) = self.records.get(self.cursor + due) {
            if offset_between(first, record) > self.position {
                break;
            }
            due += 1;
        }

        let frames = self.records[self.cursor..self.cursor + due]
            .iter()
            .map(|r| r.frame.clone())
            .collect();
        self.cursor += due;
        frames
    }
}

fn offset_between(first: &TraceRecord, record: &TraceRecord) -> Duration {
    (record.timestamp - first.timestamp)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{BoundingBox, Detection};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn record(ms: i64, label: &str) -> TraceRecord {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        TraceRecord {
            timestamp: base + chrono::Duration::milliseconds(ms),
            frame: DetectionFrame::normalized(vec![Detection::single(
                BoundingBox::centered(0.5, 0.5, 0.1, 0.1),
                label,
                0.8,
            )]),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        write_trace(&path, &[record(100, "cup"), record(0, "chair")]).unwrap();

        let records = read_trace(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frame.detections[0].categories[0].label, "chair");
    }

    #[test]
    fn test_read_hand_written_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"timestamp\":\"2025-01-01T12:00:00Z\",",
                "\"geometry\":{\"width\":640,\"height\":480,\"rotation\":90},",
                "\"detections\":[{\"box\":{\"left\":1,\"top\":2,\"right\":3,\"bottom\":4},",
                "\"categories\":[{\"label\":\"dog\",\"score\":0.7}]}]}\n",
                "\n",
            ),
        )
        .unwrap();

        let records = read_trace(&path).unwrap();
        assert_eq!(records.len(), 1);
        let geometry = records[0].frame.geometry.unwrap();
        assert_eq!(geometry.rotation.degrees(), 90);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let good = serde_json::to_string(&record(0, "cup")).unwrap();
        fs::write(&path, format!("{good}\n\nnot json\n")).unwrap();

        match read_trace(&path) {
            Err(FeedbackError::Trace { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_replay_releases_frames_on_time() {
        let mut replay = TraceReplay::new(vec![record(0, "a"), record(100, "b"), record(250, "c")]);
        assert_eq!(replay.duration(), Duration::from_millis(250));

        // Paused until started.
        assert!(replay.advance(Duration::from_millis(500)).is_empty());

        replay.set_state(PlaybackState::Playing);
        assert_eq!(replay.advance(Duration::ZERO).len(), 1);
        assert_eq!(replay.advance(Duration::from_millis(150)).len(), 1);
        assert_eq!(replay.advance(Duration::from_millis(150)).len(), 1);
        assert!(replay.is_finished());
    }

    #[test]
    fn test_replay_speed_and_seek() {
        let mut replay = TraceReplay::new(vec![record(0, "a"), record(1000, "b"), record(2000, "c")]);
        replay.set_state(PlaybackState::Playing);
        replay.set_speed(4.0);
        replay.set_speed(-1.0);
        assert_eq!(replay.speed(), 4.0);

        assert_eq!(replay.advance(Duration::from_millis(300)).len(), 2);

        replay.seek(Duration::from_millis(1500));
        assert_eq!(replay.remaining(), 1);
        assert_eq!(replay.advance(Duration::from_millis(125)).len(), 1);
    }

    #[test]
    fn test_replay_speed_is_capped() {
        let mut replay = TraceReplay::new(vec![record(0, "a"), record(60_000, "b")]);
        replay.set_state(PlaybackState::Playing);
        replay.set_speed(1e30);
        assert_eq!(replay.speed(), MAX_SPEED);

        assert_eq!(replay.advance(Duration::from_millis(100)).len(), 2);
        assert!(replay.is_finished());
        assert!(replay.advance(Duration::MAX).is_empty());
        assert_eq!(replay.position(), Duration::MAX);
    }
}
