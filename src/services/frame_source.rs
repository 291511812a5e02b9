/// Trainer collaborators: frame sources, landmark detectors and display sinks
///
/// Video decoding and the landmark model live outside this crate. The
/// trainer only sees these traits. `KeypointFileSource` replays landmarks
/// recorded as JSON lines, one frame per line:
///
/// ```text
/// {"landmarks": [{"x": 0.41, "y": 0.62}, ...], "score": 0.93}
/// {"landmarks": null}
/// null
/// ```

use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{Result, SignatureError};
use crate::models::pose::{KeypointFrame, Landmark};

/// Sequential source of frames; `None` once exhausted
pub trait FrameSource {
    type Frame;

    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;
}

/// Finds zero or one hand in a frame
pub trait LandmarkDetector<F> {
    fn detect(&mut self, frame: &F) -> Result<Option<KeypointFrame>>;
}

/// Per-frame feedback shown to the person recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameStatus {
    NoHand,
    FirstFrame,
    Stable { count: usize },
    Moving { delta: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    Stop,
}

/// Live feedback sink; may ask the trainer to stop early
pub trait DisplaySink {
    fn show(&mut self, frame_number: usize, status: &FrameStatus) -> DisplayControl;
}

/// No-op sink for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessDisplay;

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, _frame_number: usize, _status: &FrameStatus) -> DisplayControl {
        DisplayControl::Continue
    }
}

/// Writes frame status to the debug log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&mut self, frame_number: usize, status: &FrameStatus) -> DisplayControl {
        match status {
            FrameStatus::NoHand => tracing::debug!("frame {}: no hand", frame_number),
            FrameStatus::FirstFrame => tracing::debug!("frame {}: first hand frame", frame_number),
            FrameStatus::Stable { count } => {
                tracing::debug!("frame {}: STABLE ({})", frame_number, count)
            }
            FrameStatus::Moving { delta } => {
                tracing::debug!("frame {}: MOVING (delta={:.3})", frame_number, delta)
            }
        }
        DisplayControl::Continue
    }
}

/// One recorded detector result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// Detection score; treated as 1.0 when absent
    #[serde(default)]
    pub score: Option<f32>,
}

impl RecordedFrame {
    pub fn no_hand() -> Self {
        Self {
            landmarks: None,
            score: None,
        }
    }

    pub fn with_landmarks(landmarks: Vec<Landmark>) -> Self {
        Self {
            landmarks: Some(landmarks),
            score: None,
        }
    }
}

/// Replays recorded landmarks from a JSON-lines file.
///
/// The file handle is owned by the source and closed when it is dropped,
/// whichever way training ends.
pub struct KeypointFileSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_number: usize,
}

impl KeypointFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SignatureError::InputUnavailable {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Reading recorded landmarks from {}", path.display());

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for KeypointFileSource {
    type Frame = RecordedFrame;

    fn next_frame(&mut self) -> Result<Option<RecordedFrame>> {
        loop {
            let line = match self.lines.next() {
                None => return Ok(None),
                Some(line) => line.map_err(|source| SignatureError::InputUnavailable {
                    path: self.path.clone(),
                    source,
                })?,
            };
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let frame: Option<RecordedFrame> =
                serde_json::from_str(trimmed).map_err(|e| SignatureError::MalformedFrame {
                    line: self.line_number,
                    message: e.to_string(),
                })?;

            return Ok(Some(frame.unwrap_or_else(RecordedFrame::no_hand)));
        }
    }
}

/// In-memory frame source
#[derive(Debug, Clone)]
pub struct MemoryFrameSource<F> {
    frames: VecDeque<F>,
}

impl<F> MemoryFrameSource<F> {
    pub fn new(frames: Vec<F>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl<F> FrameSource for MemoryFrameSource<F> {
    type Frame = F;

    fn next_frame(&mut self) -> Result<Option<F>> {
        Ok(self.frames.pop_front())
    }
}

/// Detector for frames whose landmarks were recorded ahead of time.
///
/// A hand is picked up when its score meets `min_detection_confidence`.
/// While it stays tracked, later frames only need `min_tracking_confidence`.
/// A missing or rejected hand drops back to detection.
#[derive(Debug, Clone)]
pub struct RecordedLandmarkDetector {
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
    tracking: bool,
}

impl RecordedLandmarkDetector {
    pub fn new(min_detection_confidence: f32, min_tracking_confidence: f32) -> Self {
        Self {
            min_detection_confidence: min_detection_confidence.clamp(0.0, 1.0),
            min_tracking_confidence: min_tracking_confidence.clamp(0.0, 1.0),
            tracking: false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    fn required_score(&self) -> f32 {
        if self.tracking {
            self.min_tracking_confidence
        } else {
            self.min_detection_confidence
        }
    }
}

impl Default for RecordedLandmarkDetector {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl LandmarkDetector<RecordedFrame> for RecordedLandmarkDetector {
    fn detect(&mut self, frame: &RecordedFrame) -> Result<Option<KeypointFrame>> {
        let landmarks = match &frame.landmarks {
            Some(landmarks) if frame.score.unwrap_or(1.0) >= self.required_score() => landmarks,
            _ => {
                self.tracking = false;
                return Ok(None);
            }
        };

        self.tracking = true;
        Ok(Some(KeypointFrame::new(landmarks.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_source_reads_frames() {
        let file = write_temp(
            "{\"landmarks\": [{\"x\": 0.1, \"y\": 0.2}], \"score\": 0.9}\n\nnull\n{\"landmarks\": null}\n",
        );
        let mut source = KeypointFileSource::open(file.path()).unwrap();

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.landmarks.as_ref().unwrap().len(), 1);
        assert_eq!(first.score, Some(0.9));
        assert_eq!(source.next_frame().unwrap().unwrap(), RecordedFrame::no_hand());
        assert_eq!(source.next_frame().unwrap().unwrap(), RecordedFrame::no_hand());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_file_source_missing_file() {
        let result = KeypointFileSource::open("/definitely/not/here.jsonl");
        assert!(matches!(result, Err(SignatureError::InputUnavailable { .. })));
    }

    #[test]
    fn test_file_source_malformed_line() {
        let file = write_temp("null\n{not json}\n");
        let mut source = KeypointFileSource::open(file.path()).unwrap();

        assert!(source.next_frame().is_ok());
        assert!(matches!(
            source.next_frame(),
            Err(SignatureError::MalformedFrame { line: 2, .. })
        ));
    }

    #[test]
    fn test_recorded_detector_applies_confidence() {
        let mut detector = RecordedLandmarkDetector::new(0.5, 0.5);
        let mut frame = RecordedFrame::with_landmarks(vec![Landmark::new(0.1, 0.2)]);

        assert!(detector.detect(&frame).unwrap().is_some());

        frame.score = Some(0.3);
        assert!(detector.detect(&frame).unwrap().is_none());

        assert!(detector.detect(&RecordedFrame::no_hand()).unwrap().is_none());
    }

    #[test]
    fn test_recorded_detector_tracking_confidence() {
        let mut detector = RecordedLandmarkDetector::new(0.8, 0.4);
        let scored = |score: f32| RecordedFrame {
            landmarks: Some(vec![Landmark::new(0.1, 0.2)]),
            score: Some(score),
        };

        // too weak to pick the hand up
        assert!(detector.detect(&scored(0.6)).unwrap().is_none());
        assert!(!detector.is_tracking());

        assert!(detector.detect(&scored(0.9)).unwrap().is_some());
        assert!(detector.is_tracking());

        // weaker scores are fine once tracked
        assert!(detector.detect(&scored(0.6)).unwrap().is_some());
        assert!(detector.detect(&scored(0.3)).unwrap().is_none());
        assert!(!detector.is_tracking());

        // lost: detection threshold applies again
        assert!(detector.detect(&scored(0.6)).unwrap().is_none());

        detector.detect(&scored(0.9)).unwrap();
        detector.detect(&RecordedFrame::no_hand()).unwrap();
        assert!(!detector.is_tracking());
    }

    #[test]
    fn test_log_display_never_stops() {
        let mut display = LogDisplay;
        let statuses = [
            FrameStatus::NoHand,
            FrameStatus::FirstFrame,
            FrameStatus::Stable { count: 3 },
            FrameStatus::Moving { delta: 0.2 },
        ];
        for (frame, status) in statuses.iter().enumerate() {
            assert_eq!(display.show(frame + 1, status), DisplayControl::Continue);
        }
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let mut source = MemoryFrameSource::new(vec![1, 2]);
        assert_eq!(source.next_frame().unwrap(), Some(1));
        assert_eq!(source.next_frame().unwrap(), Some(2));
        assert_eq!(source.next_frame().unwrap(), None);
    }
}
