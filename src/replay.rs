//! Recorded landmark replay
//!
//! Sessions can be scored offline from newline-delimited JSON, one record per
//! captured frame:
//!
//! ```text
//! {"frame_index": 0, "pose": [[0.5, 0.3], ...], "face": [[0.41, 0.38, -0.02], ...], "image": "frames/0000.png"}
//! ```
//!
//! `pose` and `face` are optional landmark arrays of `[x, y]` or `[x, y, z]`
//! points in normalized coordinates. `image` is an optional path to the
//! frame pixels, resolved against a base directory.

use crate::error::AnalysisError;
use crate::landmarks::{FaceMesh, Landmark, LandmarkSource, PoseLandmarks};
use crate::session::{FrameReport, InterviewSession};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Wire form of a record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFrameRecord {
    #[serde(default)]
    frame_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pose: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    face: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<PathBuf>,
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameRecord {
    pub frame_index: u64,
    pub pose: Option<PoseLandmarks>,
    pub face: Option<FaceMesh>,
    pub image: Option<PathBuf>,
}

fn to_landmarks(points: Vec<Vec<f64>>, kind: &str) -> Result<Vec<Landmark>, AnalysisError> {
    points
        .into_iter()
        .enumerate()
        .map(|(i, p)| match p.as_slice() {
            [x, y] => Ok(Landmark::new(*x, *y)),
            [x, y, z] => Ok(Landmark { x: *x, y: *y, z: *z }),
            _ => Err(AnalysisError::InvalidLandmarks(format!(
                "{kind} point {i} has {} coordinates, expected 2 or 3",
                p.len()
            ))),
        })
        .collect()
}

fn from_landmarks(points: &[Landmark]) -> Vec<Vec<f64>> {
    points.iter().map(|p| vec![p.x, p.y, p.z]).collect()
}

impl FrameRecord {
    /// Parse one NDJSON line. `line_number` is 1-based and only used in errors;
    /// it also stands in for a missing `frame_index`.
    pub fn parse(line: &str, line_number: usize) -> Result<Self, AnalysisError> {
        let raw: RawFrameRecord = serde_json::from_str(line)
            .map_err(|e| AnalysisError::ParseError(format!("line {line_number}: {e}")))?;

        let with_line = |e: AnalysisError| match e {
            AnalysisError::InvalidLandmarks(msg) => {
                AnalysisError::InvalidLandmarks(format!("line {line_number}: {msg}"))
            }
            other => other,
        };

        let pose = raw
            .pose
            .map(|p| to_landmarks(p, "pose").map(PoseLandmarks::new))
            .transpose()
            .map_err(with_line)?;
        let face = raw
            .face
            .map(|p| to_landmarks(p, "face").map(FaceMesh::new))
            .transpose()
            .map_err(with_line)?;

        Ok(Self {
            frame_index: raw
                .frame_index
                .unwrap_or(line_number.saturating_sub(1) as u64),
            pose,
            face,
            image: raw.image,
        })
    }

    /// Serialize as a single NDJSON line
    pub fn to_json_line(&self) -> Result<String, AnalysisError> {
        let raw = RawFrameRecord {
            frame_index: Some(self.frame_index),
            pose: self.pose.as_ref().map(|p| from_landmarks(&p.points)),
            face: self.face.as_ref().map(|f| from_landmarks(&f.points)),
            image: self.image.clone(),
        };
        Ok(serde_json::to_string(&raw)?)
    }

    /// Load the frame pixels, resolving relative paths against `base_dir`
    pub fn load_image(&self, base_dir: Option<&Path>) -> Result<Option<RgbImage>, AnalysisError> {
        let Some(path) = &self.image else {
            return Ok(None);
        };
        let resolved = match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.clone(),
        };
        Ok(Some(image::open(resolved)?.to_rgb8()))
    }
}

/// Parse a full NDJSON document, skipping blank lines; stops at the first bad line
pub fn parse_ndjson(text: &str) -> Result<Vec<FrameRecord>, AnalysisError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| FrameRecord::parse(line, i + 1))
        .collect()
}

/// Check every line and collect all problems as (1-based line, error)
pub fn validate_ndjson(text: &str) -> (usize, Vec<(usize, AnalysisError)>) {
    let mut valid = 0;
    let mut problems = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match FrameRecord::parse(line, i + 1) {
            Ok(_) => valid += 1,
            Err(e) => {
                log::warn!("{e}");
                problems.push((i + 1, e));
            }
        }
    }
    (valid, problems)
}

/// Landmark source that serves the landmarks of the current record
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    current: Option<FrameRecord>,
    served: u64,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record` the one served to the next detection calls
    pub fn load(&mut self, record: FrameRecord) {
        self.current = Some(record);
    }

    pub fn current(&self) -> Option<&FrameRecord> {
        self.current.as_ref()
    }

    /// Number of pose detections served
    pub fn served(&self) -> u64 {
        self.served
    }
}

impl LandmarkSource for ReplaySource {
    fn detect_pose(&mut self, _frame: &RgbImage) -> Option<PoseLandmarks> {
        self.served += 1;
        self.current.as_ref().and_then(|r| r.pose.clone())
    }

    fn detect_face(&mut self, _frame: &RgbImage) -> Option<FaceMesh> {
        self.current.as_ref().and_then(|r| r.face.clone())
    }
}

/// Feed one record through a replay session.
///
/// With an image the frame goes through detection like a live frame;
/// without one the landmarks are analyzed directly and the eye contact
/// analyzer sees no pixels.
pub fn replay_record(
    session: &mut InterviewSession<ReplaySource>,
    record: FrameRecord,
    base_dir: Option<&Path>,
) -> Result<FrameReport, AnalysisError> {
    match record.load_image(base_dir)? {
        Some(image) => {
            session.source_mut().load(record);
            Ok(session.process_frame(&image))
        }
        None => {
            let report =
                session.process_landmarks(None, record.pose.as_ref(), record.face.as_ref());
            session.source_mut().load(record);
            Ok(report)
        }
    }
}
