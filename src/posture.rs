//! Posture analysis
//!
//! Extracts five scale-invariant features from body pose landmarks, grades
//! each against a fixed threshold and smooths the per-frame verdict over a
//! short window before counting the frame toward the session score.

use crate::config::PostureConfig;
use crate::error::AnalysisError;
use crate::landmarks::{PoseLandmark, PoseLandmarks};
use crate::smoothing::{round_to, RunningTally, SmoothingWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Guards the shoulder-width denominators
const EPSILON: f64 = 1e-6;

/// Geometric posture features for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureFeatures {
    /// |dy| between shoulders over shoulder width (0 = level)
    pub shoulder_slope: f64,
    /// |nose.x - shoulder_center.x|
    pub head_offset: f64,
    /// nose.x - ear_center.x (signed)
    pub head_forward: f64,
    /// Angle of the hip-center to shoulder-center vector from vertical, radians
    pub spine_angle: f64,
    /// 1 - horizontal shoulder separation / shoulder width, clamped to [0, 1]
    pub shoulder_rotation: f64,
}

impl PostureFeatures {
    /// Compute features from pose landmarks.
    ///
    /// Fails with `NoPoseDetected` when any of nose, ears, shoulders or hips is missing.
    pub fn extract(pose: &PoseLandmarks) -> Result<Self, AnalysisError> {
        let get = |l: PoseLandmark| pose.get(l).copied().ok_or(AnalysisError::NoPoseDetected);

        let nose = get(PoseLandmark::Nose)?;
        let left_ear = get(PoseLandmark::LeftEar)?;
        let right_ear = get(PoseLandmark::RightEar)?;
        let left_shoulder = get(PoseLandmark::LeftShoulder)?;
        let right_shoulder = get(PoseLandmark::RightShoulder)?;
        let left_hip = get(PoseLandmark::LeftHip)?;
        let right_hip = get(PoseLandmark::RightHip)?;

        let shoulder_dx = right_shoulder.x - left_shoulder.x;
        let shoulder_dy = right_shoulder.y - left_shoulder.y;
        let shoulder_width = left_shoulder.distance(&right_shoulder);
        let shoulder_slope = shoulder_dy.abs() / (shoulder_width + EPSILON);

        let shoulder_center = left_shoulder.midpoint(&right_shoulder);
        let head_offset = (nose.x - shoulder_center.x).abs();

        let ear_center = left_ear.midpoint(&right_ear);
        let head_forward = nose.x - ear_center.x;

        // Image y grows downward, so an upright spine points along -y
        let hip_center = left_hip.midpoint(&right_hip);
        let spine_x = shoulder_center.x - hip_center.x;
        let spine_y = shoulder_center.y - hip_center.y;
        let spine_angle = spine_x.atan2(-spine_y).abs();

        let shoulder_rotation =
            (1.0 - shoulder_dx.abs() / (shoulder_width + EPSILON)).clamp(0.0, 1.0);

        Ok(Self {
            shoulder_slope,
            head_offset,
            head_forward,
            spine_angle,
            shoulder_rotation,
        })
    }
}

/// How far past its threshold a failing feature is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Slightly,
    Significantly,
}

/// Which posture feature failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureIssueKind {
    UnevenShoulders,
    OffCenterHead,
    ForwardHead,
    Slouching,
    PoorShoulderAlignment,
}

impl PostureIssueKind {
    pub fn description(self) -> &'static str {
        match self {
            PostureIssueKind::UnevenShoulders => "Uneven Shoulders",
            PostureIssueKind::OffCenterHead => "Off-Center Head",
            PostureIssueKind::ForwardHead => "Forward Head",
            PostureIssueKind::Slouching => "Slouching",
            PostureIssueKind::PoorShoulderAlignment => "Poor Shoulder Alignment",
        }
    }
}

/// A failing feature with its severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureIssue {
    pub kind: PostureIssueKind,
    pub severity: Severity,
}

impl PostureIssue {
    pub fn is_significant(&self) -> bool {
        self.severity == Severity::Significantly
    }
}

impl fmt::Display for PostureIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Slightly => "Slightly",
            Severity::Significantly => "Significantly",
        };
        write!(f, "{} {}", severity, self.kind.description())
    }
}

/// Grade of a single frame before smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Per-frame classification before smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureAssessment {
    /// Weighted share of passing features, 0-1
    pub score: f64,
    pub grade: FrameGrade,
    /// Whether the frame enters the window as a good frame
    pub is_good: bool,
    pub issues: Vec<PostureIssue>,
}

/// Classify extracted features against the configured thresholds.
///
/// A feature passes only when strictly below its threshold.
pub fn assess(features: &PostureFeatures, config: &PostureConfig) -> PostureAssessment {
    let checks = [
        (
            PostureIssueKind::UnevenShoulders,
            features.shoulder_slope,
            config.shoulder_slope_threshold,
            config.shoulder_severity_multiplier,
        ),
        (
            PostureIssueKind::OffCenterHead,
            features.head_offset,
            config.head_offset_threshold,
            config.default_severity_multiplier,
        ),
        (
            PostureIssueKind::ForwardHead,
            features.head_forward.abs(),
            config.head_forward_threshold,
            config.default_severity_multiplier,
        ),
        (
            PostureIssueKind::Slouching,
            features.spine_angle,
            config.spine_angle_threshold,
            config.default_severity_multiplier,
        ),
        (
            PostureIssueKind::PoorShoulderAlignment,
            features.shoulder_rotation,
            config.shoulder_rotation_threshold,
            config.shoulder_severity_multiplier,
        ),
    ];

    let mut score = 0.0;
    let mut issues = Vec::new();
    for (kind, value, threshold, multiplier) in checks {
        if value < threshold {
            score += config.feature_weight;
        } else {
            let severity = if value < threshold * multiplier {
                Severity::Slightly
            } else {
                Severity::Significantly
            };
            issues.push(PostureIssue { kind, severity });
        }
    }

    let grade = if score >= config.excellent_frame_score {
        FrameGrade::Excellent
    } else if score >= config.good_frame_score {
        FrameGrade::Good
    } else if score >= config.fair_frame_score {
        FrameGrade::Fair
    } else {
        FrameGrade::Poor
    };

    PostureAssessment {
        score,
        grade,
        is_good: matches!(grade, FrameGrade::Excellent | FrameGrade::Good),
        issues,
    }
}

/// Smoothed posture state reported for a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "issues", rename_all = "snake_case")]
pub enum PostureState {
    ExcellentPosture,
    GoodPosture,
    PoorPosture(Vec<PostureIssue>),
}

impl PostureState {
    /// Whether this state counts toward the posture score
    pub fn is_good(&self) -> bool {
        matches!(self, PostureState::ExcellentPosture | PostureState::GoodPosture)
    }
}

impl fmt::Display for PostureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostureState::ExcellentPosture => write!(f, "Excellent Posture"),
            PostureState::GoodPosture => write!(f, "Good Posture"),
            PostureState::PoorPosture(issues) => {
                let list: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                write!(f, "Poor Posture: {}", list.join(", "))
            }
        }
    }
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureFrame {
    pub features: PostureFeatures,
    pub assessment: PostureAssessment,
    /// Share of good frames currently in the window
    pub window_ratio: f64,
    pub state: PostureState,
}

impl PostureFrame {
    /// Human-readable status line
    pub fn status(&self) -> String {
        self.state.to_string()
    }
}

/// Session posture score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureScore {
    pub posture_score: f64,
    pub total_frames: u32,
}

/// Posture analyzer for one interview session
#[derive(Debug, Clone)]
pub struct PostureAnalyzer {
    config: PostureConfig,
    history: SmoothingWindow<bool>,
    tally: RunningTally,
}

impl Default for PostureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PostureAnalyzer {
    /// Create an analyzer with default thresholds (5-frame window)
    pub fn new() -> Self {
        Self::with_config(PostureConfig::default())
    }

    pub fn with_config(config: PostureConfig) -> Self {
        Self {
            history: SmoothingWindow::new(config.window_size),
            config,
            tally: RunningTally::default(),
        }
    }

    /// Analyze one frame's pose landmarks.
    ///
    /// Frames without a usable pose return `NoPoseDetected` and leave the
    /// window and tally untouched.
    pub fn analyze_frame(
        &mut self,
        pose: Option<&PoseLandmarks>,
    ) -> Result<PostureFrame, AnalysisError> {
        let pose = pose.ok_or(AnalysisError::NoPoseDetected)?;
        let features = PostureFeatures::extract(pose).map_err(|e| {
            log::debug!("Skipping posture frame, missing {:?}", pose.missing());
            e
        })?;
        Ok(self.analyze_features(features))
    }

    /// Classify precomputed features and update the session state
    pub fn analyze_features(&mut self, features: PostureFeatures) -> PostureFrame {
        let assessment = assess(&features, &self.config);
        self.history.push(assessment.is_good);
        let window_ratio = self.history.ratio().unwrap_or(0.0);

        let has_significant = assessment.issues.iter().any(|i| i.is_significant());
        let state = if window_ratio >= self.config.excellent_ratio && assessment.issues.is_empty() {
            PostureState::ExcellentPosture
        } else if window_ratio >= self.config.good_ratio && !has_significant {
            PostureState::GoodPosture
        } else {
            PostureState::PoorPosture(assessment.issues.clone())
        };

        self.tally.record(state.is_good());

        log::debug!(
            "Posture frame {}: score {:.2}, ratio {:.2}, {}",
            self.tally.total_frames,
            assessment.score,
            window_ratio,
            state
        );

        PostureFrame {
            features,
            assessment,
            window_ratio,
            state,
        }
    }

    /// Share of frames with good posture, in percent with 2 decimals
    pub fn get_posture_score(&self) -> PostureScore {
        PostureScore {
            posture_score: round_to(self.tally.percentage(), 2),
            total_frames: self.tally.total_frames,
        }
    }

    pub fn tally(&self) -> RunningTally {
        self.tally
    }

    pub fn config(&self) -> &PostureConfig {
        &self.config
    }
}
