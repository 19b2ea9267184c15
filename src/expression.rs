//! Facial expression (smile) analysis
//!
//! The smile score combines mouth width and mouth-corner lift from four face
//! mesh points. Two signals come out of it:
//!
//! - the raw per-frame score decides whether the frame counts as smiling
//! - a recency-weighted average over the last 30 frames drives the label
//!
//! The engagement message is derived from the session-wide share of smiling
//! frames, not from the smoothed score.

use crate::config::ExpressionConfig;
use crate::error::AnalysisError;
use crate::landmarks::{FaceMesh, LOWER_LIP, MOUTH_LEFT_CORNER, MOUTH_RIGHT_CORNER, UPPER_LIP};
use crate::smoothing::{round_to, RunningTally, SmoothingWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mouth geometry for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthFeatures {
    /// Horizontal distance between the mouth corners
    pub mouth_width: f64,
    /// Vertical distance between the lip centers
    pub mouth_height: f64,
    /// Left corner height above the mouth center (positive = raised)
    pub left_lift: f64,
    /// Right corner height above the mouth center (positive = raised)
    pub right_lift: f64,
}

impl MouthFeatures {
    /// Extract mouth features, `None` if any mouth landmark is missing
    pub fn extract(face: &FaceMesh) -> Option<Self> {
        let left = face.get(MOUTH_LEFT_CORNER)?;
        let right = face.get(MOUTH_RIGHT_CORNER)?;
        let upper = face.get(UPPER_LIP)?;
        let lower = face.get(LOWER_LIP)?;

        let center_y = (upper.y + lower.y) / 2.0;
        Some(Self {
            mouth_width: (right.x - left.x).abs(),
            mouth_height: (upper.y - lower.y).abs(),
            left_lift: center_y - left.y,
            right_lift: center_y - right.y,
        })
    }

    pub fn width_score(&self, config: &ExpressionConfig) -> f64 {
        self.mouth_width * config.width_scale
    }

    pub fn lift_score(&self, config: &ExpressionConfig) -> f64 {
        (self.left_lift + self.right_lift) * config.lift_scale
    }

    /// Raw smile intensity in [0, 1]
    pub fn smile_score(&self, config: &ExpressionConfig) -> f64 {
        let width = (self.width_score(config) - config.width_offset).max(0.0);
        let lift = (self.lift_score(config) * config.lift_gain).max(0.0);
        (width * config.width_weight + lift * config.lift_weight).clamp(0.0, 1.0)
    }
}

/// Label for the smoothed smile score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmileLabel {
    BigSmile,
    Smile,
    SlightSmile,
    NotSmiling,
}

impl SmileLabel {
    pub fn from_score(score: f64, config: &ExpressionConfig) -> Self {
        if score > config.big_smile_threshold {
            SmileLabel::BigSmile
        } else if score > config.smile_threshold {
            SmileLabel::Smile
        } else if score > config.smiling_threshold {
            SmileLabel::SlightSmile
        } else {
            SmileLabel::NotSmiling
        }
    }
}

impl fmt::Display for SmileLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SmileLabel::BigSmile => "Big Smile",
            SmileLabel::Smile => "Smile",
            SmileLabel::SlightSmile => "Slight Smile",
            SmileLabel::NotSmiling => "Not Smiling",
        };
        write!(f, "{text}")
    }
}

/// Session engagement band from the share of smiling frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Excellent,
    Good,
    Fair,
    Low,
}

impl EngagementLevel {
    pub fn from_percent(smile_percent: f64) -> Self {
        if smile_percent >= 40.0 {
            EngagementLevel::Excellent
        } else if smile_percent >= 25.0 {
            EngagementLevel::Good
        } else if smile_percent >= 10.0 {
            EngagementLevel::Fair
        } else {
            EngagementLevel::Low
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            EngagementLevel::Excellent => "Excellent Engagement",
            EngagementLevel::Good => "Good Engagement",
            EngagementLevel::Fair => "Fair Engagement",
            EngagementLevel::Low => "Try to Smile More",
        }
    }
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Per-frame expression reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionReading {
    pub features: MouthFeatures,
    /// Unsmoothed score for this frame
    pub smile_score: f64,
    /// Whether this frame counted as smiling
    pub is_smiling: bool,
    /// Recency-weighted score over the history
    pub smoothed_score: f64,
    /// Recency-weighted smiling share over the history
    pub smoothed_percent: f64,
    /// Session share of smiling frames, 0-100
    pub smile_percent: f64,
    pub label: SmileLabel,
    pub engagement: EngagementLevel,
    pub details: Vec<String>,
}

/// Outcome of analyzing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExpressionOutcome {
    NoFace,
    Analyzed(ExpressionReading),
}

impl ExpressionOutcome {
    /// `None` without a face, `Some(true)` for an analyzed frame
    pub fn state(&self) -> Option<bool> {
        match self {
            ExpressionOutcome::NoFace => None,
            ExpressionOutcome::Analyzed(_) => Some(true),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ExpressionOutcome::NoFace => "No face detected",
            ExpressionOutcome::Analyzed(reading) => reading.engagement.message(),
        }
    }

    pub fn details(&self) -> &[String] {
        match self {
            ExpressionOutcome::NoFace => &[],
            ExpressionOutcome::Analyzed(reading) => &reading.details,
        }
    }

    pub fn reading(&self) -> Option<&ExpressionReading> {
        match self {
            ExpressionOutcome::NoFace => None,
            ExpressionOutcome::Analyzed(reading) => Some(reading),
        }
    }
}

/// Session smile score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmileScore {
    pub smile_percentage: f64,
    pub total_frames: u32,
}

/// Expression analyzer for one interview session
#[derive(Debug, Clone)]
pub struct ExpressionAnalyzer {
    config: ExpressionConfig,
    scores: SmoothingWindow<f64>,
    percents: SmoothingWindow<f64>,
    tally: RunningTally,
}

impl Default for ExpressionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionAnalyzer {
    pub fn new() -> Self {
        Self::with_config(ExpressionConfig::default())
    }

    pub fn with_config(config: ExpressionConfig) -> Self {
        Self {
            scores: SmoothingWindow::new(config.history_size),
            percents: SmoothingWindow::new(config.history_size),
            config,
            tally: RunningTally::default(),
        }
    }

    /// Analyze one frame's face mesh.
    ///
    /// Without a face (or without the mouth landmarks) nothing is counted.
    pub fn analyze_frame(&mut self, face: Option<&FaceMesh>) -> ExpressionOutcome {
        match Self::mouth_features(face) {
            Ok(features) => ExpressionOutcome::Analyzed(self.analyze_features(features)),
            Err(e) if e.is_recoverable() => {
                log::debug!("Expression frame skipped: {e}");
                ExpressionOutcome::NoFace
            }
            Err(e) => {
                log::warn!("Expression frame skipped: {e}");
                ExpressionOutcome::NoFace
            }
        }
    }

    fn mouth_features(face: Option<&FaceMesh>) -> Result<MouthFeatures, AnalysisError> {
        let face = face.ok_or(AnalysisError::NoFaceDetected)?;
        MouthFeatures::extract(face).ok_or_else(|| {
            AnalysisError::InvalidLandmarks(format!(
                "face mesh with {} points is missing mouth landmarks",
                face.points.len()
            ))
        })
    }

    /// Score precomputed mouth features and update the session state
    pub fn analyze_features(&mut self, features: MouthFeatures) -> ExpressionReading {
        let smile_score = features.smile_score(&self.config);
        let is_smiling = smile_score > self.config.smiling_threshold;
        self.tally.record(is_smiling);

        let smile_percent = self.tally.percentage();
        self.scores.push(smile_score);
        self.percents.push(smile_percent);
        let smoothed_score = self.smoothed_score().unwrap_or(0.0);
        let smoothed_percent = self.percents.weighted_average().unwrap_or(0.0);

        let label = SmileLabel::from_score(smoothed_score, &self.config);
        let engagement = EngagementLevel::from_percent(smile_percent);
        let details = vec![
            label.to_string(),
            format!("Current Intensity: {}%", (smoothed_score * 100.0) as i64),
            format!("Time Spent Smiling: {:.1}%", smile_percent),
        ];

        log::debug!(
            "Expression frame {}: raw {:.3}, smoothed {:.3}, {}",
            self.tally.total_frames,
            smile_score,
            smoothed_score,
            label
        );

        ExpressionReading {
            features,
            smile_score,
            is_smiling,
            smoothed_score,
            smoothed_percent,
            smile_percent,
            label,
            engagement,
            details,
        }
    }

    /// Recency-weighted smile intensity over the history window
    pub fn smoothed_score(&self) -> Result<f64, AnalysisError> {
        self.scores.weighted_average().ok_or_else(|| {
            AnalysisError::InsufficientHistory("no expression frames analyzed yet".to_string())
        })
    }

    /// Session share of smiling frames, 0-100, unrounded
    pub fn smile_percent(&self) -> f64 {
        self.tally.percentage()
    }

    /// Session engagement band
    pub fn engagement(&self) -> EngagementLevel {
        EngagementLevel::from_percent(self.smile_percent())
    }

    /// Share of smiling frames, in percent with 2 decimals
    pub fn get_smile_score(&self) -> SmileScore {
        SmileScore {
            smile_percentage: round_to(self.smile_percent(), 2),
            total_frames: self.tally.total_frames,
        }
    }

    pub fn tally(&self) -> RunningTally {
        self.tally
    }

    pub fn config(&self) -> &ExpressionConfig {
        &self.config
    }
}
