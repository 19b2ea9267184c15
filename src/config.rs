//! Analyzer configuration
//!
//! Every threshold below is an empirically tuned constant carried over from the
//! production scorer. They are exposed as configuration so callers can load
//! them from JSON, not so they can be "improved" silently.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Posture thresholds and smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Smoothing window size in frames
    pub window_size: usize,
    /// Shoulder slope (|dy| / width) must stay below this
    pub shoulder_slope_threshold: f64,
    /// Horizontal nose offset from shoulder center must stay below this
    pub head_offset_threshold: f64,
    /// |nose.x - ear_center.x| must stay below this
    pub head_forward_threshold: f64,
    /// Spine angle from vertical (radians) must stay below this
    pub spine_angle_threshold: f64,
    /// Torso twist estimate must stay below this
    pub shoulder_rotation_threshold: f64,
    /// Severity multiplier for shoulder slope and rotation
    pub shoulder_severity_multiplier: f64,
    /// Severity multiplier for head offset, head forward and spine
    pub default_severity_multiplier: f64,
    /// Weight of each passing feature in the frame score
    pub feature_weight: f64,
    /// Frame score needed for an "Excellent" frame grade
    pub excellent_frame_score: f64,
    /// Frame score needed for a "Good" frame grade (and a good frame)
    pub good_frame_score: f64,
    /// Frame score needed for a "Fair" frame grade
    pub fair_frame_score: f64,
    /// Window ratio for Excellent Posture (requires zero issues)
    pub excellent_ratio: f64,
    /// Window ratio for Good Posture (requires no significant issue)
    pub good_ratio: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            shoulder_slope_threshold: 0.20,
            head_offset_threshold: 0.10,
            head_forward_threshold: 0.15,
            spine_angle_threshold: 0.25,
            shoulder_rotation_threshold: 0.30,
            shoulder_severity_multiplier: 2.5,
            default_severity_multiplier: 2.0,
            feature_weight: 0.2,
            excellent_frame_score: 0.70,
            good_frame_score: 0.50,
            fair_frame_score: 0.35,
            excellent_ratio: 0.60,
            good_ratio: 0.40,
        }
    }
}

/// Eye contact parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeContactConfig {
    /// Smoothing window size in frames
    pub window_size: usize,
    /// Window ratio of "looking" frames needed for Looking at Camera
    pub good_gaze_ratio: f64,
    /// Pixels added around each eye bounding box
    pub eye_padding: i64,
    /// Pupil x must lie within [t, 1 - t] of eye width
    pub horizontal_gaze_threshold: f64,
    /// Pupil y must lie within [t, 1 - t] of eye height
    pub vertical_gaze_threshold: f64,
    /// Gaussian blur kernel size before thresholding
    pub blur_kernel_size: usize,
    /// Adaptive threshold block size (odd)
    pub adaptive_block_size: usize,
    /// Adaptive threshold constant subtracted from the local mean
    pub adaptive_c: f64,
}

impl Default for EyeContactConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            good_gaze_ratio: 0.6,
            eye_padding: 5,
            horizontal_gaze_threshold: 0.40,
            vertical_gaze_threshold: 0.40,
            blur_kernel_size: 5,
            adaptive_block_size: 11,
            adaptive_c: 4.0,
        }
    }
}

/// Smile detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Number of frames kept for label smoothing
    pub history_size: usize,
    /// Scale applied to mouth width
    pub width_scale: f64,
    /// Scale applied to the summed corner lift
    pub lift_scale: f64,
    /// Width score below which width contributes nothing
    pub width_offset: f64,
    /// Extra gain on the lift component
    pub lift_gain: f64,
    /// Weight of the width component
    pub width_weight: f64,
    /// Weight of the lift component
    pub lift_weight: f64,
    /// Raw score above which a frame counts as smiling
    pub smiling_threshold: f64,
    /// Smoothed score above which the label is "Big Smile"
    pub big_smile_threshold: f64,
    /// Smoothed score above which the label is "Smile"
    pub smile_threshold: f64,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            history_size: 30,
            width_scale: 8.0,
            lift_scale: 3.0,
            width_offset: 0.25,
            lift_gain: 3.0,
            width_weight: 0.4,
            lift_weight: 0.6,
            smiling_threshold: 0.15,
            big_smile_threshold: 0.3,
            smile_threshold: 0.2,
        }
    }
}

/// Fusion weights over the five session metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub posture: f64,
    pub smile: f64,
    pub eye_contact: f64,
    pub answer_quality: f64,
    pub sentiment: f64,
}

impl FusionWeights {
    /// Weights used when only video metrics are available
    pub const VIDEO_ONLY: FusionWeights = FusionWeights {
        posture: 0.4,
        smile: 0.3,
        eye_contact: 0.3,
        answer_quality: 0.0,
        sentiment: 0.0,
    };

    /// Weights used when answer quality and sentiment are available
    pub const FULL: FusionWeights = FusionWeights {
        posture: 0.3,
        smile: 0.2,
        eye_contact: 0.2,
        answer_quality: 0.2,
        sentiment: 0.1,
    };

    pub fn total(&self) -> f64 {
        self.posture + self.smile + self.eye_contact + self.answer_quality + self.sentiment
    }
}

/// Session fusion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub video_only: FusionWeights,
    pub full: FusionWeights,
    /// Substituted for a missing answer quality or sentiment in the full profile
    pub neutral_fill: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            video_only: FusionWeights::VIDEO_ONLY,
            full: FusionWeights::FULL,
            neutral_fill: 50.0,
        }
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub posture: PostureConfig,
    pub eye_contact: EyeContactConfig,
    pub expression: ExpressionConfig,
    pub fusion: FusionConfig,
}

impl AnalyzerConfig {
    /// Load and validate configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: AnalyzerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        serde_json::to_string_pretty(self).map_err(AnalysisError::JsonError)
    }

    /// Check that windows are non-empty, ratios lie in [0, 1] and each weight profile is usable
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.posture.window_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "posture.window_size must be at least 1".to_string(),
            ));
        }
        if self.eye_contact.window_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "eye_contact.window_size must be at least 1".to_string(),
            ));
        }
        if self.expression.history_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "expression.history_size must be at least 1".to_string(),
            ));
        }
        if self.eye_contact.adaptive_block_size < 3 || self.eye_contact.adaptive_block_size % 2 == 0
        {
            return Err(AnalysisError::InvalidConfig(
                "eye_contact.adaptive_block_size must be odd and at least 3".to_string(),
            ));
        }
        if self.eye_contact.blur_kernel_size == 0 || self.eye_contact.blur_kernel_size % 2 == 0 {
            return Err(AnalysisError::InvalidConfig(
                "eye_contact.blur_kernel_size must be odd".to_string(),
            ));
        }

        let ratios = [
            ("posture.excellent_ratio", self.posture.excellent_ratio),
            ("posture.good_ratio", self.posture.good_ratio),
            ("eye_contact.good_gaze_ratio", self.eye_contact.good_gaze_ratio),
            (
                "eye_contact.horizontal_gaze_threshold",
                self.eye_contact.horizontal_gaze_threshold,
            ),
            (
                "eye_contact.vertical_gaze_threshold",
                self.eye_contact.vertical_gaze_threshold,
            ),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        for (name, weights) in [
            ("fusion.video_only", &self.fusion.video_only),
            ("fusion.full", &self.fusion.full),
        ] {
            let values = [
                weights.posture,
                weights.smile,
                weights.eye_contact,
                weights.answer_quality,
                weights.sentiment,
            ];
            if values.iter().any(|w| *w < 0.0 || !w.is_finite()) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} weights must be finite and non-negative"
                )));
            }
            if weights.total() <= 0.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} weights must not all be zero"
                )));
            }
        }

        Ok(())
    }
}
