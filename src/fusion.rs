//! Session fusion
//!
//! Combines the three analyzer percentages (and optionally answer quality and
//! sentiment from an external answer analyzer) into one weighted score.

use crate::config::{FusionConfig, FusionWeights};
use crate::smoothing::round_to;
use serde::{Deserialize, Serialize};

/// Which weight set was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionProfile {
    /// Posture, smile and eye contact only
    VideoOnly,
    /// All five metrics
    Full,
}

/// Final per-metric scores entering fusion, all 0-100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FusionInputs {
    pub posture_score: f64,
    pub smile_percentage: f64,
    pub eye_contact_score: f64,
    pub answer_quality_score: Option<f64>,
    pub sentiment_score: Option<f64>,
    /// Frames submitted to the session
    pub total_frames: u32,
}

impl FusionInputs {
    pub fn video(posture: f64, smile: f64, eye_contact: f64) -> Self {
        Self {
            posture_score: posture,
            smile_percentage: smile,
            eye_contact_score: eye_contact,
            ..Default::default()
        }
    }

    pub fn with_answer_quality(mut self, score: f64) -> Self {
        self.answer_quality_score = Some(score);
        self
    }

    pub fn with_sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score);
        self
    }

    pub fn with_total_frames(mut self, total_frames: u32) -> Self {
        self.total_frames = total_frames;
        self
    }

    /// Full profile as soon as either non-video metric is present
    pub fn profile(&self) -> FusionProfile {
        if self.answer_quality_score.is_some() || self.sentiment_score.is_some() {
            FusionProfile::Full
        } else {
            FusionProfile::VideoOnly
        }
    }
}

/// Session score report, values rounded to 1 decimal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScoreReport {
    pub posture_score: f64,
    pub eye_contact_score: f64,
    pub smile_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub answer_quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sentiment_score: Option<f64>,
    pub overall_score: f64,
    pub total_frames: u32,
    pub profile: FusionProfile,
}

/// Weighted combination of session metrics
#[derive(Debug, Clone, Default)]
pub struct SessionFusion {
    config: FusionConfig,
}

impl SessionFusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn weights(&self, profile: FusionProfile) -> &FusionWeights {
        match profile {
            FusionProfile::VideoOnly => &self.config.video_only,
            FusionProfile::Full => &self.config.full,
        }
    }

    /// Unrounded weighted score; missing non-video metrics take the neutral fill
    pub fn overall(&self, inputs: &FusionInputs) -> f64 {
        let profile = inputs.profile();
        let w = self.weights(profile);
        let video = w.posture * inputs.posture_score
            + w.smile * inputs.smile_percentage
            + w.eye_contact * inputs.eye_contact_score;

        match profile {
            FusionProfile::VideoOnly => video,
            FusionProfile::Full => {
                let answer = inputs.answer_quality_score.unwrap_or(self.config.neutral_fill);
                let sentiment = inputs.sentiment_score.unwrap_or(self.config.neutral_fill);
                video + w.answer_quality * answer + w.sentiment * sentiment
            }
        }
    }

    /// Build the reported session score
    pub fn fuse(&self, inputs: &FusionInputs) -> SessionScoreReport {
        let profile = inputs.profile();
        let overall = self.overall(inputs);
        log::debug!("Fused session score {:.3} ({:?})", overall, profile);

        let fill = |value: Option<f64>| match profile {
            FusionProfile::Full => Some(round_to(value.unwrap_or(self.config.neutral_fill), 1)),
            FusionProfile::VideoOnly => None,
        };

        SessionScoreReport {
            posture_score: round_to(inputs.posture_score, 1),
            eye_contact_score: round_to(inputs.eye_contact_score, 1),
            smile_percentage: round_to(inputs.smile_percentage, 1),
            answer_quality_score: fill(inputs.answer_quality_score),
            sentiment_score: fill(inputs.sentiment_score),
            overall_score: round_to(overall, 1),
            total_frames: inputs.total_frames,
            profile,
        }
    }
}
