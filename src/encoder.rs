//! Score report encoding
//!
//! Wraps a session's scores into a self-describing JSON payload with producer
//! and provenance metadata, and renders the plain-text results report.

use crate::error::AnalysisError;
use crate::expression::{EngagementLevel, SmileScore};
use crate::eye_contact::EyeContactScore;
use crate::fusion::SessionScoreReport;
use crate::landmarks::LandmarkSource;
use crate::posture::PostureScore;
use crate::session::InterviewSession;
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current score payload schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where and when the scores were computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub session_id: String,
    pub started_at_utc: String,
    pub computed_at_utc: String,
    /// Seconds between session start and encoding
    pub duration_sec: i64,
}

/// Smile metric with its engagement band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmileSummary {
    #[serde(flatten)]
    pub score: SmileScore,
    pub engagement: EngagementLevel,
    pub message: String,
}

/// Per-analyzer session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub posture: PostureScore,
    pub eye_contact: EyeContactScore,
    pub smile: SmileSummary,
}

/// Complete score payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePayload {
    pub schema_version: String,
    pub producer: Producer,
    pub provenance: Provenance,
    pub metrics: MetricsSummary,
    pub report: SessionScoreReport,
}

impl ScorePayload {
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Plain-text results report
    pub fn render_text(&self) -> String {
        let heavy = "=".repeat(50);
        let light = "-".repeat(50);
        let report = &self.report;

        let mut lines = vec![
            heavy.clone(),
            "INTERVIEW ANALYSIS RESULTS".to_string(),
            heavy,
        ];
        let mut section = |title: &str, body: Vec<String>| {
            lines.push(String::new());
            lines.push(format!("{title}:"));
            lines.extend(body.into_iter().map(|line| format!("  {line}")));
        };
        section("POSTURE", vec![format!("Score: {:.1}%", report.posture_score)]);
        section(
            "SMILING",
            vec![
                format!("Time Spent Smiling: {:.1}%", report.smile_percentage),
                self.metrics.smile.message.clone(),
            ],
        );
        section("EYE CONTACT", vec![format!("Score: {:.1}%", report.eye_contact_score)]);
        if let Some(answer) = report.answer_quality_score {
            section("ANSWER QUALITY", vec![format!("Score: {answer:.1}%")]);
        }
        if let Some(sentiment) = report.sentiment_score {
            section("SENTIMENT", vec![format!("Score: {sentiment:.1}%")]);
        }

        lines.push(String::new());
        lines.push(light.clone());
        lines.push(format!("OVERALL SCORE: {:.1}%", report.overall_score));
        lines.push(light);
        lines.push(format!("Frames analyzed: {}", report.total_frames));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Encoder for score payloads
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Build a payload from a session and its fused report
    pub fn encode<S: LandmarkSource>(
        &self,
        session: &InterviewSession<S>,
        report: &SessionScoreReport,
    ) -> ScorePayload {
        let engagement = session.expression().engagement();
        let metrics = MetricsSummary {
            posture: session.posture_score(),
            eye_contact: session.eye_contact_score(),
            smile: SmileSummary {
                score: session.smile_score(),
                engagement,
                message: engagement.message().to_string(),
            },
        };
        self.encode_parts(session.session_id(), session.started_at(), metrics, report)
    }

    /// Build a payload from already collected parts
    pub fn encode_parts(
        &self,
        session_id: &str,
        started_at: DateTime<Utc>,
        metrics: MetricsSummary,
        report: &SessionScoreReport,
    ) -> ScorePayload {
        let computed_at = Utc::now();
        ScorePayload {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: Provenance {
                session_id: session_id.to_string(),
                started_at_utc: started_at.to_rfc3339(),
                computed_at_utc: computed_at.to_rfc3339(),
                duration_sec: (computed_at - started_at).num_seconds(),
            },
            metrics,
            report: report.clone(),
        }
    }

    /// Encode to pretty JSON
    pub fn encode_to_json<S: LandmarkSource>(
        &self,
        session: &InterviewSession<S>,
        report: &SessionScoreReport,
    ) -> Result<String, AnalysisError> {
        let payload = self.encode(session, report);
        serde_json::to_string_pretty(&payload).map_err(AnalysisError::JsonError)
    }
}
