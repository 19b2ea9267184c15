//! Interview session orchestration
//!
//! An [`InterviewSession`] owns one landmark source and one instance of each
//! analyzer. Every frame is run through detection once and the landmarks are
//! fanned out to all three analyzers. Frames must be submitted in capture
//! order; the smoothing windows and tallies are order-dependent.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::expression::{ExpressionAnalyzer, ExpressionOutcome, SmileScore};
use crate::eye_contact::{EyeContactAnalyzer, EyeContactScore, GazeFrame};
use crate::fusion::{FusionInputs, SessionFusion, SessionScoreReport};
use crate::landmarks::{FaceMesh, LandmarkSource, PoseLandmarks};
use crate::overlay;
use crate::posture::{PostureAnalyzer, PostureFrame, PostureScore};
use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::Serialize;
use uuid::Uuid;

/// Per-frame output of all three analyzers
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// Zero-based index of the frame within the session
    pub frame_index: u32,
    /// `None` when no usable pose was detected (frame not counted)
    pub posture: Option<PostureFrame>,
    pub gaze: GazeFrame,
    pub expression: ExpressionOutcome,
    /// Annotated copy of the input frame, when annotation is enabled
    #[serde(skip)]
    pub annotated: Option<RgbImage>,
}

impl FrameReport {
    /// One-line summary of the three states
    pub fn summary(&self) -> String {
        let posture = self
            .posture
            .as_ref()
            .map(|p| p.status())
            .unwrap_or_else(|| AnalysisError::NoPoseDetected.to_string());
        let expression = match &self.expression {
            ExpressionOutcome::NoFace => self.expression.message().to_string(),
            ExpressionOutcome::Analyzed(reading) => reading.label.to_string(),
        };
        format!(
            "Posture: {posture} | Eye Contact: {} | Expression: {expression}",
            self.gaze.state
        )
    }
}

/// One candidate's interview recording session
pub struct InterviewSession<S: LandmarkSource> {
    session_id: String,
    started_at: DateTime<Utc>,
    source: S,
    posture: PostureAnalyzer,
    eye_contact: EyeContactAnalyzer,
    expression: ExpressionAnalyzer,
    fusion: SessionFusion,
    frames_processed: u32,
    annotate: bool,
}

impl<S: LandmarkSource> InterviewSession<S> {
    /// Create a session with default analyzer configuration
    pub fn new(source: S) -> Self {
        Self::with_config(source, AnalyzerConfig::default())
    }

    pub fn with_config(source: S, config: AnalyzerConfig) -> Self {
        let session_id = Uuid::new_v4().to_string();
        log::debug!("Starting interview session {session_id}");
        Self {
            session_id,
            started_at: Utc::now(),
            source,
            posture: PostureAnalyzer::with_config(config.posture),
            eye_contact: EyeContactAnalyzer::with_config(config.eye_contact),
            expression: ExpressionAnalyzer::with_config(config.expression),
            fusion: SessionFusion::with_config(config.fusion),
            frames_processed: 0,
            annotate: false,
        }
    }

    /// Produce annotated frame copies in every [`FrameReport`]
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Detect landmarks on a frame and run all analyzers
    pub fn process_frame(&mut self, frame: &RgbImage) -> FrameReport {
        let pose = self.source.detect_pose(frame);
        let face = self.source.detect_face(frame);
        self.process_landmarks(Some(frame), pose.as_ref(), face.as_ref())
    }

    /// Run all analyzers on pre-extracted landmarks.
    ///
    /// Without `image` the eye contact analyzer has no pixels and counts the
    /// frame as not looking.
    pub fn process_landmarks(
        &mut self,
        image: Option<&RgbImage>,
        pose: Option<&PoseLandmarks>,
        face: Option<&FaceMesh>,
    ) -> FrameReport {
        let frame_index = self.frames_processed;
        self.frames_processed += 1;

        let posture = match self.posture.analyze_frame(pose) {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::debug!("Frame {frame_index}: {e}");
                None
            }
        };
        let gaze = self.eye_contact.analyze_frame(image, face);
        let expression = self.expression.analyze_frame(face);

        let mut report = FrameReport {
            frame_index,
            posture,
            gaze,
            expression,
            annotated: None,
        };
        if self.annotate {
            if let Some(image) = image {
                report.annotated = Some(overlay::annotate(image, pose, face, &report));
            }
        }
        report
    }

    pub fn posture_score(&self) -> PostureScore {
        self.posture.get_posture_score()
    }

    pub fn eye_contact_score(&self) -> EyeContactScore {
        self.eye_contact.get_eye_contact_score()
    }

    pub fn smile_score(&self) -> SmileScore {
        self.expression.get_smile_score()
    }

    /// Current analyzer scores as fusion inputs
    pub fn fusion_inputs(&self) -> FusionInputs {
        FusionInputs::video(
            self.posture_score().posture_score,
            self.smile_score().smile_percentage,
            self.eye_contact_score().eye_contact_score,
        )
        .with_total_frames(self.frames_processed)
    }

    /// Video-only session report
    pub fn report(&self) -> SessionScoreReport {
        self.report_with(None, None)
    }

    /// Session report including the external answer quality and sentiment scores
    pub fn report_with(
        &self,
        answer_quality: Option<f64>,
        sentiment: Option<f64>,
    ) -> SessionScoreReport {
        let mut inputs = self.fusion_inputs();
        inputs.answer_quality_score = answer_quality;
        inputs.sentiment_score = sentiment;
        self.fusion.fuse(&inputs)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn frames_processed(&self) -> u32 {
        self.frames_processed
    }

    pub fn expression(&self) -> &ExpressionAnalyzer {
        &self.expression
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::tests::mouth_face;
    use crate::eye_contact::tests::{looking_frame, test_face};
    use crate::eye_contact::GazeState;
    use crate::fusion::FusionProfile;
    use crate::landmarks::{FaceMesh, MOUTH_LEFT_CORNER, MOUTH_RIGHT_CORNER};
    use crate::posture::tests::upright_pose;
    use pretty_assertions::assert_eq;

    /// Source that returns the same landmarks for every frame
    struct FixedSource {
        pose: Option<PoseLandmarks>,
        face: Option<FaceMesh>,
        calls: u32,
    }

    impl LandmarkSource for FixedSource {
        fn detect_pose(&mut self, _frame: &RgbImage) -> Option<PoseLandmarks> {
            self.calls += 1;
            self.pose.clone()
        }

        fn detect_face(&mut self, _frame: &RgbImage) -> Option<FaceMesh> {
            self.face.clone()
        }
    }

    /// Eye landmarks of the eye test face plus a wide smiling mouth
    fn smiling_test_face() -> FaceMesh {
        let mut face = test_face();
        let mouth = mouth_face(0.15625);
        for index in [MOUTH_LEFT_CORNER, MOUTH_RIGHT_CORNER, 13, 14] {
            face.points[index] = mouth.points[index];
        }
        face
    }

    #[test]
    fn test_all_good_session() {
        let source = FixedSource {
            pose: Some(upright_pose()),
            face: Some(smiling_test_face()),
            calls: 0,
        };
        let mut session = InterviewSession::new(source);
        let frame = looking_frame();
        for _ in 0..6 {
            let report = session.process_frame(&frame);
            assert_eq!(report.gaze.state, GazeState::LookingAtCamera);
            assert!(report.annotated.is_none());
        }

        assert_eq!(session.source().calls, 6);
        let report = session.report();
        assert_eq!(report.posture_score, 100.0);
        assert_eq!(report.eye_contact_score, 100.0);
        assert_eq!(report.smile_percentage, 100.0);
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.total_frames, 6);
        assert_eq!(report.profile, FusionProfile::VideoOnly);
    }

    #[test]
    fn test_empty_detection_session() {
        let source = FixedSource {
            pose: None,
            face: None,
            calls: 0,
        };
        let mut session = InterviewSession::new(source);
        let report = session.process_frame(&looking_frame());
        assert!(report.posture.is_none());
        assert_eq!(report.expression, ExpressionOutcome::NoFace);
        assert!(report.summary().contains("Not Looking at Camera"));

        // Eye contact counts the frame, the others skip it
        assert_eq!(session.eye_contact_score().total_frames, 1);
        assert_eq!(session.posture_score().total_frames, 0);
        assert_eq!(session.smile_score().total_frames, 0);
        assert_eq!(session.report().overall_score, 0.0);
    }

    #[test]
    fn test_landmarks_without_pixels() {
        let source = FixedSource {
            pose: None,
            face: None,
            calls: 0,
        };
        let mut session = InterviewSession::new(source);
        let pose = upright_pose();
        let face = smiling_test_face();
        let report = session.process_landmarks(None, Some(&pose), Some(&face));
        assert_eq!(report.frame_index, 0);
        assert_eq!(report.gaze.state, GazeState::NotLookingAtCamera);
        assert!(report.posture.is_some());
        assert_eq!(session.source().calls, 0);
    }

    #[test]
    fn test_report_with_answer_metrics() {
        let source = FixedSource {
            pose: Some(upright_pose()),
            face: Some(smiling_test_face()),
            calls: 0,
        };
        let mut session = InterviewSession::new(source);
        session.process_frame(&looking_frame());
        let report = session.report_with(Some(80.0), None);
        assert_eq!(report.profile, FusionProfile::Full);
        // 30 + 20 + 20 + 16 + 5
        assert_eq!(report.overall_score, 91.0);
        assert_eq!(report.sentiment_score, Some(50.0));
    }

    #[test]
    fn test_annotation_produces_copy() {
        let source = FixedSource {
            pose: Some(upright_pose()),
            face: Some(test_face()),
            calls: 0,
        };
        let mut session = InterviewSession::new(source).with_annotations(true);
        let frame = looking_frame();
        let report = session.process_frame(&frame);
        let annotated = report.annotated.expect("annotation enabled");
        assert_eq!(annotated.dimensions(), frame.dimensions());
        assert_ne!(annotated, frame);
    }
}
