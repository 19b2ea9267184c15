//! End-to-end scoring scenarios through the public API

use image::{Rgb, RgbImage};
use interview_signals::landmarks::{
    PoseLandmark, LEFT_EYE_INDICES, LOWER_LIP, MOUTH_LEFT_CORNER, MOUTH_RIGHT_CORNER,
    POSE_LANDMARK_COUNT, RIGHT_EYE_INDICES, UPPER_LIP,
};
use interview_signals::replay::{parse_ndjson, replay_record, validate_ndjson, FrameRecord};
use interview_signals::{
    AnalysisError, AttemptLedger, FaceMesh, FusionInputs, FusionProfile, GazeState,
    InterviewSession, Landmark, LandmarkSource, PoseLandmarks, PostureState, ReplaySource,
    ReportEncoder, ScorePayload, SessionFusion,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

const FRAME_SIZE: u32 = 200;

fn upright_pose() -> PoseLandmarks {
    let mut points = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
    points[PoseLandmark::Nose.index()] = Landmark::new(0.50, 0.30);
    points[PoseLandmark::LeftEar.index()] = Landmark::new(0.45, 0.28);
    points[PoseLandmark::RightEar.index()] = Landmark::new(0.55, 0.28);
    points[PoseLandmark::LeftShoulder.index()] = Landmark::new(0.35, 0.50);
    points[PoseLandmark::RightShoulder.index()] = Landmark::new(0.65, 0.50);
    points[PoseLandmark::LeftHip.index()] = Landmark::new(0.40, 0.90);
    points[PoseLandmark::RightHip.index()] = Landmark::new(0.60, 0.90);
    PoseLandmarks::new(points)
}

fn slumped_pose() -> PoseLandmarks {
    let mut pose = upright_pose();
    pose.points[PoseLandmark::RightShoulder.index()] = Landmark::new(0.65, 0.70);
    pose.points[PoseLandmark::Nose.index()] = Landmark::new(0.80, 0.30);
    pose
}

/// Face with eyes at pixel x 40-80 / 120-160 and a mouth of the given width
fn face(mouth_width: f64) -> FaceMesh {
    let mut points = vec![Landmark::new(0.5, 0.8); 478];
    let eye = |x0: u32| {
        [
            (x0, 60),
            (x0 + 10, 50),
            (x0 + 30, 50),
            (x0 + 40, 60),
            (x0 + 30, 70),
            (x0 + 10, 70),
        ]
    };
    for (indices, pixels) in [(LEFT_EYE_INDICES, eye(40)), (RIGHT_EYE_INDICES, eye(120))] {
        for (index, (x, y)) in indices.iter().zip(pixels) {
            points[*index] = Landmark::new(
                (x as f64 + 0.5) / FRAME_SIZE as f64,
                (y as f64 + 0.5) / FRAME_SIZE as f64,
            );
        }
    }
    points[MOUTH_LEFT_CORNER] = Landmark::new(0.5 - mouth_width / 2.0, 0.625);
    points[MOUTH_RIGHT_CORNER] = Landmark::new(0.5 + mouth_width / 2.0, 0.625);
    points[UPPER_LIP] = Landmark::new(0.5, 0.5);
    points[LOWER_LIP] = Landmark::new(0.5, 0.75);
    FaceMesh::new(points)
}

/// Light frame with dark pupils `crop_x` pixels into each 50x30 eye crop
fn frame_with_pupils(crop_x: i64) -> RgbImage {
    let mut frame = RgbImage::from_pixel(FRAME_SIZE, FRAME_SIZE, Rgb([235, 235, 235]));
    for cx in [35 + crop_x, 115 + crop_x] {
        for y in 56..=64i64 {
            for x in (cx - 4)..=(cx + 4) {
                if (x - cx).pow(2) + (y - 60).pow(2) <= 16 {
                    frame.put_pixel(x as u32, y as u32, Rgb([10, 10, 10]));
                }
            }
        }
    }
    frame
}

struct Scripted {
    frames: Vec<(Option<PoseLandmarks>, Option<FaceMesh>)>,
    pose_calls: usize,
    face_calls: usize,
}

impl Scripted {
    fn new(frames: Vec<(Option<PoseLandmarks>, Option<FaceMesh>)>) -> Self {
        Self {
            frames,
            pose_calls: 0,
            face_calls: 0,
        }
    }
}

impl LandmarkSource for Scripted {
    fn detect_pose(&mut self, _frame: &RgbImage) -> Option<PoseLandmarks> {
        let pose = self.frames.get(self.pose_calls).and_then(|f| f.0.clone());
        self.pose_calls += 1;
        pose
    }

    fn detect_face(&mut self, _frame: &RgbImage) -> Option<FaceMesh> {
        let face = self.frames.get(self.face_calls).and_then(|f| f.1.clone());
        self.face_calls += 1;
        face
    }
}

fn pose_line(frame_index: u64, pose: &PoseLandmarks) -> String {
    FrameRecord {
        frame_index,
        pose: Some(pose.clone()),
        ..Default::default()
    }
    .to_json_line()
    .unwrap()
}

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("interview-signals-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_ten_upright_frames_score_full_posture() {
    let frames = (0..10).map(|_| (Some(upright_pose()), None)).collect();
    let mut session = InterviewSession::new(Scripted::new(frames));
    let image = RgbImage::new(FRAME_SIZE, FRAME_SIZE);

    let mut last = None;
    for _ in 0..10 {
        last = session.process_frame(&image).posture;
    }

    let last = last.unwrap();
    assert_eq!(last.state, PostureState::ExcellentPosture);
    assert_eq!(last.window_ratio, 1.0);
    assert_eq!(session.posture_score().posture_score, 100.0);
    assert_eq!(session.posture_score().total_frames, 10);
}

#[test]
fn test_mixed_posture_session() {
    let frames = (0..10)
        .map(|i| {
            let pose = if i < 6 { upright_pose() } else { slumped_pose() };
            (Some(pose), None)
        })
        .collect();
    let mut session = InterviewSession::new(Scripted::new(frames));
    let image = RgbImage::new(FRAME_SIZE, FRAME_SIZE);

    let reports: Vec<_> = (0..10).map(|_| session.process_frame(&image)).collect();
    assert_eq!(session.posture_score().posture_score, 60.0);

    // Only frame 5 of the last five was good
    let last = reports[9].posture.as_ref().unwrap();
    assert_eq!(last.window_ratio, 0.2);
    assert!(matches!(last.state, PostureState::PoorPosture(_)));
    assert!(last.status().starts_with("Poor Posture: "));
    assert_eq!(reports[5].posture.as_ref().unwrap().state, PostureState::ExcellentPosture);
}

#[test]
fn test_full_pipeline_with_pixels() {
    let frames = (0..10)
        .map(|i| {
            let mouth = if i < 3 { 0.15625 } else { 0.0625 };
            (Some(upright_pose()), Some(face(mouth)))
        })
        .collect();
    let mut session = InterviewSession::new(Scripted::new(frames));

    let looking = frame_with_pupils(25);
    let away = frame_with_pupils(8);
    for i in 0..10 {
        let frame = if i % 2 == 0 { &looking } else { &away };
        let report = session.process_frame(frame);
        assert_eq!(report.frame_index, i);
    }

    let report = session.report();
    assert_eq!(report.posture_score, 100.0);
    assert_eq!(report.smile_percentage, 30.0);
    assert_eq!(report.eye_contact_score, 50.0);
    assert_eq!(report.total_frames, 10);
    // 100 * 0.4 + 30 * 0.3 + 50 * 0.3
    assert_eq!(report.overall_score, 64.0);
    assert_eq!(report.profile, FusionProfile::VideoOnly);
    assert_eq!(session.expression().engagement().message(), "Good Engagement");
}

#[test]
fn test_fusion_weights() {
    let fusion = SessionFusion::new();
    assert_eq!(fusion.fuse(&FusionInputs::video(80.0, 60.0, 70.0)).overall_score, 71.0);

    let full = FusionInputs::video(80.0, 60.0, 70.0)
        .with_answer_quality(90.0)
        .with_sentiment(40.0);
    let report = fusion.fuse(&full);
    assert_eq!(report.profile, FusionProfile::Full);
    assert_eq!(report.overall_score, 72.0);
}

#[test]
fn test_replay_recording_end_to_end() {
    let mut text = String::new();
    for i in 0..8 {
        let pose = if i == 3 { slumped_pose() } else { upright_pose() };
        text.push_str(&pose_line(i, &pose));
        text.push('\n');
    }
    text.push_str("{\"frame_index\": 8}\n\n");

    let (valid, problems) = validate_ndjson(&text);
    assert_eq!(valid, 9);
    assert!(problems.is_empty());

    let records = parse_ndjson(&text).unwrap();
    let mut session = InterviewSession::new(ReplaySource::new());
    for record in records {
        replay_record(&mut session, record, None).unwrap();
    }

    // Frame 8 has no pose and is not counted
    assert_eq!(session.posture_score().total_frames, 8);
    assert_eq!(session.posture_score().posture_score, 87.5);
    assert_eq!(session.eye_contact_score().total_frames, 9);
    assert_eq!(session.eye_contact_score().eye_contact_score, 0.0);
    assert_eq!(session.frames_processed(), 9);

    let payload = ReportEncoder::new().encode(&session, &session.report());
    let json = serde_json::to_string(&payload).unwrap();
    let loaded = ScorePayload::from_json(&json).unwrap();
    assert_eq!(loaded.report.total_frames, 9);
    assert!(loaded.render_text().contains("Frames analyzed: 9"));
}

#[test]
fn test_replay_with_image_files() {
    let dir = scratch_dir();
    frame_with_pupils(25).save(dir.join("looking.png")).unwrap();

    let record = FrameRecord {
        frame_index: 0,
        pose: Some(upright_pose()),
        face: Some(face(0.0625)),
        image: Some(PathBuf::from("looking.png")),
    };
    let mut session = InterviewSession::new(ReplaySource::new()).with_annotations(true);
    let report = replay_record(&mut session, record, Some(&dir)).unwrap();

    assert_eq!(report.gaze.state, GazeState::LookingAtCamera);
    assert_eq!(report.gaze.pupils.left, Some((60, 60)));
    let annotated = report.annotated.unwrap();
    assert_eq!(annotated.dimensions(), (FRAME_SIZE, FRAME_SIZE));
    assert_eq!(session.source().served(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_bad_recording_reports_line() {
    let text = format!("{}\n{{\"pose\": [[0.1, 0.2, 0.3, 0.4]]}}\n", pose_line(0, &upright_pose()));
    let err = parse_ndjson(&text).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidLandmarks(_)));
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn test_attempts_across_questions() {
    let mut ledger = AttemptLedger::default();

    for (question, poses) in [("intro", 10usize), ("intro", 4), ("strengths", 7)] {
        let frames = (0..10)
            .map(|i| {
                let pose = if i < poses { upright_pose() } else { slumped_pose() };
                (Some(pose), None)
            })
            .collect();
        let mut session = InterviewSession::new(Scripted::new(frames));
        let image = RgbImage::new(FRAME_SIZE, FRAME_SIZE);
        for _ in 0..10 {
            session.process_frame(&image);
        }
        ledger.record(question, session.report_with(Some(80.0), None)).unwrap();
    }

    let intro = ledger.question("intro").unwrap();
    assert_eq!(intro.attempts.len(), 2);
    assert_eq!(intro.best_attempt_number(), Some(1));
    assert_eq!(ledger.remaining_attempts("intro"), 1);

    let summary = ledger.summary();
    assert_eq!(summary.questions, 2);
    // Best posture scores 100 and 70
    assert_eq!(summary.posture_score, 85.0);
    assert_eq!(summary.answer_quality_score, 80.0);
    assert_eq!(summary.sentiment_score, 50.0);
}
