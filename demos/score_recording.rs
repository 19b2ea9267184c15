//! Score a short synthetic recording and print the results report

use interview_signals::landmarks::{PoseLandmark, POSE_LANDMARK_COUNT};
use interview_signals::replay::FrameRecord;
use interview_signals::{
    FaceMesh, InterviewSession, Landmark, LandmarkSource, PoseLandmarks, ReportEncoder,
};

/// Replays a fixed script of poses, one per call
struct ScriptedSource {
    poses: Vec<Option<PoseLandmarks>>,
    next: usize,
}

impl LandmarkSource for ScriptedSource {
    fn detect_pose(&mut self, _frame: &image::RgbImage) -> Option<PoseLandmarks> {
        let pose = self.poses.get(self.next).cloned().flatten();
        self.next += 1;
        pose
    }

    fn detect_face(&mut self, _frame: &image::RgbImage) -> Option<FaceMesh> {
        None
    }
}

fn pose(nose_x: f64) -> PoseLandmarks {
    let mut points = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
    points[PoseLandmark::Nose.index()] = Landmark::new(nose_x, 0.30);
    points[PoseLandmark::LeftEar.index()] = Landmark::new(0.45, 0.28);
    points[PoseLandmark::RightEar.index()] = Landmark::new(0.55, 0.28);
    points[PoseLandmark::LeftShoulder.index()] = Landmark::new(0.35, 0.50);
    points[PoseLandmark::RightShoulder.index()] = Landmark::new(0.65, 0.50);
    points[PoseLandmark::LeftHip.index()] = Landmark::new(0.40, 0.90);
    points[PoseLandmark::RightHip.index()] = Landmark::new(0.60, 0.90);
    PoseLandmarks::new(points)
}

fn main() {
    // Candidate drifts sideways for a few frames and loses the camera for one
    let poses = (0..20)
        .map(|i| match i {
            7 => None,
            12..=15 => Some(pose(0.80)),
            _ => Some(pose(0.50)),
        })
        .collect();
    let mut session = InterviewSession::new(ScriptedSource { poses, next: 0 });

    let frame = image::RgbImage::new(64, 48);
    for _ in 0..20 {
        let report = session.process_frame(&frame);
        println!("#{:02} {}", report.frame_index, report.summary());
    }

    let report = session.report_with(Some(82.0), None);
    let payload = ReportEncoder::new().encode(&session, &report);
    println!();
    print!("{}", payload.render_text());

    // The same frame, as it would appear in a replay recording
    let record = FrameRecord {
        frame_index: 0,
        pose: Some(pose(0.50)),
        ..Default::default()
    };
    match record.to_json_line() {
        Ok(line) => println!("\nReplay record: {} bytes", line.len()),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
