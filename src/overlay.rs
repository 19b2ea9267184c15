//! Debug annotation of analyzed frames
//!
//! Draws landmarks, detected pupils and a three-row status bar (posture,
//! eye contact, expression) onto a copy of the frame. Text is not rendered;
//! the status rows are color coded instead.

use crate::eye_contact::GazeState;
use crate::expression::{ExpressionOutcome, SmileLabel};
use crate::landmarks::{FaceMesh, PoseLandmarks, POSE_CONNECTIONS};
use crate::posture::PostureState;
use crate::session::FrameReport;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

pub const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
pub const YELLOW: Rgb<u8> = Rgb([230, 200, 0]);
pub const RED: Rgb<u8> = Rgb([220, 0, 0]);
pub const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Height of each status row in pixels
pub const STATUS_ROW_HEIGHT: u32 = 6;

fn to_canvas((x, y): (i64, i64)) -> (i32, i32) {
    let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (clamp(x), clamp(y))
}

fn fill_row(image: &mut RgbImage, row: u32, color: Rgb<u8>) {
    if image.width() == 0 || image.height() == 0 {
        return;
    }
    let top = (row * STATUS_ROW_HEIGHT) as i32;
    let rect = Rect::at(0, top).of_size(image.width(), STATUS_ROW_HEIGHT);
    draw_filled_rect_mut(image, rect, color);
}

pub fn posture_color(state: Option<&PostureState>) -> Rgb<u8> {
    match state {
        Some(PostureState::ExcellentPosture) => GREEN,
        Some(PostureState::GoodPosture) => YELLOW,
        Some(PostureState::PoorPosture(_)) => RED,
        None => GRAY,
    }
}

pub fn gaze_color(state: GazeState) -> Rgb<u8> {
    match state {
        GazeState::LookingAtCamera => GREEN,
        GazeState::LookingAway => YELLOW,
        GazeState::NotLookingAtCamera => RED,
    }
}

pub fn expression_color(outcome: &ExpressionOutcome) -> Rgb<u8> {
    match outcome.reading().map(|r| r.label) {
        Some(SmileLabel::BigSmile | SmileLabel::Smile) => GREEN,
        Some(SmileLabel::SlightSmile) => YELLOW,
        Some(SmileLabel::NotSmiling) => RED,
        None => GRAY,
    }
}

/// Annotated copy of `frame`
pub fn annotate(
    frame: &RgbImage,
    pose: Option<&PoseLandmarks>,
    face: Option<&FaceMesh>,
    report: &FrameReport,
) -> RgbImage {
    let mut out = frame.clone();
    let (w, h) = out.dimensions();

    if let Some(face) = face {
        for point in face.points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
            draw_filled_circle_mut(&mut out, to_canvas(point.to_pixel(w, h)), 0, WHITE);
        }
    }

    if let Some(pose) = pose {
        let pixel = |i: usize| {
            pose.points
                .get(i)
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .map(|p| to_canvas(p.to_pixel(w, h)))
        };
        for (a, b) in POSE_CONNECTIONS {
            if let (Some(from), Some(to)) = (pixel(a), pixel(b)) {
                draw_line_segment_mut(
                    &mut out,
                    (from.0 as f32, from.1 as f32),
                    (to.0 as f32, to.1 as f32),
                    GREEN,
                );
            }
        }
        for i in 0..pose.points.len() {
            if let Some(center) = pixel(i) {
                draw_filled_circle_mut(&mut out, center, 2, GREEN);
            }
        }
    }

    for (x, y) in [report.gaze.pupils.left, report.gaze.pupils.right]
        .into_iter()
        .flatten()
    {
        draw_filled_circle_mut(&mut out, to_canvas((x as i64, y as i64)), 3, BLUE);
    }

    fill_row(&mut out, 0, posture_color(report.posture.as_ref().map(|p| &p.state)));
    fill_row(&mut out, 1, gaze_color(report.gaze.state));
    fill_row(&mut out, 2, expression_color(&report.expression));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eye_contact::{GazeFrame, Pupils};
    use crate::landmarks::{Landmark, PoseLandmark};
    use crate::posture::tests::upright_pose;

    fn report(state: GazeState, pupils: Pupils) -> FrameReport {
        FrameReport {
            frame_index: 0,
            posture: None,
            gaze: GazeFrame {
                state,
                raw_looking: None,
                window_ratio: None,
                pupils,
            },
            expression: ExpressionOutcome::NoFace,
            annotated: None,
        }
    }

    #[test]
    fn test_status_rows() {
        let frame = RgbImage::from_pixel(40, 40, Rgb([10, 10, 10]));
        let out = annotate(
            &frame,
            None,
            None,
            &report(GazeState::LookingAtCamera, Pupils::default()),
        );
        assert_eq!(*out.get_pixel(0, 0), GRAY);
        assert_eq!(*out.get_pixel(39, STATUS_ROW_HEIGHT), GREEN);
        assert_eq!(*out.get_pixel(5, 2 * STATUS_ROW_HEIGHT + 1), GRAY);
        assert_eq!(*out.get_pixel(5, 30), Rgb([10, 10, 10]));
        // Input untouched
        assert_eq!(*frame.get_pixel(0, 0), Rgb([10, 10, 10]));
    }

    #[test]
    fn test_pupils_drawn() {
        let frame = RgbImage::new(40, 40);
        let pupils = Pupils {
            left: Some((20, 30)),
            right: None,
        };
        let out = annotate(&frame, None, None, &report(GazeState::LookingAway, pupils));
        assert_eq!(*out.get_pixel(20, 30), BLUE);
        assert_eq!(*out.get_pixel(23, 30), BLUE);
        assert_eq!(*out.get_pixel(24, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_pose_connections_drawn() {
        let frame = RgbImage::new(100, 100);
        let pose = upright_pose();
        let gaze = report(GazeState::LookingAway, Pupils::default());
        let out = annotate(&frame, Some(&pose), None, &gaze);
        // Shoulder line from (35, 50) to (65, 50)
        assert_eq!(*out.get_pixel(42, 50), GREEN);
        assert_eq!(*out.get_pixel(50, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_far_out_of_frame_landmarks() {
        let frame = RgbImage::new(60, 40);
        let mut pose = upright_pose();
        pose.points[PoseLandmark::LeftShoulder.index()] = Landmark::new(1e300, 0.3);
        pose.points[PoseLandmark::RightHip.index()] = Landmark::new(-1e9, 1e9);
        let face = FaceMesh::new(vec![Landmark::new(1e300, -1e300); 478]);

        let out = annotate(
            &frame,
            Some(&pose),
            Some(&face),
            &report(GazeState::LookingAway, Pupils::default()),
        );
        assert_eq!(out.dimensions(), (60, 40));
        assert_eq!(*out.get_pixel(0, STATUS_ROW_HEIGHT), YELLOW);
    }

    #[test]
    fn test_empty_frame() {
        let frame = RgbImage::new(0, 0);
        let gaze = report(GazeState::LookingAway, Pupils::default());
        assert_eq!(annotate(&frame, None, None, &gaze).dimensions(), (0, 0));
    }

    #[test]
    fn test_state_colors() {
        assert_eq!(posture_color(Some(&PostureState::ExcellentPosture)), GREEN);
        assert_eq!(posture_color(Some(&PostureState::PoorPosture(vec![]))), RED);
        assert_eq!(gaze_color(GazeState::NotLookingAtCamera), RED);
    }
}
