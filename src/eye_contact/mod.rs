//! Eye contact analysis
//!
//! Locates both pupils inside their eye regions, decides whether the average
//! pupil position is centered, and smooths that decision over a short window.
//!
//! # Example
//!
//! ```ignore
//! use interview_signals::EyeContactAnalyzer;
//!
//! let mut analyzer = EyeContactAnalyzer::new();
//! let frame = analyzer.analyze_frame(Some(&image), face.as_ref());
//! println!("{}", frame.state);
//! ```

pub mod pupil;
pub mod region;

pub use pupil::{locate_pupil, PupilParams};
pub use region::EyeRegion;

use crate::config::EyeContactConfig;
use crate::error::AnalysisError;
use crate::landmarks::{FaceMesh, LEFT_EYE_INDICES, RIGHT_EYE_INDICES};
use crate::smoothing::{round_to, RunningTally, SmoothingWindow};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smoothed gaze state for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeState {
    LookingAtCamera,
    LookingAway,
    /// No face, no pixels, or neither pupil found
    NotLookingAtCamera,
}

impl fmt::Display for GazeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GazeState::LookingAtCamera => "Looking at Camera",
            GazeState::LookingAway => "Looking Away",
            GazeState::NotLookingAtCamera => "Not Looking at Camera",
        };
        write!(f, "{text}")
    }
}

/// Detected pupils in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pupils {
    pub left: Option<(u32, u32)>,
    pub right: Option<(u32, u32)>,
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeFrame {
    pub state: GazeState,
    /// Unsmoothed centered test, `None` when it could not run
    pub raw_looking: Option<bool>,
    /// Share of centered frames in the window after this frame
    pub window_ratio: Option<f64>,
    pub pupils: Pupils,
}

impl GazeFrame {
    fn not_looking(pupils: Pupils) -> Self {
        Self {
            state: GazeState::NotLookingAtCamera,
            raw_looking: None,
            window_ratio: None,
            pupils,
        }
    }
}

/// Session eye contact score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeContactScore {
    pub eye_contact_score: f64,
    pub total_frames: u32,
}

/// Region and crop-relative pupil for one eye
struct EyeObservation {
    region: Result<EyeRegion, AnalysisError>,
    pupil: Option<(u32, u32)>,
}

/// Eye contact analyzer for one interview session
#[derive(Debug, Clone)]
pub struct EyeContactAnalyzer {
    config: EyeContactConfig,
    history: SmoothingWindow<bool>,
    tally: RunningTally,
}

impl Default for EyeContactAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeContactAnalyzer {
    pub fn new() -> Self {
        Self::with_config(EyeContactConfig::default())
    }

    pub fn with_config(config: EyeContactConfig) -> Self {
        Self {
            history: SmoothingWindow::new(config.window_size),
            config,
            tally: RunningTally::default(),
        }
    }

    fn pupil_params(&self) -> PupilParams {
        PupilParams {
            blur_kernel_size: self.config.blur_kernel_size,
            block_size: self.config.adaptive_block_size,
            c: self.config.adaptive_c,
        }
    }

    fn observe_eye(
        &self,
        frame: &RgbImage,
        face: &FaceMesh,
        indices: &[usize; 6],
    ) -> EyeObservation {
        let region = EyeRegion::from_landmarks(
            face,
            indices,
            frame.width(),
            frame.height(),
            self.config.eye_padding,
        );
        let pupil = match &region {
            Ok(r) => match r.crop(frame) {
                Ok(crop) => locate_pupil(&crop, &self.pupil_params()),
                Err(e) => {
                    log::warn!("Eye region unusable: {e}");
                    None
                }
            },
            Err(e) => {
                log::warn!("Eye region unusable: {e}");
                None
            }
        };
        EyeObservation { region, pupil }
    }

    /// Centered test on crop-relative pupil positions
    fn is_centered(&self, left: (u32, u32), right: (u32, u32), width: i64, height: i64) -> bool {
        let avg_x = ((left.0 + right.0) / 2) as f64;
        let pupil_y = left.1 as f64;
        let (w, h) = (width as f64, height as f64);
        let ht = self.config.horizontal_gaze_threshold;
        let vt = self.config.vertical_gaze_threshold;

        (w * ht..=w * (1.0 - ht)).contains(&avg_x) && (h * vt..=h * (1.0 - vt)).contains(&pupil_y)
    }

    /// Analyze one frame. Every call counts toward the total.
    pub fn analyze_frame(&mut self, frame: Option<&RgbImage>, face: Option<&FaceMesh>) -> GazeFrame {
        let result = self.evaluate(frame, face);
        self.tally.record(result.state == GazeState::LookingAtCamera);

        log::debug!(
            "Eye contact frame {}: {} (raw {:?}, ratio {:?})",
            self.tally.total_frames,
            result.state,
            result.raw_looking,
            result.window_ratio
        );
        result
    }

    fn evaluate(&mut self, frame: Option<&RgbImage>, face: Option<&FaceMesh>) -> GazeFrame {
        let (frame, face) = match (frame, face) {
            (Some(frame), Some(face)) if frame.width() > 0 && frame.height() > 0 => (frame, face),
            _ => return GazeFrame::not_looking(Pupils::default()),
        };

        let left = self.observe_eye(frame, face, &LEFT_EYE_INDICES);
        let right = self.observe_eye(frame, face, &RIGHT_EYE_INDICES);

        let absolute = |eye: &EyeObservation| match (&eye.region, eye.pupil) {
            (Ok(region), Some((px, py))) => {
                let (ox, oy) = region.origin();
                Some((ox + px, oy + py))
            }
            _ => None,
        };
        let pupils = Pupils {
            left: absolute(&left),
            right: absolute(&right),
        };

        // A single detected pupil stands in for both
        let (left_pupil, right_pupil) = match (left.pupil, right.pupil) {
            (Some(l), Some(r)) => (l, r),
            (Some(l), None) => (l, l),
            (None, Some(r)) => (r, r),
            (None, None) => return GazeFrame::not_looking(pupils),
        };

        let dims = match (&left.region, &right.region) {
            (Ok(region), _) | (Err(_), Ok(region)) => (region.width(), region.height()),
            _ => return GazeFrame::not_looking(pupils),
        };

        let raw = self.is_centered(left_pupil, right_pupil, dims.0, dims.1);
        self.history.push(raw);
        let ratio = self.history.ratio().unwrap_or(0.0);
        let state = if ratio >= self.config.good_gaze_ratio {
            GazeState::LookingAtCamera
        } else {
            GazeState::LookingAway
        };

        GazeFrame {
            state,
            raw_looking: Some(raw),
            window_ratio: Some(ratio),
            pupils,
        }
    }

    /// Share of frames looking at the camera, in percent with 2 decimals
    pub fn get_eye_contact_score(&self) -> EyeContactScore {
        EyeContactScore {
            eye_contact_score: round_to(self.tally.percentage(), 2),
            total_frames: self.tally.total_frames,
        }
    }

    pub fn tally(&self) -> RunningTally {
        self.tally
    }

    pub fn config(&self) -> &EyeContactConfig {
        &self.config
    }
}
