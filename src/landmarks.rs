//! Landmark types and the detector seam
//!
//! Landmarks arrive in normalized image coordinates (0-1) using the MediaPipe
//! indexing schemes: 33 points for body pose, 468/478 points for the face
//! mesh. The detectors themselves are external; the engine only sees their
//! numeric output through [`LandmarkSource`].

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// A single landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth, when the detector provides it
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Midpoint of two landmarks in the image plane
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Euclidean distance in the image plane
    pub fn distance(&self, other: &Landmark) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Pixel position (truncated) for an image of the given size.
    ///
    /// Each axis is clamped to one image extent beyond either edge, so far
    /// out-of-frame landmarks stay in a range safe for pixel arithmetic.
    pub fn to_pixel(&self, width: u32, height: u32) -> (i64, i64) {
        let axis = |v: f64, extent: u32| {
            let extent = extent as i64;
            ((v * extent as f64) as i64).clamp(-extent, 2 * extent)
        };
        (axis(self.x, width), axis(self.y, height))
    }
}

/// Body pose landmarks used by the posture analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseLandmark {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
}

impl PoseLandmark {
    /// Index in the 33-point pose model
    pub fn index(self) -> usize {
        match self {
            PoseLandmark::Nose => 0,
            PoseLandmark::LeftEar => 7,
            PoseLandmark::RightEar => 8,
            PoseLandmark::LeftShoulder => 11,
            PoseLandmark::RightShoulder => 12,
            PoseLandmark::LeftHip => 23,
            PoseLandmark::RightHip => 24,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PoseLandmark::Nose => "nose",
            PoseLandmark::LeftEar => "left_ear",
            PoseLandmark::RightEar => "right_ear",
            PoseLandmark::LeftShoulder => "left_shoulder",
            PoseLandmark::RightShoulder => "right_shoulder",
            PoseLandmark::LeftHip => "left_hip",
            PoseLandmark::RightHip => "right_hip",
        }
    }

    pub const REQUIRED: [PoseLandmark; 7] = [
        PoseLandmark::Nose,
        PoseLandmark::LeftEar,
        PoseLandmark::RightEar,
        PoseLandmark::LeftShoulder,
        PoseLandmark::RightShoulder,
        PoseLandmark::LeftHip,
        PoseLandmark::RightHip,
    ];
}

/// Number of points in a full pose result
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Pose connections drawn by the overlay (subset of the pose skeleton)
pub const POSE_CONNECTIONS: [(usize, usize); 8] = [
    (11, 12),
    (11, 23),
    (12, 24),
    (23, 24),
    (0, 7),
    (0, 8),
    (11, 13),
    (12, 14),
];

/// Pose detector output for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub points: Vec<Landmark>,
}

impl PoseLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, landmark: PoseLandmark) -> Option<&Landmark> {
        self.points
            .get(landmark.index())
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Names of required landmarks that are absent or non-finite
    pub fn missing(&self) -> Vec<&'static str> {
        PoseLandmark::REQUIRED
            .iter()
            .filter(|l| self.get(**l).is_none())
            .map(|l| l.name())
            .collect()
    }
}

/// Face mesh indices around the left eye (corners, upper lid, lower lid)
pub const LEFT_EYE_INDICES: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Face mesh indices around the right eye
pub const RIGHT_EYE_INDICES: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Face mesh index of the left mouth corner
pub const MOUTH_LEFT_CORNER: usize = 61;
/// Face mesh index of the right mouth corner
pub const MOUTH_RIGHT_CORNER: usize = 291;
/// Face mesh index of the upper lip center
pub const UPPER_LIP: usize = 13;
/// Face mesh index of the lower lip center
pub const LOWER_LIP: usize = 14;

/// Number of points in a face mesh without iris refinement
pub const FACE_MESH_LANDMARK_COUNT: usize = 468;

/// Face mesh output for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceMesh {
    pub points: Vec<Landmark>,
}

impl FaceMesh {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points
            .get(index)
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Collect the listed points, or `None` if any is missing
    pub fn select<const N: usize>(&self, indices: &[usize; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, &index) in out.iter_mut().zip(indices.iter()) {
            *slot = *self.get(index)?;
        }
        Some(out)
    }
}

/// Landmark detector seam.
///
/// Implementations wrap a pose / face-mesh model. Each interview session owns
/// its own source, so a detector with tracking state is never shared between
/// sessions.
pub trait LandmarkSource {
    /// Detect body pose landmarks, `None` when no person is found
    fn detect_pose(&mut self, frame: &RgbImage) -> Option<PoseLandmarks>;

    /// Detect the face mesh, `None` when no face is found
    fn detect_face(&mut self, frame: &RgbImage) -> Option<FaceMesh>;
}
