//! Eye region extraction from face mesh landmarks

use crate::error::AnalysisError;
use crate::landmarks::FaceMesh;
use image::{imageops, RgbImage};

/// Padded pixel bounds around one eye
///
/// Bounds are kept unclamped so the eye dimensions used by the gaze test do
/// not shrink near the image border; only the crop is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeRegion {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl EyeRegion {
    /// Bounding box of the listed landmarks in pixels, padded on every side
    pub fn from_landmarks(
        face: &FaceMesh,
        indices: &[usize; 6],
        width: u32,
        height: u32,
        padding: i64,
    ) -> Result<Self, AnalysisError> {
        let points = face
            .select(indices)
            .ok_or_else(|| AnalysisError::DegenerateRegion("eye landmarks missing".to_string()))?;

        let pixels = points.map(|p| p.to_pixel(width, height));
        let x_min = pixels.iter().map(|p| p.0).min().unwrap_or(0).saturating_sub(padding);
        let y_min = pixels.iter().map(|p| p.1).min().unwrap_or(0).saturating_sub(padding);
        let x_max = pixels.iter().map(|p| p.0).max().unwrap_or(0).saturating_add(padding);
        let y_max = pixels.iter().map(|p| p.1).max().unwrap_or(0).saturating_add(padding);

        if x_max <= x_min || y_max <= y_min {
            return Err(AnalysisError::DegenerateRegion(format!(
                "empty eye box ({x_min}, {y_min}) - ({x_max}, {y_max})"
            )));
        }

        Ok(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    /// Padded width in pixels
    pub fn width(&self) -> i64 {
        self.x_max.saturating_sub(self.x_min)
    }

    /// Padded height in pixels
    pub fn height(&self) -> i64 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Top-left corner of the crop after clamping to the image
    pub fn origin(&self) -> (u32, u32) {
        let clamp = |v: i64| v.clamp(0, u32::MAX as i64) as u32;
        (clamp(self.x_min), clamp(self.y_min))
    }

    /// Copy the region out of the frame, clamped to the image bounds
    pub fn crop(&self, frame: &RgbImage) -> Result<RgbImage, AnalysisError> {
        let (x0, y0) = self.origin();
        let x1 = self.x_max.clamp(0, frame.width() as i64) as u32;
        let y1 = self.y_max.clamp(0, frame.height() as i64) as u32;

        if x1 <= x0 || y1 <= y0 {
            return Err(AnalysisError::DegenerateRegion(
                "eye region lies outside the frame".to_string(),
            ));
        }

        Ok(imageops::crop_imm(frame, x0, y0, x1 - x0, y1 - y0).to_image())
    }
}
