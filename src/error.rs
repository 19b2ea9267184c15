//! Error types for interview signal analysis

use thiserror::Error;

/// Errors that can occur while analyzing frames or producing reports
///
/// The detection variants (`NoPoseDetected`, `NoFaceDetected`,
/// `DegenerateRegion`, `InsufficientHistory`) are recoverable: the frame is
/// skipped or degraded and the session continues.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No pose detected in frame")]
    NoPoseDetected,

    #[error("No face detected in frame")]
    NoFaceDetected,

    #[error("Degenerate region: {0}")]
    DegenerateRegion(String),

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("Invalid landmarks: {0}")]
    InvalidLandmarks(String),

    #[error("Failed to parse record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Attempt limit of {limit} reached for question: {question}")]
    AttemptLimitReached { question: String, limit: usize },
}

impl AnalysisError {
    /// Whether the error only means "skip this frame"
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoPoseDetected
                | AnalysisError::NoFaceDetected
                | AnalysisError::DegenerateRegion(_)
                | AnalysisError::InsufficientHistory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_errors_are_recoverable() {
        assert!(AnalysisError::NoPoseDetected.is_recoverable());
        assert!(AnalysisError::NoFaceDetected.is_recoverable());
        assert!(AnalysisError::DegenerateRegion("left eye".to_string()).is_recoverable());
        assert!(AnalysisError::InsufficientHistory("empty".to_string()).is_recoverable());
        assert!(!AnalysisError::InvalidConfig("window".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::DegenerateRegion("left eye".to_string());
        assert_eq!(err.to_string(), "Degenerate region: left eye");

        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AnalysisError = json_err.into();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
