//! Interview Signals - nonverbal behavior scoring for recorded interviews
//!
//! Scores a candidate's posture, eye contact and smiling from per-frame body
//! pose and face mesh landmarks, then fuses the three session percentages into
//! one weighted score.
//!
//! ## Modules
//!
//! - **Analyzers**: [`posture`], [`eye_contact`] and [`expression`], each with
//!   its own smoothing window and running tally
//! - **Session**: [`session::InterviewSession`] drives a landmark source and
//!   the three analyzers; [`fusion`] combines their scores
//! - **Output**: [`encoder`] for JSON / text reports, [`attempts`] for
//!   multi-attempt interviews, [`overlay`] for annotated frames
//! - **Input**: [`replay`] for recorded NDJSON landmark streams

pub mod attempts;
pub mod config;
pub mod encoder;
pub mod error;
pub mod expression;
pub mod eye_contact;
pub mod fusion;
pub mod landmarks;
pub mod overlay;
pub mod posture;
pub mod replay;
pub mod session;
pub mod smoothing;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use attempts::{AttemptLedger, InterviewSummary};
pub use config::AnalyzerConfig;
pub use encoder::{ReportEncoder, ScorePayload};
pub use error::AnalysisError;
pub use expression::{ExpressionAnalyzer, ExpressionOutcome, SmileScore};
pub use eye_contact::{EyeContactAnalyzer, EyeContactScore, GazeState};
pub use fusion::{FusionInputs, FusionProfile, SessionFusion, SessionScoreReport};
pub use landmarks::{FaceMesh, Landmark, LandmarkSource, PoseLandmarks};
pub use posture::{PostureAnalyzer, PostureScore, PostureState};
pub use replay::{FrameRecord, ReplaySource};
pub use session::{FrameReport, InterviewSession};

/// Engine version embedded in all score payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for score payloads
pub const PRODUCER_NAME: &str = "interview-signals";
