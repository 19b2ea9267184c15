//! Attempt ledger
//!
//! An interview is a list of questions and each question may be answered
//! several times. The ledger keeps every attempt's session report, tracks the
//! best attempt per question and averages the best attempts into an overall
//! interview summary.

use crate::error::AnalysisError;
use crate::fusion::SessionScoreReport;
use crate::smoothing::round_to;
use serde::{Deserialize, Serialize};

/// Default number of attempts allowed per question
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Attempts recorded for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAttempts {
    pub question: String,
    pub attempts: Vec<SessionScoreReport>,
    /// Index into `attempts` of the highest overall score
    best: Option<usize>,
}

impl QuestionAttempts {
    fn new(question: String) -> Self {
        Self {
            question,
            attempts: Vec::new(),
            best: None,
        }
    }

    pub fn best(&self) -> Option<&SessionScoreReport> {
        self.best.and_then(|i| self.attempts.get(i))
    }

    /// 1-based number of the best attempt
    pub fn best_attempt_number(&self) -> Option<usize> {
        self.best.map(|i| i + 1)
    }
}

/// Interview-level averages over the best attempt of every question
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub questions: usize,
    pub overall_score: f64,
    pub posture_score: f64,
    pub eye_contact_score: f64,
    pub smile_percentage: f64,
    /// Questions without the metric contribute 0
    pub answer_quality_score: f64,
    /// Questions without the metric contribute 0
    pub sentiment_score: f64,
}

/// Ledger of attempts across an interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptLedger {
    questions: Vec<QuestionAttempts>,
    max_attempts: usize,
}

impl Default for AttemptLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl AttemptLedger {
    /// Create a ledger allowing `max_attempts` per question (minimum 1)
    pub fn new(max_attempts: usize) -> Self {
        Self {
            questions: Vec::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Record an attempt and return its 1-based attempt number.
    ///
    /// The best attempt only changes on a strictly higher overall score.
    pub fn record(
        &mut self,
        question: &str,
        report: SessionScoreReport,
    ) -> Result<usize, AnalysisError> {
        let max_attempts = self.max_attempts;
        let entry = match self.questions.iter().position(|q| q.question == question) {
            Some(i) => &mut self.questions[i],
            None => {
                self.questions.push(QuestionAttempts::new(question.to_string()));
                let last = self.questions.len() - 1;
                &mut self.questions[last]
            }
        };

        if entry.attempts.len() >= max_attempts {
            return Err(AnalysisError::AttemptLimitReached {
                question: question.to_string(),
                limit: max_attempts,
            });
        }

        let is_best = entry
            .best()
            .map_or(true, |best| report.overall_score > best.overall_score);
        entry.attempts.push(report);
        let number = entry.attempts.len();
        if is_best {
            entry.best = Some(number - 1);
        }

        log::debug!("Recorded attempt {number} for question {question:?} (best: {is_best})");
        Ok(number)
    }

    /// Attempts still available for a question
    pub fn remaining_attempts(&self, question: &str) -> usize {
        let used = self.question(question).map_or(0, |q| q.attempts.len());
        self.max_attempts.saturating_sub(used)
    }

    pub fn question(&self, question: &str) -> Option<&QuestionAttempts> {
        self.questions.iter().find(|q| q.question == question)
    }

    pub fn questions(&self) -> &[QuestionAttempts] {
        &self.questions
    }

    /// Averages over best attempts, rounded to 1 decimal; zeros when empty
    pub fn summary(&self) -> InterviewSummary {
        let best: Vec<&SessionScoreReport> =
            self.questions.iter().filter_map(|q| q.best()).collect();
        if best.is_empty() {
            return InterviewSummary::default();
        }

        let n = best.len() as f64;
        let mean = |f: fn(&SessionScoreReport) -> f64| -> f64 {
            round_to(best.iter().map(|r| f(r)).sum::<f64>() / n, 1)
        };

        InterviewSummary {
            questions: best.len(),
            overall_score: mean(|r| r.overall_score),
            posture_score: mean(|r| r.posture_score),
            eye_contact_score: mean(|r| r.eye_contact_score),
            smile_percentage: mean(|r| r.smile_percentage),
            answer_quality_score: mean(|r| r.answer_quality_score.unwrap_or(0.0)),
            sentiment_score: mean(|r| r.sentiment_score.unwrap_or(0.0)),
        }
    }

    /// Load a ledger from JSON
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the ledger to JSON
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{FusionInputs, SessionFusion};
    use pretty_assertions::assert_eq;

    fn make_report(posture: f64, smile: f64, eye: f64) -> SessionScoreReport {
        SessionFusion::new().fuse(&FusionInputs::video(posture, smile, eye))
    }

    #[test]
    fn test_best_attempt_tracking() {
        let mut ledger = AttemptLedger::default();
        assert_eq!(ledger.record("q1", make_report(50.0, 50.0, 50.0)).unwrap(), 1);
        assert_eq!(ledger.record("q1", make_report(80.0, 60.0, 70.0)).unwrap(), 2);
        assert_eq!(ledger.record("q1", make_report(60.0, 60.0, 60.0)).unwrap(), 3);

        let q1 = ledger.question("q1").unwrap();
        assert_eq!(q1.attempts.len(), 3);
        assert_eq!(q1.best_attempt_number(), Some(2));
        assert_eq!(q1.best().unwrap().overall_score, 71.0);
    }

    #[test]
    fn test_tie_keeps_first_attempt() {
        let mut ledger = AttemptLedger::default();
        ledger.record("q1", make_report(70.0, 70.0, 70.0)).unwrap();
        ledger.record("q1", make_report(70.0, 70.0, 70.0)).unwrap();
        assert_eq!(ledger.question("q1").unwrap().best_attempt_number(), Some(1));
    }

    #[test]
    fn test_attempt_limit() {
        let mut ledger = AttemptLedger::new(2);
        ledger.record("q1", make_report(10.0, 10.0, 10.0)).unwrap();
        assert_eq!(ledger.remaining_attempts("q1"), 1);
        ledger.record("q1", make_report(20.0, 20.0, 20.0)).unwrap();
        assert_eq!(ledger.remaining_attempts("q1"), 0);

        let result = ledger.record("q1", make_report(30.0, 30.0, 30.0));
        assert!(matches!(
            result,
            Err(AnalysisError::AttemptLimitReached { limit: 2, .. })
        ));
        assert_eq!(ledger.remaining_attempts("q2"), 2);
    }

    #[test]
    fn test_summary_averages_best_attempts() {
        let mut ledger = AttemptLedger::default();
        ledger.record("q1", make_report(40.0, 40.0, 40.0)).unwrap();
        ledger.record("q1", make_report(80.0, 60.0, 70.0)).unwrap();
        ledger.record("q2", make_report(60.0, 20.0, 30.0)).unwrap();

        let summary = ledger.summary();
        assert_eq!(summary.questions, 2);
        // q1 best 71.0, q2 = 24 + 6 + 9 = 39.0
        assert_eq!(summary.overall_score, 55.0);
        assert_eq!(summary.posture_score, 70.0);
        assert_eq!(summary.smile_percentage, 40.0);
        assert_eq!(summary.eye_contact_score, 50.0);
        assert_eq!(summary.answer_quality_score, 0.0);
    }

    #[test]
    fn test_empty_summary() {
        let ledger = AttemptLedger::default();
        assert_eq!(ledger.summary(), InterviewSummary::default());
    }

    #[test]
    fn test_serialization() {
        let mut ledger = AttemptLedger::default();
        ledger.record("Tell me about yourself", make_report(80.0, 60.0, 70.0)).unwrap();

        let json = ledger.to_json().unwrap();
        let loaded = AttemptLedger::from_json(&json).unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.summary().overall_score, 71.0);
    }
}
