//! Submission lifecycle: initial status on submit, grading and ungrading.
//!
//! ```text
//! submitted ─┐
//! late ──────┼── grade ──▶ graded ── ungrade ──▶ submitted | late
//! pending ───┘
//! ```

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{GradingError, GradingResult};
use crate::grading::score::ScorePolicy;
use crate::grading::types::{Assignment, Submission, SubmissionStatus};

impl SubmissionStatus {
    /// Status assigned when a learner hands in work. Anything strictly after
    /// the due date is late.
    pub fn on_submit(submitted_at: DateTime<Utc>, due_date: DateTime<Utc>) -> Self {
        if submitted_at > due_date {
            SubmissionStatus::Late
        } else {
            SubmissionStatus::Submitted
        }
    }

    pub fn is_graded(self) -> bool {
        self == SubmissionStatus::Graded
    }
}

impl Submission {
    /// Creates a fresh, ungraded submission.
    pub fn new(
        id: impl Into<String>,
        assignment: &Assignment,
        learner_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            assignment_id: assignment.id.clone(),
            learner_id: learner_id.into(),
            submitted_at,
            score: None,
            feedback: None,
            status: SubmissionStatus::on_submit(submitted_at, assignment.due_date),
            answers: Vec::new(),
        }
    }

    /// Records an instructor's grade.
    ///
    /// `raw_score` passes through `policy` first. Regrading an already graded
    /// submission replaces its score; `feedback` of `None` keeps any earlier
    /// feedback.
    pub fn grade(
        &mut self,
        raw_score: f64,
        feedback: Option<String>,
        assignment: &Assignment,
        policy: ScorePolicy,
    ) -> GradingResult<f64> {
        if self.assignment_id != assignment.id {
            return Err(GradingError::InvariantViolation {
                id: self.id.clone(),
                reason: format!("cannot be graded against assignment '{}'", assignment.id),
            });
        }

        let score = policy.apply(raw_score, assignment.total_marks())?;
        if score != raw_score {
            debug!(
                submission_id = %self.id,
                raw_score,
                score,
                "Score clamped into range"
            );
        }

        self.score = Some(score);
        if feedback.is_some() {
            self.feedback = feedback;
        }
        self.status = SubmissionStatus::Graded;
        Ok(score)
    }

    /// Reverses a grade. The submission returns to the status it would have
    /// had on submission and loses its score; feedback is kept.
    pub fn ungrade(&mut self, assignment: &Assignment) -> GradingResult<()> {
        if !self.status.is_graded() {
            return Err(GradingError::NotGraded {
                id: self.id.clone(),
            });
        }

        self.score = None;
        self.status = SubmissionStatus::on_submit(self.submitted_at, assignment.due_date);
        Ok(())
    }
}
