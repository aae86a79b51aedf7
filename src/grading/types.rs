//! Records consumed by the grading core and the summaries it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GradingError, GradingResult};
use crate::grading::score::ensure_total_marks;

/// Where a submission sits in its grading lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Submitted,
    Late,
    Pending,
    Graded,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Late => "late",
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Graded => "graded",
        };
        f.write_str(s)
    }
}

/// Per-question outcome recorded for quiz submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question_id: String,
    pub correct: bool,
}

/// One learner's attempt at an assignment or quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub learner_id: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<QuestionAnswer>,
}

impl Submission {
    /// Checks the record against its assignment: a graded submission carries a
    /// score, and any score lies within `[0, total_marks]`.
    pub fn validate(&self, assignment: &Assignment) -> GradingResult<()> {
        let violation = |reason: String| {
            Err(GradingError::InvariantViolation {
                id: self.id.clone(),
                reason,
            })
        };

        if self.assignment_id != assignment.id {
            return violation(format!(
                "belongs to assignment '{}', not '{}'",
                self.assignment_id, assignment.id
            ));
        }
        if self.status == SubmissionStatus::Graded && self.score.is_none() {
            return violation("graded without a score".into());
        }
        if let Some(score) = self.score {
            if !(0.0..=assignment.total_marks).contains(&score) {
                return violation(format!(
                    "score {score} outside [0, {}]",
                    assignment.total_marks
                ));
            }
        }
        Ok(())
    }

    /// Whether the answer for `question_id` was marked correct.
    pub fn answered_correctly(&self, question_id: &str) -> bool {
        self.answers
            .iter()
            .any(|a| a.question_id == question_id && a.correct)
    }
}

/// Defines the grading scale for its submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAssignment")]
pub struct Assignment {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    total_marks: f64,
    pub due_date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawAssignment {
    id: String,
    #[serde(default)]
    title: Option<String>,
    total_marks: f64,
    due_date: DateTime<Utc>,
}

impl TryFrom<RawAssignment> for Assignment {
    type Error = GradingError;

    fn try_from(raw: RawAssignment) -> Result<Self, Self::Error> {
        let mut assignment = Assignment::new(raw.id, raw.total_marks, raw.due_date)?;
        assignment.title = raw.title;
        Ok(assignment)
    }
}

impl Assignment {
    /// # Errors
    ///
    /// [`GradingError::InvalidAssignmentConfiguration`] if `total_marks` is not
    /// a positive finite number.
    pub fn new(
        id: impl Into<String>,
        total_marks: f64,
        due_date: DateTime<Utc>,
    ) -> GradingResult<Self> {
        ensure_total_marks(total_marks)?;
        Ok(Self {
            id: id.into(),
            title: None,
            total_marks,
            due_date,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn total_marks(&self) -> f64 {
        self.total_marks
    }

    /// Percentage for a score on this assignment. Infallible because the
    /// total was checked on construction.
    pub fn percentage(&self, score: f64) -> f64 {
        (score / self.total_marks) * 100.0
    }
}

/// Submission counts per status. `Submitted` is folded into `pending`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub graded: usize,
    pub pending: usize,
    pub late: usize,
}

/// Lowest and highest percentage among scored submissions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

/// Number of scored submissions that landed on a letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterCount {
    pub letter: String,
    pub count: usize,
}

/// Everything an instructor's grading screen shows for one assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradebookSummary {
    pub assignment_id: String,
    pub total_marks: f64,
    pub counts: StatusCounts,
    pub average_percentage: Option<f64>,
    pub stddev_percentage: Option<f64>,
    pub range: Option<ScoreRange>,
    pub distribution: Vec<LetterCount>,
}

/// Share of submissions answering a quiz question correctly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAccuracy {
    pub question_id: String,
    pub attempts: usize,
    pub correct: usize,
    pub accuracy_percentage: f64,
}

/// One exported gradebook line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRow {
    pub submission_id: String,
    pub learner_id: String,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub score: Option<f64>,
    pub percentage: Option<f64>,
    pub letter: Option<String>,
    pub feedback: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 23, 59, 0).unwrap()
    }

    fn submission(status: SubmissionStatus, score: Option<f64>) -> Submission {
        Submission {
            id: "s1".into(),
            assignment_id: "a1".into(),
            learner_id: "l1".into(),
            submitted_at: due(),
            score,
            feedback: None,
            status,
            answers: vec![],
        }
    }

    #[test]
    fn test_assignment_rejects_zero_total() {
        assert_eq!(
            Assignment::new("a1", 0.0, due()),
            Err(GradingError::InvalidAssignmentConfiguration { total_marks: 0.0 })
        );
    }

    #[test]
    fn test_assignment_deserialize_validates_total() {
        let json = r#"{"id":"a1","total_marks":-3,"due_date":"2025-03-01T23:59:00Z"}"#;
        assert!(serde_json::from_str::<Assignment>(json).is_err());

        let json = r#"{"id":"a1","title":"Essay","total_marks":50,"due_date":"2025-03-01T23:59:00Z"}"#;
        let a: Assignment = serde_json::from_str(json).unwrap();
        assert_eq!(a.total_marks(), 50.0);
        assert_eq!(a.title.as_deref(), Some("Essay"));
    }

    #[test]
    fn test_validate_graded_requires_score() {
        let a = Assignment::new("a1", 100.0, due()).unwrap();
        assert!(submission(SubmissionStatus::Graded, Some(70.0)).validate(&a).is_ok());
        assert!(submission(SubmissionStatus::Submitted, None).validate(&a).is_ok());
        assert!(matches!(
            submission(SubmissionStatus::Graded, None).validate(&a),
            Err(GradingError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_validate_score_bounds_and_assignment() {
        let a = Assignment::new("a1", 100.0, due()).unwrap();
        assert!(submission(SubmissionStatus::Graded, Some(101.0)).validate(&a).is_err());
        assert!(submission(SubmissionStatus::Graded, Some(-1.0)).validate(&a).is_err());

        let other = Assignment::new("a2", 100.0, due()).unwrap();
        assert!(submission(SubmissionStatus::Submitted, None).validate(&other).is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Late).unwrap(),
            "\"late\""
        );
        let s: SubmissionStatus = serde_json::from_str("\"graded\"").unwrap();
        assert_eq!(s, SubmissionStatus::Graded);
    }
}
