//! Grading operations over injected record stores.
//!
//! [`GradingService`] loads records from its repositories, runs the pure
//! grading core on them and writes the results back.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::grading::aggregate::{gradebook_rows, question_accuracy_report, summarize};
use crate::grading::grade::{BandTable, grade_for_percentage};
use crate::grading::score::ScorePolicy;
use crate::grading::types::{
    Assignment, GradeRow, GradebookSummary, QuestionAccuracy, QuestionAnswer, Submission,
};
use crate::store::{Record, Repository};

/// Result of a grading action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeOutcome {
    pub submission: Submission,
    pub percentage: f64,
    pub letter: String,
}

/// Counts from a bulk submission import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

pub struct GradingService<A, S> {
    assignments: A,
    submissions: S,
    table: BandTable,
    policy: ScorePolicy,
}

impl<A, S> GradingService<A, S>
where
    A: Repository<Assignment>,
    S: Repository<Submission>,
{
    pub fn new(assignments: A, submissions: S, table: BandTable, policy: ScorePolicy) -> Self {
        Self {
            assignments,
            submissions,
            table,
            policy,
        }
    }

    pub fn band_table(&self) -> &BandTable {
        &self.table
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    /// Saves an assignment. Replacing an existing one is refused if any stored
    /// submission would no longer fit it, e.g. a graded score above a lowered
    /// total.
    #[tracing::instrument(skip(self, assignment), fields(assignment_id = %assignment.id))]
    pub async fn add_assignment(&self, assignment: Assignment) -> Result<()> {
        for submission in self.submissions_for(&assignment.id).await? {
            submission.validate(&assignment).with_context(|| {
                format!(
                    "assignment '{}' conflicts with stored submissions",
                    assignment.id
                )
            })?;
        }

        self.assignments.put(assignment).await?;
        info!("Assignment saved");
        Ok(())
    }

    pub async fn assignment(&self, id: &str) -> Result<Assignment> {
        require(self.assignments.get(id).await?, id)
    }

    pub async fn submission(&self, id: &str) -> Result<Submission> {
        require(self.submissions.get(id).await?, id)
    }

    /// All submissions for `assignment_id`, in store order.
    pub async fn submissions_for(&self, assignment_id: &str) -> Result<Vec<Submission>> {
        self.submissions
            .list(&|s: &Submission| s.assignment_id == assignment_id)
            .await
    }

    /// Records a new submission, marking it late if it arrives after the due date.
    #[tracing::instrument(skip(self, answers), fields(answer_count = answers.len()))]
    pub async fn submit(
        &self,
        submission_id: &str,
        assignment_id: &str,
        learner_id: &str,
        submitted_at: DateTime<Utc>,
        answers: Vec<QuestionAnswer>,
    ) -> Result<Submission> {
        let assignment = self.assignment(assignment_id).await?;

        let mut submission = Submission::new(submission_id, &assignment, learner_id, submitted_at);
        submission.answers = answers;

        if !self.submissions.insert(submission.clone()).await? {
            bail!("submission '{submission_id}' already exists");
        }
        info!(status = %submission.status, "Submission recorded");
        Ok(submission)
    }

    /// Applies an instructor's score (through the configured policy) and
    /// moves the submission to graded.
    #[tracing::instrument(skip(self, feedback))]
    pub async fn record_grade(
        &self,
        submission_id: &str,
        raw_score: f64,
        feedback: Option<String>,
    ) -> Result<GradeOutcome> {
        let mut submission = self.submission(submission_id).await?;
        let assignment = self.assignment(&submission.assignment_id).await?;

        let score = submission
            .grade(raw_score, feedback, &assignment, self.policy)
            .with_context(|| format!("failed to grade submission '{submission_id}'"))?;
        let percentage = assignment.percentage(score);
        let letter = grade_for_percentage(percentage, &self.table).to_string();

        self.submissions.put(submission.clone()).await?;
        info!(score, percentage, letter = %letter, "Grade recorded");

        Ok(GradeOutcome {
            submission,
            percentage,
            letter,
        })
    }

    /// Reverses a grade, returning the submission to submitted or late.
    #[tracing::instrument(skip(self))]
    pub async fn ungrade(&self, submission_id: &str) -> Result<Submission> {
        let mut submission = self.submission(submission_id).await?;
        let assignment = self.assignment(&submission.assignment_id).await?;

        submission.ungrade(&assignment)?;
        self.submissions.put(submission.clone()).await?;
        info!(status = %submission.status, "Grade reversed");
        Ok(submission)
    }

    #[tracing::instrument(skip(self))]
    pub async fn summary(&self, assignment_id: &str) -> Result<GradebookSummary> {
        let assignment = self.assignment(assignment_id).await?;
        let submissions = self.submissions_for(assignment_id).await?;
        Ok(summarize(&assignment, &submissions, &self.table))
    }

    #[tracing::instrument(skip(self))]
    pub async fn gradebook(&self, assignment_id: &str) -> Result<Vec<GradeRow>> {
        let assignment = self.assignment(assignment_id).await?;
        let submissions = self.submissions_for(assignment_id).await?;
        Ok(gradebook_rows(&assignment, &submissions, &self.table))
    }

    #[tracing::instrument(skip(self))]
    pub async fn quiz_accuracy(&self, assignment_id: &str) -> Result<Vec<QuestionAccuracy>> {
        // resolve the assignment so an unknown id is an error, not an empty report
        self.assignment(assignment_id).await?;
        let submissions = self.submissions_for(assignment_id).await?;
        Ok(question_accuracy_report(&submissions))
    }

    /// Stores every new submission that is consistent with its assignment.
    /// Inconsistent or orphaned records, and ids already in the store, are
    /// logged and skipped.
    #[tracing::instrument(skip_all, fields(count = submissions.len()))]
    pub async fn import_submissions(&self, submissions: Vec<Submission>) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for submission in submissions {
            let Some(assignment) = self.assignments.get(&submission.assignment_id).await? else {
                warn!(
                    submission_id = %submission.id,
                    assignment_id = %submission.assignment_id,
                    "Skipping submission for unknown assignment"
                );
                report.skipped += 1;
                continue;
            };

            if let Err(e) = submission.validate(&assignment) {
                warn!(error = %e, "Skipping inconsistent submission");
                report.skipped += 1;
                continue;
            }

            let submission_id = submission.id.clone();
            if !self.submissions.insert(submission).await? {
                warn!(%submission_id, "Skipping submission that already exists");
                report.skipped += 1;
                continue;
            }
            report.imported += 1;
        }

        info!(
            imported = report.imported,
            skipped = report.skipped,
            "Import complete"
        );
        Ok(report)
    }
}

fn require<T: Record>(record: Option<T>, id: &str) -> Result<T> {
    record.ok_or_else(|| anyhow!("{} '{id}' not found", T::KIND))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradingError;
    use crate::grading::types::SubmissionStatus;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    type Service = GradingService<MemoryStore<Assignment>, MemoryStore<Submission>>;

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 10, 17, 0, 0).unwrap()
    }

    async fn service(policy: ScorePolicy) -> Service {
        let svc = GradingService::new(
            MemoryStore::new(),
            MemoryStore::new(),
            BandTable::eleven_tier(),
            policy,
        );
        svc.add_assignment(Assignment::new("hw1", 20.0, due()).unwrap())
            .await
            .unwrap();
        svc
    }

    #[tokio::test]
    async fn test_submit_sets_initial_status() {
        let svc = service(ScorePolicy::Clamp).await;

        let on_time = svc
            .submit("s1", "hw1", "ada", due() - Duration::hours(2), vec![])
            .await
            .unwrap();
        assert_eq!(on_time.status, SubmissionStatus::Submitted);

        let late = svc
            .submit("s2", "hw1", "bob", due() + Duration::minutes(5), vec![])
            .await
            .unwrap();
        assert_eq!(late.status, SubmissionStatus::Late);
    }

    #[tokio::test]
    async fn test_submit_rejects_duplicates_and_unknown_assignment() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();

        assert!(svc.submit("s1", "hw1", "ada", due(), vec![]).await.is_err());
        let err = svc
            .submit("s9", "nope", "ada", due(), vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("assignment 'nope' not found"));
    }

    #[tokio::test]
    async fn test_concurrent_submits_with_same_id() {
        let svc = service(ScorePolicy::Clamp).await;

        let (first, second) = tokio::join!(
            svc.submit("s1", "hw1", "ada", due(), vec![]),
            svc.submit("s1", "hw1", "bob", due(), vec![]),
        );
        let accepted = [first.is_ok(), second.is_ok()];
        assert_eq!(accepted.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(svc.submissions_for("hw1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_assignment_rejects_total_below_graded_score() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();
        svc.record_grade("s1", 18.0, None).await.unwrap();

        let err = svc
            .add_assignment(Assignment::new("hw1", 10.0, due()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GradingError>(),
            Some(GradingError::InvariantViolation { id, .. }) if id == "s1"
        ));

        assert_eq!(svc.assignment("hw1").await.unwrap().total_marks(), 20.0);
        assert_eq!(svc.summary("hw1").await.unwrap().average_percentage, Some(90.0));

        // a total that still fits every stored score is accepted
        svc.add_assignment(Assignment::new("hw1", 18.0, due()).unwrap())
            .await
            .unwrap();
        assert_eq!(svc.assignment("hw1").await.unwrap().total_marks(), 18.0);
    }

    #[tokio::test]
    async fn test_record_grade_persists() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();

        let outcome = svc
            .record_grade("s1", 17.0, Some("Nice".into()))
            .await
            .unwrap();
        assert_eq!(outcome.percentage, 85.0);
        assert_eq!(outcome.letter, "A");

        let stored = svc.submission("s1").await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Graded);
        assert_eq!(stored.score, Some(17.0));
        assert_eq!(stored.feedback.as_deref(), Some("Nice"));
    }

    #[tokio::test]
    async fn test_record_grade_policy() {
        let clamp = service(ScorePolicy::Clamp).await;
        clamp.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();
        let outcome = clamp.record_grade("s1", 30.0, None).await.unwrap();
        assert_eq!(outcome.submission.score, Some(20.0));
        assert_eq!(outcome.letter, "A+");

        let reject = service(ScorePolicy::Reject).await;
        reject.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();
        assert!(reject.record_grade("s1", 30.0, None).await.is_err());
        let untouched = reject.submission("s1").await.unwrap();
        assert_eq!(untouched.status, SubmissionStatus::Submitted);
        assert_eq!(untouched.score, None);
    }

    #[tokio::test]
    async fn test_ungrade_round_trip() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due() + Duration::days(1), vec![])
            .await
            .unwrap();

        assert!(svc.ungrade("s1").await.is_err());
        svc.record_grade("s1", 10.0, None).await.unwrap();
        let reverted = svc.ungrade("s1").await.unwrap();
        assert_eq!(reverted.status, SubmissionStatus::Late);
        assert_eq!(svc.submission("s1").await.unwrap().score, None);
    }

    #[tokio::test]
    async fn test_summary_and_gradebook() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();
        svc.submit("s2", "hw1", "bob", due(), vec![]).await.unwrap();
        svc.submit("s3", "hw1", "cy", due() + Duration::days(1), vec![])
            .await
            .unwrap();
        svc.record_grade("s1", 18.0, None).await.unwrap();

        let summary = svc.summary("hw1").await.unwrap();
        assert_eq!(summary.counts.total, 3);
        assert_eq!(summary.counts.graded, 1);
        assert_eq!(summary.counts.pending, 1);
        assert_eq!(summary.counts.late, 1);
        assert_eq!(summary.average_percentage, Some(90.0));

        let rows = svc.gradebook("hw1").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].letter.as_deref(), Some("A+"));
    }

    #[tokio::test]
    async fn test_quiz_accuracy() {
        let svc = service(ScorePolicy::Clamp).await;
        let answers = |q1: bool| {
            vec![QuestionAnswer {
                question_id: "q1".into(),
                correct: q1,
            }]
        };
        svc.submit("s1", "hw1", "ada", due(), answers(true)).await.unwrap();
        svc.submit("s2", "hw1", "bob", due(), answers(false)).await.unwrap();

        let report = svc.quiz_accuracy("hw1").await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].accuracy_percentage, 50.0);
        assert!(svc.quiz_accuracy("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_import_skips_bad_records() {
        let svc = service(ScorePolicy::Clamp).await;
        let assignment = svc.assignment("hw1").await.unwrap();

        let good = Submission::new("s1", &assignment, "ada", due());
        let mut over = Submission::new("s2", &assignment, "bob", due());
        over.score = Some(25.0);
        over.status = SubmissionStatus::Graded;
        let mut orphan = Submission::new("s3", &assignment, "cy", due());
        orphan.assignment_id = "ghost".into();

        let report = svc
            .import_submissions(vec![good, over, orphan])
            .await
            .unwrap();
        assert_eq!(
            report,
            ImportReport {
                imported: 1,
                skipped: 2
            }
        );
        assert!(svc.submission("s2").await.is_err());
    }

    #[tokio::test]
    async fn test_import_does_not_overwrite_existing() {
        let svc = service(ScorePolicy::Clamp).await;
        svc.submit("s1", "hw1", "ada", due(), vec![]).await.unwrap();
        svc.record_grade("s1", 18.0, None).await.unwrap();
        let assignment = svc.assignment("hw1").await.unwrap();

        let report = svc
            .import_submissions(vec![
                Submission::new("s1", &assignment, "mallory", due()),
                Submission::new("s2", &assignment, "bob", due()),
            ])
            .await
            .unwrap();
        assert_eq!(
            report,
            ImportReport {
                imported: 1,
                skipped: 1
            }
        );

        let kept = svc.submission("s1").await.unwrap();
        assert_eq!(kept.status, SubmissionStatus::Graded);
        assert_eq!(kept.score, Some(18.0));
        assert_eq!(kept.learner_id, "ada");
    }
}
