//! Status counts, score statistics and per-question accuracy over a set of submissions.

use crate::grading::grade::{BandTable, grade_for_percentage};
use crate::grading::types::{
    Assignment, GradeRow, GradebookSummary, LetterCount, QuestionAccuracy, ScoreRange,
    StatusCounts, Submission, SubmissionStatus,
};
use crate::grading::utility::{mean, stddev};
use std::collections::BTreeSet;

/// Counts submissions per status. `total` always equals `submissions.len()`.
pub fn count_by_status(submissions: &[Submission]) -> StatusCounts {
    let mut counts = StatusCounts {
        total: submissions.len(),
        ..Default::default()
    };

    for s in submissions {
        match s.status {
            SubmissionStatus::Graded => counts.graded += 1,
            SubmissionStatus::Late => counts.late += 1,
            SubmissionStatus::Submitted | SubmissionStatus::Pending => counts.pending += 1,
        }
    }

    counts
}

fn scored_percentages(submissions: &[Submission], assignment: &Assignment) -> Vec<f64> {
    submissions
        .iter()
        .filter_map(|s| s.score)
        .map(|score| assignment.percentage(score))
        .collect()
}

/// Mean percentage over submissions that carry a score.
///
/// Returns `None` when nothing is scored; an empty class is not a 0% class.
pub fn average_score(submissions: &[Submission], assignment: &Assignment) -> Option<f64> {
    mean(&scored_percentages(submissions, assignment))
}

/// Lowest and highest scored percentage, `None` when nothing is scored.
pub fn score_range(submissions: &[Submission], assignment: &Assignment) -> Option<ScoreRange> {
    scored_percentages(submissions, assignment)
        .into_iter()
        .fold(None, |range, p| match range {
            None => Some(ScoreRange { min: p, max: p }),
            Some(r) => Some(ScoreRange {
                min: r.min.min(p),
                max: r.max.max(p),
            }),
        })
}

/// Percentage of `submissions` that answered `question_id` correctly.
///
/// Submissions without an answer for the question count as incorrect.
/// An empty set yields `0.0`.
pub fn accuracy_by_question(submissions: &[Submission], question_id: &str) -> f64 {
    if submissions.is_empty() {
        return 0.0;
    }
    let correct = submissions
        .iter()
        .filter(|s| s.answered_correctly(question_id))
        .count();

    (correct as f64 / submissions.len() as f64) * 100.0
}

/// Accuracy for every question that appears in any submission, ordered by
/// question id. `attempts` is the size of the submission set.
pub fn question_accuracy_report(submissions: &[Submission]) -> Vec<QuestionAccuracy> {
    let question_ids: BTreeSet<&str> = submissions
        .iter()
        .flat_map(|s| s.answers.iter().map(|a| a.question_id.as_str()))
        .collect();

    question_ids
        .into_iter()
        .map(|question_id| {
            let correct = submissions
                .iter()
                .filter(|s| s.answered_correctly(question_id))
                .count();
            QuestionAccuracy {
                question_id: question_id.to_string(),
                attempts: submissions.len(),
                correct,
                accuracy_percentage: (correct as f64 / submissions.len() as f64) * 100.0,
            }
        })
        .collect()
}

/// Builds the full summary for one assignment.
///
/// The letter distribution lists every letter of `table` in band order,
/// including letters nobody earned.
pub fn summarize(
    assignment: &Assignment,
    submissions: &[Submission],
    table: &BandTable,
) -> GradebookSummary {
    let percentages = scored_percentages(submissions, assignment);
    let average = mean(&percentages);
    let sd = average.and_then(|avg| stddev(&percentages, avg));

    let mut distribution: Vec<LetterCount> = table
        .letters()
        .map(|letter| LetterCount {
            letter: letter.to_string(),
            count: 0,
        })
        .collect();

    for p in &percentages {
        let letter = grade_for_percentage(*p, table);
        if let Some(slot) = distribution.iter_mut().find(|c| c.letter == letter) {
            slot.count += 1;
        }
    }

    GradebookSummary {
        assignment_id: assignment.id.clone(),
        total_marks: assignment.total_marks(),
        counts: count_by_status(submissions),
        average_percentage: average,
        stddev_percentage: sd,
        range: score_range(submissions, assignment),
        distribution,
    }
}

/// One exportable row per submission, in input order.
pub fn gradebook_rows(
    assignment: &Assignment,
    submissions: &[Submission],
    table: &BandTable,
) -> Vec<GradeRow> {
    submissions
        .iter()
        .map(|s| {
            let percentage = s.score.map(|score| assignment.percentage(score));
            GradeRow {
                submission_id: s.id.clone(),
                learner_id: s.learner_id.clone(),
                submitted_at: s.submitted_at,
                status: s.status,
                score: s.score,
                percentage,
                letter: percentage.map(|p| grade_for_percentage(p, table).to_string()),
                feedback: s.feedback.clone(),
            }
        })
        .collect()
}
