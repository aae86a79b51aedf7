//! Decoders for submission batches handed to the `import` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::grading::types::{Submission, SubmissionStatus};

/// One CSV row. Quiz answers cannot be expressed in CSV; use JSON for those.
#[derive(Debug, Deserialize)]
struct SubmissionRow {
    id: String,
    assignment_id: String,
    learner_id: String,
    submitted_at: DateTime<Utc>,
    score: Option<f64>,
    feedback: Option<String>,
    status: SubmissionStatus,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            assignment_id: row.assignment_id,
            learner_id: row.learner_id,
            submitted_at: row.submitted_at,
            score: row.score,
            feedback: row.feedback,
            status: row.status,
            answers: Vec::new(),
        }
    }
}

/// Decodes submissions from CSV with a header row:
/// `id,assignment_id,learner_id,submitted_at,score,feedback,status`.
///
/// # Errors
///
/// Returns an error naming the first malformed record.
pub fn parse_submissions_csv(bytes: &[u8]) -> Result<Vec<Submission>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let mut submissions = Vec::new();

    for (i, result) in rdr.deserialize().enumerate() {
        let row: SubmissionRow = result.with_context(|| format!("bad submission row {}", i + 1))?;
        submissions.push(row.into());
    }

    Ok(submissions)
}

/// Decodes a JSON array of submissions, including quiz answers.
pub fn parse_submissions_json(bytes: &[u8]) -> Result<Vec<Submission>> {
    serde_json::from_slice(bytes).context("bad submission JSON")
}

/// Picks the decoder from the file extension; anything but `.json` is CSV.
pub fn parse_submissions(path: &str, bytes: &[u8]) -> Result<Vec<Submission>> {
    if path.to_ascii_lowercase().ends_with(".json") {
        parse_submissions_json(bytes)
    } else {
        parse_submissions_csv(bytes)
    }
}
