//! Score bounds and percentage conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GradingError, GradingResult};

/// Converts a raw score into a percentage of `total_marks`.
///
/// The result is not rounded; rounding is left to whoever renders it.
///
/// # Errors
///
/// Returns [`GradingError::InvalidAssignmentConfiguration`] when `total_marks`
/// is zero, negative or not finite.
pub fn compute_percentage(score: f64, total_marks: f64) -> GradingResult<f64> {
    ensure_total_marks(total_marks)?;
    Ok((score / total_marks) * 100.0)
}

/// Clamps `raw` into `[0, total_marks]`.
///
/// NaN input clamps to 0, and a non-positive `total_marks` collapses the
/// range to `[0, 0]`.
pub fn clamp_score(raw: f64, total_marks: f64) -> f64 {
    // f64::max/min discard NaN operands, f64::clamp would panic on them
    raw.max(0.0).min(total_marks.max(0.0))
}

pub(crate) fn ensure_total_marks(total_marks: f64) -> GradingResult<()> {
    if total_marks.is_finite() && total_marks > 0.0 {
        Ok(())
    } else {
        Err(GradingError::InvalidAssignmentConfiguration { total_marks })
    }
}

/// What to do with an instructor-entered score outside `[0, total_marks]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolicy {
    /// Silently correct the score into range.
    #[default]
    Clamp,
    /// Refuse the score with [`GradingError::ScoreOutOfRange`].
    Reject,
}

impl ScorePolicy {
    /// Validates `raw` against `total_marks` and returns the score to record.
    pub fn apply(self, raw: f64, total_marks: f64) -> GradingResult<f64> {
        ensure_total_marks(total_marks)?;

        match self {
            ScorePolicy::Clamp => Ok(clamp_score(raw, total_marks)),
            ScorePolicy::Reject => {
                if (0.0..=total_marks).contains(&raw) {
                    Ok(raw)
                } else {
                    Err(GradingError::ScoreOutOfRange {
                        score: raw,
                        total_marks,
                    })
                }
            }
        }
    }
}

impl fmt::Display for ScorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorePolicy::Clamp => f.write_str("clamp"),
            ScorePolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for ScorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(ScorePolicy::Clamp),
            "reject" => Ok(ScorePolicy::Reject),
            other => Err(format!(
                "unknown score policy '{other}' (expected 'clamp' or 'reject')"
            )),
        }
    }
}
