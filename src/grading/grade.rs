//! Percentage to letter-grade banding.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{GradingError, GradingResult};

/// A single band: any percentage `>= min_percentage` earns `letter`,
/// unless a higher band matched first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_percentage: f64,
    pub letter: String,
}

impl GradeBand {
    pub fn new(min_percentage: f64, letter: impl Into<String>) -> Self {
        Self {
            min_percentage,
            letter: letter.into(),
        }
    }
}

/// Ordered band table, highest threshold first, with a failing letter that
/// covers everything below the lowest band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBandTable")]
pub struct BandTable {
    bands: Vec<GradeBand>,
    failing: String,
}

#[derive(Deserialize)]
struct RawBandTable {
    bands: Vec<GradeBand>,
    failing: String,
}

impl TryFrom<RawBandTable> for BandTable {
    type Error = GradingError;

    fn try_from(raw: RawBandTable) -> Result<Self, Self::Error> {
        BandTable::new(raw.bands, raw.failing)
    }
}

impl BandTable {
    /// Builds a table after checking that thresholds lie in `(0, 100]`,
    /// strictly decrease, and that every letter is distinct.
    pub fn new(bands: Vec<GradeBand>, failing: impl Into<String>) -> GradingResult<Self> {
        let failing = failing.into();
        let invalid = |msg: String| Err(GradingError::InvalidBandTable(msg));

        if bands.is_empty() {
            return invalid("at least one band is required".into());
        }
        if failing.trim().is_empty() {
            return invalid("failing letter must not be empty".into());
        }

        let mut seen = HashSet::new();
        seen.insert(failing.as_str());

        let mut previous = f64::INFINITY;
        for band in &bands {
            let min = band.min_percentage;
            if !(min > 0.0 && min <= 100.0) {
                return invalid(format!(
                    "threshold {min} for '{}' must be in (0, 100]",
                    band.letter
                ));
            }
            if min >= previous {
                return invalid(format!(
                    "threshold {min} for '{}' is not below the previous band",
                    band.letter
                ));
            }
            if band.letter.trim().is_empty() {
                return invalid(format!("band at {min} has an empty letter"));
            }
            if !seen.insert(band.letter.as_str()) {
                return invalid(format!("letter '{}' appears more than once", band.letter));
            }
            previous = min;
        }

        Ok(Self { bands, failing })
    }

    /// A+ through F in eleven tiers.
    ///
    /// | Range  | Grade |
    /// |--------|-------|
    /// | >= 90  | A+    |
    /// | >= 85  | A     |
    /// | >= 80  | A-    |
    /// | >= 75  | B+    |
    /// | >= 70  | B     |
    /// | >= 65  | B-    |
    /// | >= 60  | C+    |
    /// | >= 55  | C     |
    /// | >= 50  | C-    |
    /// | >= 40  | D     |
    /// | < 40   | F     |
    pub fn eleven_tier() -> Self {
        Self::builtin(
            &[
                (90.0, "A+"),
                (85.0, "A"),
                (80.0, "A-"),
                (75.0, "B+"),
                (70.0, "B"),
                (65.0, "B-"),
                (60.0, "C+"),
                (55.0, "C"),
                (50.0, "C-"),
                (40.0, "D"),
            ],
            "F",
        )
    }

    /// A+ through F in six tiers.
    ///
    /// | Range  | Grade |
    /// |--------|-------|
    /// | >= 90  | A+    |
    /// | >= 80  | A     |
    /// | >= 70  | B     |
    /// | >= 60  | C     |
    /// | >= 50  | D     |
    /// | < 50   | F     |
    pub fn six_tier() -> Self {
        Self::builtin(
            &[
                (90.0, "A+"),
                (80.0, "A"),
                (70.0, "B"),
                (60.0, "C"),
                (50.0, "D"),
            ],
            "F",
        )
    }

    fn builtin(bands: &[(f64, &str)], failing: &str) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|&(min, letter)| GradeBand::new(min, letter))
                .collect(),
            failing: failing.to_string(),
        }
    }

    /// Loads a table from a JSON file shaped like:
    /// ```json
    /// { "bands": [{ "min_percentage": 50, "letter": "P" }], "failing": "F" }
    /// ```
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read band table '{path}'"))?;
        let table: BandTable = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse band table '{path}'"))?;
        Ok(table)
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn failing_letter(&self) -> &str {
        &self.failing
    }

    /// Letters from best to worst, failing letter last.
    pub fn letters(&self) -> impl Iterator<Item = &str> {
        self.bands
            .iter()
            .map(|b| b.letter.as_str())
            .chain(std::iter::once(self.failing.as_str()))
    }

    /// Position of `letter` from the top (0 is best). `None` if unknown.
    pub fn rank(&self, letter: &str) -> Option<usize> {
        self.letters().position(|l| l == letter)
    }
}

/// Maps a percentage to a letter, evaluating bands highest first.
///
/// Input outside `[0, 100]` is clamped; NaN gets the failing letter.
pub fn grade_for_percentage(percentage: f64, table: &BandTable) -> &str {
    if percentage.is_nan() {
        return table.failing_letter();
    }
    let p = percentage.clamp(0.0, 100.0);

    table
        .bands
        .iter()
        .find(|band| p >= band.min_percentage)
        .map(|band| band.letter.as_str())
        .unwrap_or(table.failing_letter())
}

/// Names of the built-in tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GradeScale {
    #[default]
    ElevenTier,
    SixTier,
}

impl GradeScale {
    pub fn table(self) -> BandTable {
        match self {
            GradeScale::ElevenTier => BandTable::eleven_tier(),
            GradeScale::SixTier => BandTable::six_tier(),
        }
    }
}

impl fmt::Display for GradeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeScale::ElevenTier => f.write_str("eleven-tier"),
            GradeScale::SixTier => f.write_str("six-tier"),
        }
    }
}

impl FromStr for GradeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eleven-tier" | "eleven" | "11" => Ok(GradeScale::ElevenTier),
            "six-tier" | "six" | "6" => Ok(GradeScale::SixTier),
            other => Err(format!(
                "unknown grade scale '{other}' (expected 'eleven-tier' or 'six-tier')"
            )),
        }
    }
}
