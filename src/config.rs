//! Runtime settings read from the environment (after `.env` is loaded).
//!
//! | Variable           | Default       | Meaning                                   |
//! |--------------------|---------------|-------------------------------------------|
//! | `LMS_DATA_DIR`     | `data`        | Directory holding the JSON record stores  |
//! | `GRADE_SCALE`      | `eleven-tier` | Built-in band table (`six-tier` also)     |
//! | `GRADE_BANDS_PATH` | unset         | JSON band table, overrides `GRADE_SCALE`  |
//! | `SCORE_POLICY`     | `clamp`       | Out-of-range scores: `clamp` or `reject`  |

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use tracing::debug;

use crate::grading::grade::{BandTable, GradeScale};
use crate::grading::score::ScorePolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub scale: GradeScale,
    pub bands_path: Option<String>,
    pub policy: ScorePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            scale: GradeScale::default(),
            bands_path: None,
            policy: ScorePolicy::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Settings::default();

        if let Some(dir) = get("LMS_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(scale) = get("GRADE_SCALE") {
            settings.scale = scale.parse().map_err(|e| anyhow!("GRADE_SCALE: {e}"))?;
        }
        settings.bands_path = get("GRADE_BANDS_PATH");
        if let Some(policy) = get("SCORE_POLICY") {
            settings.policy = policy.parse().map_err(|e| anyhow!("SCORE_POLICY: {e}"))?;
        }

        debug!(?settings, "Settings loaded");
        Ok(settings)
    }

    /// The band table in effect: a configured file wins over the named scale.
    pub fn band_table(&self) -> Result<BandTable> {
        match &self.bands_path {
            Some(path) => BandTable::load(path),
            None => Ok(self.scale.table()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.band_table().unwrap(), BandTable::eleven_tier());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("LMS_DATA_DIR", "/tmp/lms"),
            ("GRADE_SCALE", "six-tier"),
            ("SCORE_POLICY", "reject"),
            ("GRADE_BANDS_PATH", "  "),
        ]))
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/tmp/lms"));
        assert_eq!(settings.scale, GradeScale::SixTier);
        assert_eq!(settings.policy, ScorePolicy::Reject);
        assert_eq!(settings.bands_path, None);
    }

    #[test]
    fn test_bad_values() {
        assert!(Settings::from_lookup(lookup(&[("GRADE_SCALE", "twelve")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("SCORE_POLICY", "round")])).is_err());
    }

    #[test]
    fn test_band_file_wins() {
        let path = format!("{}/lms_grading_bands.json", env::temp_dir().display());
        fs::write(
            &path,
            r#"{"bands":[{"min_percentage":50,"letter":"Pass"}],"failing":"Fail"}"#,
        )
        .unwrap();

        let settings = Settings {
            bands_path: Some(path.clone()),
            ..Default::default()
        };
        let table = settings.band_table().unwrap();
        assert_eq!(table.failing_letter(), "Fail");

        fs::remove_file(&path).unwrap();
    }
}
