//! Graduated status labels from a monotonic threshold table.
//!
//! A table is an ascending list of inclusive upper bounds. Each value maps to
//! the first band whose bound it does not exceed; values above the last
//! finite bound fall into the overflow label (or a final `+inf` band).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Daily score → how deep down the rabbit hole the day went.
const CONSPIRACY_LEVELS: &[(f64, &str)] = &[
    (5.0, "Innocent Fluff Ball"),
    (15.0, "Mildly Suspicious"),
    (25.0, "Actively Plotting"),
    (35.0, "Full Conspiracy"),
    (f64::INFINITY, "World Domination"),
];

/// Days until expiry → pantry status.
const EXPIRY_STATUS: &[(f64, &str)] = &[
    (-1.0, "Expired"),
    (3.0, "Expiring Soon"),
    (7.0, "Use This Week"),
];
const EXPIRY_OVERFLOW: &str = "Fresh";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Inclusive upper bound
    pub max: f64,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawThresholdTable {
    bands: Vec<Band>,
    #[serde(default)]
    overflow: Option<String>,
}

/// Validated threshold table. Construction fails unless the bands partition
/// the whole number line with no gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdTable")]
pub struct ThresholdTable {
    bands: Vec<Band>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overflow: Option<String>,
}

impl TryFrom<RawThresholdTable> for ThresholdTable {
    type Error = EngineError;

    fn try_from(raw: RawThresholdTable) -> Result<Self, Self::Error> {
        Self::from_bands(raw.bands, raw.overflow)
    }
}

impl ThresholdTable {
    /// Build from `(max_inclusive, label)` pairs plus an optional label for
    /// everything above the last bound.
    pub fn new<L: Into<String>>(
        bands: impl IntoIterator<Item = (f64, L)>,
        overflow: Option<L>,
    ) -> Result<Self, EngineError> {
        let bands = bands
            .into_iter()
            .map(|(max, label)| Band {
                max,
                label: label.into(),
            })
            .collect();
        Self::from_bands(bands, overflow.map(Into::into))
    }

    fn from_bands(bands: Vec<Band>, overflow: Option<String>) -> Result<Self, EngineError> {
        let Some(last) = bands.last() else {
            return Err(EngineError::InvalidThresholds(
                "table has no bands".to_string(),
            ));
        };

        let mut previous: Option<f64> = None;
        for band in &bands {
            if band.max.is_nan() || band.max == f64::NEG_INFINITY {
                return Err(EngineError::InvalidThresholds(format!(
                    "band '{}' has an unusable bound {}",
                    band.label, band.max
                )));
            }
            if let Some(prev) = previous {
                if band.max <= prev {
                    return Err(EngineError::InvalidThresholds(format!(
                        "bound {} for '{}' is not above the previous bound {}",
                        band.max, band.label, prev
                    )));
                }
            }
            previous = Some(band.max);
        }

        match (last.max.is_infinite(), overflow.is_some()) {
            (true, true) => {
                return Err(EngineError::InvalidThresholds(
                    "overflow label is unreachable after an infinite bound".to_string(),
                ))
            }
            (false, false) => {
                return Err(EngineError::InvalidThresholds(format!(
                    "values above {} have no label",
                    last.max
                )))
            }
            _ => {}
        }

        let labels = bands.iter().map(|b| b.label.as_str()).chain(overflow.as_deref());
        let mut seen = HashSet::new();
        for label in labels {
            if label.trim().is_empty() {
                return Err(EngineError::InvalidThresholds(
                    "labels must not be empty".to_string(),
                ));
            }
            if !seen.insert(label) {
                return Err(EngineError::InvalidThresholds(format!(
                    "label '{}' appears more than once",
                    label
                )));
            }
        }

        Ok(Self { bands, overflow })
    }

    /// Position of the value's label in ascending order. NaN ranks highest.
    pub fn rank(&self, value: f64) -> usize {
        self.bands
            .iter()
            .position(|band| value <= band.max)
            .unwrap_or(self.len() - 1)
    }

    /// Label for `value`. Boundary values belong to the lower band.
    pub fn classify(&self, value: f64) -> &str {
        let rank = self.rank(value);
        match self.bands.get(rank) {
            Some(band) => &band.label,
            None => self.overflow.as_deref().unwrap_or_default(),
        }
    }

    /// All labels, lowest first.
    pub fn labels(&self) -> Vec<&str> {
        self.bands
            .iter()
            .map(|b| b.label.as_str())
            .chain(self.overflow.as_deref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bands.len() + usize::from(self.overflow.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn from_static(bands: &[(f64, &str)], overflow: Option<&str>) -> ThresholdTable {
    ThresholdTable {
        bands: bands
            .iter()
            .map(|&(max, label)| Band {
                max,
                label: label.to_string(),
            })
            .collect(),
        overflow: overflow.map(str::to_string),
    }
}

/// Daily conspiracy score levels (5 / 15 / 25 / 35).
pub fn conspiracy_levels() -> ThresholdTable {
    from_static(CONSPIRACY_LEVELS, None)
}

/// Pantry expiry status keyed on days until the expiry date.
pub fn expiry_status() -> ThresholdTable {
    from_static(EXPIRY_STATUS, Some(EXPIRY_OVERFLOW))
}

/// Built-in table by name, for configs that reference presets.
pub fn preset(name: &str) -> Option<ThresholdTable> {
    match name {
        "conspiracy" => Some(conspiracy_levels()),
        "expiry" => Some(expiry_status()),
        _ => None,
    }
}
