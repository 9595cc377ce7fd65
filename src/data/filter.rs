use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::Table;
use super::similarity::partial_ratio;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("fuzzy threshold {0} is outside 0..=100")]
    InvalidThreshold(u8),
    #[error("filter field '{column}' is not a column of the table")]
    MissingColumn { column: String },
}

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Minimum fuzzy score (0–100) for a term to count as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Threshold(u8);

impl Threshold {
    /// Default offered to users; criteria always carry an explicit value.
    pub const DEFAULT: Threshold = Threshold(80);

    pub fn new(value: u8) -> Result<Self, FilterError> {
        if value > 100 {
            return Err(FilterError::InvalidThreshold(value));
        }
        Ok(Threshold(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether a similarity score reaches this threshold.
    pub fn admits(self, score: f64) -> bool {
        score >= f64::from(self.0)
    }
}

impl TryFrom<u8> for Threshold {
    type Error = FilterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Threshold::new(value)
    }
}

impl From<Threshold> for u8 {
    fn from(t: Threshold) -> u8 {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Filter criterion: include / exclude terms for one field
// ---------------------------------------------------------------------------

/// Include/exclude terms for a single field. Empty term lists impose no
/// constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriterion {
    pub include_exact: BTreeSet<String>,
    pub include_fuzzy: Vec<String>,
    pub exclude_exact: BTreeSet<String>,
    pub exclude_fuzzy: Vec<String>,
    pub threshold: Threshold,
}

impl FilterCriterion {
    pub fn new(threshold: Threshold) -> Self {
        FilterCriterion {
            include_exact: BTreeSet::new(),
            include_fuzzy: Vec::new(),
            exclude_exact: BTreeSet::new(),
            exclude_fuzzy: Vec::new(),
            threshold,
        }
    }

    pub fn include_exact<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_exact.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn include_fuzzy<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fuzzy.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn exclude_exact<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_exact.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn exclude_fuzzy<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_fuzzy.extend(terms.into_iter().map(Into::into));
        self
    }

    /// True when no term of any kind is set.
    pub fn is_empty(&self) -> bool {
        self.include_exact.is_empty()
            && self.include_fuzzy.is_empty()
            && self.exclude_exact.is_empty()
            && self.exclude_fuzzy.is_empty()
    }

    /// Whether a cell with text `value` passes this criterion.
    ///
    /// Checks run in a fixed order, each only when its terms are non-empty:
    /// exact include, fuzzy include, exact exclude, fuzzy exclude.
    pub fn matches(&self, value: &str) -> bool {
        if !self.include_exact.is_empty() && !self.include_exact.contains(value) {
            return false;
        }
        if !self.include_fuzzy.is_empty()
            && !self
                .include_fuzzy
                .iter()
                .any(|term| self.threshold.admits(partial_ratio(term, value)))
        {
            return false;
        }
        if self.exclude_exact.contains(value) {
            return false;
        }
        // Dropped when close enough to any exclude term.
        !self
            .exclude_fuzzy
            .iter()
            .any(|term| self.threshold.admits(partial_ratio(term, value)))
    }
}

/// Criteria per field name.
pub type Criteria = BTreeMap<String, FilterCriterion>;

/// Whether any field carries at least one term.
pub fn has_terms(criteria: &Criteria) -> bool {
    criteria.values().any(|c| !c.is_empty())
}

/// Split user-typed text on commas, trimming and dropping blank terms.
pub fn parse_terms(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Return the rows of `table` that pass every field's criterion, in their
/// original order.
///
/// A row passes when, for each field with a non-empty criterion, the text of
/// its cell in that column satisfies [`FilterCriterion::matches`]. Fields with
/// empty criteria are ignored; a field with terms that is not a column of
/// `table` is an error.
pub fn apply_filters(table: &Table, criteria: &Criteria) -> Result<Table, FilterError> {
    let active: Vec<(usize, &FilterCriterion)> = criteria
        .iter()
        .filter(|(_, c)| !c.is_empty())
        .map(|(field, c)| {
            table
                .column_index(field)
                .map(|idx| (idx, c))
                .ok_or_else(|| FilterError::MissingColumn {
                    column: field.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    if active.is_empty() {
        return Ok(table.clone());
    }

    let filtered = table.retain_rows(|row| {
        active
            .iter()
            .all(|(idx, criterion)| criterion.matches(&row[*idx].as_text()))
    });

    log::debug!(
        "filters on {} field(s) kept {} of {} rows",
        active.len(),
        filtered.row_count(),
        table.row_count()
    );
    Ok(filtered)
}
