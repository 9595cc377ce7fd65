//! Filter criteria supplied from outside: a JSON criteria file and
//! `FIELD=TERMS` command-line specs.
//!
//! ```json
//! {
//!   "threshold": 80,
//!   "fields": {
//!     "name": { "include_fuzzy": ["jon"], "threshold": 90 },
//!     "city": { "exclude_exact": ["Paris"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::filter::{Criteria, FilterCriterion, Threshold, parse_terms};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading criteria file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("criteria file parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected FIELD=TERMS, got '{0}'")]
    BadFieldSpec(String),
}

/// Terms for one field as written in a criteria file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldTerms {
    #[serde(default)]
    pub include_exact: Vec<String>,
    #[serde(default)]
    pub include_fuzzy: Vec<String>,
    #[serde(default)]
    pub exclude_exact: Vec<String>,
    #[serde(default)]
    pub exclude_fuzzy: Vec<String>,
    /// Overrides the file-level threshold for this field.
    #[serde(default)]
    pub threshold: Option<Threshold>,
}

/// Top-level criteria file. The threshold is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaFile {
    pub threshold: Threshold,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldTerms>,
}

impl CriteriaFile {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn into_criteria(self) -> Criteria {
        let default = self.threshold;
        self.fields
            .into_iter()
            .map(|(field, terms)| {
                let criterion = FilterCriterion::new(terms.threshold.unwrap_or(default))
                    .include_exact(terms.include_exact)
                    .include_fuzzy(terms.include_fuzzy)
                    .exclude_exact(terms.exclude_exact)
                    .exclude_fuzzy(terms.exclude_fuzzy);
                (field, criterion)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Command-line specs
// ---------------------------------------------------------------------------

/// Which term list a `FIELD=TERMS` spec feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    IncludeExact,
    IncludeFuzzy,
    ExcludeExact,
    ExcludeFuzzy,
}

/// Split `"name=jon, jane"` into the field and its comma-separated terms.
pub fn parse_field_spec(spec: &str) -> Result<(String, Vec<String>), ConfigError> {
    let (field, terms) = spec
        .split_once('=')
        .ok_or_else(|| ConfigError::BadFieldSpec(spec.to_string()))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(ConfigError::BadFieldSpec(spec.to_string()));
    }
    Ok((field.to_string(), parse_terms(terms)))
}

/// Add the terms of one `FIELD=TERMS` spec to `criteria`. A field seen for
/// the first time gets `threshold`; an existing field keeps its own.
pub fn add_field_spec(
    criteria: &mut Criteria,
    kind: TermKind,
    spec: &str,
    threshold: Threshold,
) -> Result<(), ConfigError> {
    let (field, terms) = parse_field_spec(spec)?;
    let entry = criteria
        .entry(field)
        .or_insert_with(|| FilterCriterion::new(threshold));
    match kind {
        TermKind::IncludeExact => entry.include_exact.extend(terms),
        TermKind::IncludeFuzzy => entry.include_fuzzy.extend(terms),
        TermKind::ExcludeExact => entry.exclude_exact.extend(terms),
        TermKind::ExcludeFuzzy => entry.exclude_fuzzy.extend(terms),
    }
    Ok(())
}
