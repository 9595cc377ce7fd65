use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use crate::data::filter::{Criteria, FilterError, apply_filters, has_terms};
use crate::data::join::{JoinError, perform_join};
use crate::data::model::{Table, concat_tables};

/// Name given to the single output of a joined or concatenated run.
pub const COMBINED_OUTPUT: &str = "cleaned_data";

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Please load at least one file to continue.")]
    NoTables,
    #[error("Please select at least one field to search.")]
    NoFields,
    #[error("Please provide keywords to include or exclude.")]
    NoKeywords,
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error("{source_name}: {error}")]
    Filter {
        source_name: String,
        error: FilterError,
    },
}

/// How several inputs become output tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineMode {
    /// Outer-join all inputs on their shared columns, then filter.
    #[default]
    Join,
    /// Filter each input on its own.
    Separate,
    /// Filter each input, then stack the results.
    Concat,
}

/// A loaded table with the name it is reported and exported under.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub name: String,
    pub table: Table,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        SourceTable {
            name: name.into(),
            table,
        }
    }

    /// Name after the file stem: `dir/first.csv` → `first`.
    pub fn from_path(path: &Path, table: Table) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        SourceTable { name, table }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One cleansing session: inputs, current criteria and their undo history.
/// Independent of how it is driven (CLI, UI, tests).
#[derive(Debug, Default)]
pub struct Session {
    /// Loaded inputs, in load order.
    pub tables: Vec<SourceTable>,

    pub mode: CombineMode,

    /// Criteria currently in effect.
    criteria: Criteria,

    /// Earlier criteria, most recent last.
    history: Vec<Criteria>,
}

impl Session {
    pub fn new(mode: CombineMode) -> Self {
        Session {
            mode,
            ..Default::default()
        }
    }

    pub fn add_table(&mut self, source: SourceTable) {
        log::debug!(
            "session: added '{}' ({} rows)",
            source.name,
            source.table.row_count()
        );
        self.tables.push(source);
    }

    /// Sorted union of column names over all inputs.
    pub fn all_columns(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|s| s.table.columns().iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct non-null texts of `field` over all inputs, i.e. the
    /// choices offered for exact matching.
    pub fn unique_values(&self, field: &str) -> BTreeSet<String> {
        self.tables
            .iter()
            .flat_map(|s| s.table.unique_text_values(field))
            .collect()
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Replace the criteria. The previous criteria are pushed onto the undo
    /// history only when something actually changed.
    pub fn set_criteria(&mut self, criteria: Criteria) -> bool {
        if criteria == self.criteria {
            return false;
        }
        let previous = std::mem::replace(&mut self.criteria, criteria);
        self.history.push(previous);
        true
    }

    /// Restore the previous criteria. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.criteria = previous;
                true
            }
            None => false,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Combine and filter the inputs according to `mode` and the current
    /// criteria.
    pub fn run(&self) -> Result<Vec<SourceTable>, SessionError> {
        if self.tables.is_empty() {
            return Err(SessionError::NoTables);
        }
        if self.criteria.is_empty() {
            return Err(SessionError::NoFields);
        }
        if !has_terms(&self.criteria) {
            return Err(SessionError::NoKeywords);
        }

        let filter = |source: &SourceTable| {
            apply_filters(&source.table, &self.criteria).map_err(|error| SessionError::Filter {
                source_name: source.name.clone(),
                error,
            })
        };

        let outputs = match self.mode {
            CombineMode::Join => {
                let inputs: Vec<Table> = self.tables.iter().map(|s| s.table.clone()).collect();
                let result = perform_join(&inputs);
                log::info!(
                    "joined {} inputs into {} rows",
                    result.meta.input_count,
                    result.meta.output_rows
                );
                let joined = SourceTable::new(COMBINED_OUTPUT, result.into_table()?);
                vec![SourceTable::new(COMBINED_OUTPUT, filter(&joined)?)]
            }
            CombineMode::Separate => self
                .tables
                .iter()
                .map(|s| -> Result<SourceTable, SessionError> {
                    Ok(SourceTable::new(format!("{}-edited", s.name), filter(s)?))
                })
                .collect::<Result<Vec<_>, _>>()?,
            CombineMode::Concat => {
                let filtered = self
                    .tables
                    .iter()
                    .map(filter)
                    .collect::<Result<Vec<_>, _>>()?;
                vec![SourceTable::new(COMBINED_OUTPUT, concat_tables(&filtered))]
            }
        };

        for out in &outputs {
            log::info!("{}: {} rows after filtering", out.name, out.table.row_count());
        }
        Ok(outputs)
    }
}
