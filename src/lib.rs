//! Join tabular files on their shared columns and keep the rows that match
//! per-field include/exclude keywords, exactly or fuzzily.

pub mod config;
pub mod data;
pub mod state;

pub use data::filter::{Criteria, FilterCriterion, Threshold, apply_filters};
pub use data::join::{JoinResult, perform_join};
pub use data::model::{Table, Value};
pub use state::{CombineMode, Session, SourceTable};
