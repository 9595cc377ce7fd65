use std::collections::BTreeMap;

use thiserror::Error;

use super::model::{Table, Value};

/// Marker appended to a non-key column whose name is already taken.
pub const COLLISION_SUFFIX: &str = "__src";

// ---------------------------------------------------------------------------
// Join result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinError {
    #[error("no common key across {inputs} input tables")]
    NoCommonKey { inputs: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinMeta {
    pub input_count: usize,
    pub output_rows: usize,
}

/// Outcome of [`perform_join`]: either the joined table or the reason it
/// could not be built, plus counts for display.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub outcome: Result<Table, JoinError>,
    pub meta: JoinMeta,
}

impl JoinResult {
    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn data(&self) -> Option<&Table> {
        self.outcome.as_ref().ok()
    }

    /// Human-readable failure text. Key failures contain `"no common key"`.
    pub fn reason(&self) -> Option<String> {
        self.outcome.as_ref().err().map(|e| e.to_string())
    }

    pub fn into_table(self) -> Result<Table, JoinError> {
        self.outcome
    }
}

// ---------------------------------------------------------------------------
// Join engine
// ---------------------------------------------------------------------------

/// Full outer join of all `tables` on every column they have in common.
///
/// * one table → returned unchanged
/// * no column shared by all tables → [`JoinError::NoCommonKey`]
/// * otherwise tables are folded left to right; rows without a partner keep
///   their own values and get `Null` elsewhere
///
/// Non-key columns that collide with an existing output column are renamed
/// with [`COLLISION_SUFFIX`] (`__src`, `__src2`, …).
///
/// Each fold step indexes the right table by key, so the cost is the number
/// of produced rows; with repeated keys on both sides that is the product of
/// the duplicate counts (O(rows₁ × rows₂) in the worst case).
///
/// # Panics
/// Panics if `tables` is empty.
pub fn perform_join(tables: &[Table]) -> JoinResult {
    assert!(!tables.is_empty(), "perform_join requires at least one table");
    let input_count = tables.len();

    if let [single] = tables {
        return JoinResult {
            meta: JoinMeta {
                input_count,
                output_rows: single.row_count(),
            },
            outcome: Ok(single.clone()),
        };
    }

    let keys = common_keys(tables);
    if keys.is_empty() {
        log::warn!("join of {input_count} tables failed: no shared column");
        return JoinResult {
            outcome: Err(JoinError::NoCommonKey {
                inputs: input_count,
            }),
            meta: JoinMeta {
                input_count,
                output_rows: 0,
            },
        };
    }

    log::debug!("joining {input_count} tables on {keys:?}");
    let mut joined = tables[0].clone();
    for right in &tables[1..] {
        joined = outer_join(&joined, right, &keys);
        log::debug!("  → {} rows after fold step", joined.row_count());
    }

    JoinResult {
        meta: JoinMeta {
            input_count,
            output_rows: joined.row_count(),
        },
        outcome: Ok(joined),
    }
}

/// Columns present in every table, in the first table's column order.
pub fn common_keys(tables: &[Table]) -> Vec<String> {
    let Some((first, rest)) = tables.split_first() else {
        return Vec::new();
    };
    first
        .columns()
        .iter()
        .filter(|col| rest.iter().all(|t| t.has_column(col)))
        .cloned()
        .collect()
}

fn key_of(row: &[Value], indices: &[usize]) -> Vec<Value> {
    indices.iter().map(|&i| row[i].clone()).collect()
}

fn unique_name(base: &str, taken: &[String]) -> String {
    let mut candidate = format!("{base}{COLLISION_SUFFIX}");
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}{COLLISION_SUFFIX}{n}");
        n += 1;
    }
    candidate
}

fn outer_join(left: &Table, right: &Table, keys: &[String]) -> Table {
    // Every key is a column of both sides, so the lookups cannot fail.
    let left_keys: Vec<usize> = keys.iter().filter_map(|k| left.column_index(k)).collect();
    let right_keys: Vec<usize> = keys.iter().filter_map(|k| right.column_index(k)).collect();

    // Right-hand columns carried into the output, renamed on collision.
    let mut columns: Vec<String> = left.columns().to_vec();
    let mut carried: Vec<usize> = Vec::new();
    for (idx, name) in right.columns().iter().enumerate() {
        if right_keys.contains(&idx) {
            continue;
        }
        let out_name = if columns.contains(name) {
            unique_name(name, &columns)
        } else {
            name.clone()
        };
        columns.push(out_name);
        carried.push(idx);
    }

    let mut index: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        index.entry(key_of(row, &right_keys)).or_default().push(i);
    }

    let mut matched = vec![false; right.row_count()];
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for lrow in left.rows() {
        match index.get(&key_of(lrow, &left_keys)) {
            Some(partners) => {
                for &r in partners {
                    matched[r] = true;
                    let rrow = &right.rows()[r];
                    let mut out = lrow.clone();
                    out.extend(carried.iter().map(|&c| rrow[c].clone()));
                    rows.push(out);
                }
            }
            None => {
                let mut out = lrow.clone();
                out.extend(std::iter::repeat(Value::Null).take(carried.len()));
                rows.push(out);
            }
        }
    }

    for (r, rrow) in right.rows().iter().enumerate() {
        if matched[r] {
            continue;
        }
        let mut out = vec![Value::Null; left.columns().len()];
        for (&li, &ri) in left_keys.iter().zip(&right_keys) {
            out[li] = rrow[ri].clone();
        }
        out.extend(carried.iter().map(|&c| rrow[c].clone()));
        rows.push(out);
    }

    Table::from_parts(columns, rows)
}
