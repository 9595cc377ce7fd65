use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common dataframe dtypes.
/// Used as a `BTreeMap` key (join index), so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date / timestamp kept as text.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so equality agrees with the total ordering of floats --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<null>"),
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// `-0.0` is stored as `0.0`.
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(if v == 0.0 { 0.0 } else { v })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Value {
    /// Text form used for matching and export.
    ///
    /// Floats keep a trailing `.0` when integral (`10.0`), `Null` is empty.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) | Value::Date(s) => Cow::Borrowed(s),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Float(v) => Cow::Owned(format!("{v:?}")),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Null => Cow::Borrowed(""),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – ordered rows sharing one column set
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("row {row} has {found} values but the table has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// An in-memory table. Every row holds exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(TableError::DuplicateColumn(col.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Table { columns, rows })
    }

    /// Build a table from per-row `(column, value)` pairs. Columns appear in
    /// order of first occurrence; a row missing a column gets `Null` there and
    /// a repeated key keeps its last value.
    pub fn from_records(records: Vec<Vec<(String, Value)>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for rec in &records {
            for (key, _) in rec {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|rec| {
                let mut row = vec![Value::Null; columns.len()];
                for (key, value) in rec {
                    if let Some(&idx) = index.get(&key) {
                        row[idx] = value;
                    }
                }
                row
            })
            .collect();

        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Sorted distinct texts of the non-null values in `column`.
    pub fn unique_text_values(&self, column: &str) -> BTreeSet<String> {
        let Some(idx) = self.column_index(column) else {
            return BTreeSet::new();
        };
        self.rows
            .iter()
            .filter(|row| !row[idx].is_null())
            .map(|row| row[idx].as_text().into_owned())
            .collect()
    }

    /// Keep the rows that pass `keep`, in their original order.
    pub(crate) fn retain_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r.as_slice())).cloned().collect(),
        }
    }

    /// Construction path for engines that already guarantee the invariants.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Table { columns, rows }
    }
}

/// Stack tables vertically. The result has the union of all columns in order
/// of first appearance; cells a source table lacks are `Null`.
pub fn concat_tables(tables: &[Table]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for t in tables {
        for col in &t.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
    for t in tables {
        let mapping: Vec<Option<usize>> = columns.iter().map(|c| t.column_index(c)).collect();
        for row in &t.rows {
            rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
                    .collect(),
            );
        }
    }

    Table { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn text_coercion() {
        assert_eq!(Value::from("abc").as_text(), "abc");
        assert_eq!(Value::Integer(42).as_text(), "42");
        assert_eq!(Value::Float(10.0).as_text(), "10.0");
        assert_eq!(Value::Float(1.5).as_text(), "1.5");
        assert_eq!(Value::Bool(true).as_text(), "true");
        assert_eq!(Value::Null.as_text(), "");
        assert_eq!(Value::Null.to_string(), "<null>");
    }

    #[test]
    fn ordering_groups_by_type() {
        let mut set = BTreeSet::new();
        set.insert(Value::from("b"));
        set.insert(Value::Integer(3));
        set.insert(Value::Null);
        set.insert(Value::from("a"));
        set.insert(Value::Integer(3));
        let ordered: Vec<Value> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![Value::Null, Value::Integer(3), Value::from("a"), Value::from("b")]
        );
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn new_rejects_bad_shapes() {
        assert_eq!(
            Table::new(cols(&["a", "a"]), vec![]),
            Err(TableError::DuplicateColumn("a".into()))
        );
        assert_eq!(
            Table::new(cols(&["a", "b"]), vec![vec![Value::Integer(1)]]),
            Err(TableError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn from_records_null_fills() {
        let r1 = vec![("id".to_string(), Value::Integer(1))];
        let r2 = vec![
            ("name".to_string(), Value::from("ann")),
            ("id".to_string(), Value::Integer(2)),
        ];

        let t = Table::from_records(vec![r1, r2]);
        assert_eq!(t.columns(), &cols(&["id", "name"])[..]);
        assert_eq!(t.value(0, "name"), Some(&Value::Null));
        assert_eq!(t.value(1, "name"), Some(&Value::from("ann")));
        assert_eq!(t.value(1, "id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn from_records_keeps_key_order() {
        let rec = vec![
            ("zeta".to_string(), Value::Integer(1)),
            ("alpha".to_string(), Value::Integer(2)),
        ];
        let t = Table::from_records(vec![rec]);
        assert_eq!(t.columns(), &cols(&["zeta", "alpha"])[..]);
    }

    #[test]
    fn negative_zero_is_normalized() {
        assert_eq!(Value::from(-0.0_f64), Value::Float(0.0));
        assert_eq!(Value::from(-0.0_f64).as_text(), "0.0");
        assert_eq!(Value::from(-1.5_f64), Value::Float(-1.5));
    }

    #[test]
    fn unique_text_values_skips_nulls() {
        let t = Table::new(
            cols(&["v"]),
            vec![
                vec![Value::from("x")],
                vec![Value::Null],
                vec![Value::from("a")],
                vec![Value::from("x")],
            ],
        )
        .unwrap();
        let vals: Vec<String> = t.unique_text_values("v").into_iter().collect();
        assert_eq!(vals, vec!["a", "x"]);
        assert!(t.unique_text_values("missing").is_empty());
    }

    #[test]
    fn concat_unions_columns() {
        let a = Table::new(cols(&["id", "a"]), vec![vec![Value::Integer(1), "x".into()]]).unwrap();
        let b = Table::new(cols(&["b", "id"]), vec![vec![true.into(), Value::Integer(2)]]).unwrap();
        let c = concat_tables(&[a, b]);
        assert_eq!(c.columns(), &cols(&["id", "a", "b"])[..]);
        assert_eq!(
            c.rows(),
            &[
                vec![Value::Integer(1), Value::from("x"), Value::Null],
                vec![Value::Integer(2), Value::Null, Value::Bool(true)],
            ][..]
        );
    }
}
