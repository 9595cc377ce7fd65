use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Number, Value as JsonValue};

use super::model::{Table, Value};

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// Download name for a source filtered on its own: `first.csv` → `first-edited.csv`.
pub fn edited_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    format!("{stem}-edited.csv")
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write `table` to `path`, choosing the format from the extension
/// (`csv`, `json`, `parquet`/`pq`).
pub fn save_table(table: &Table, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let file = || -> Result<BufWriter<File>> {
        let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(BufWriter::new(f))
    };

    match ext.as_str() {
        "csv" => write_csv(table, file()?),
        "json" => write_json(table, file()?),
        "parquet" | "pq" => write_parquet(table, file()?),
        other => bail!("Unsupported output extension: .{other}"),
    }
    .with_context(|| format!("writing {}", path.display()))?;

    log::info!("Wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}

pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns())
        .context("writing CSV header")?;
    for (i, row) in table.rows().iter().enumerate() {
        out.write_record(row.iter().map(|v| v.as_text().into_owned()))
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    out.flush().context("flushing CSV")?;
    Ok(())
}

/// Records-oriented JSON, the shape the JSON loader reads back.
pub fn write_json<W: Write>(table: &Table, writer: W) -> Result<()> {
    let records: Vec<Map<String, JsonValue>> = table
        .rows()
        .iter()
        .map(|row| {
            table
                .columns()
                .iter()
                .zip(row)
                .map(|(col, v)| (col.clone(), value_to_json(v)))
                .collect()
        })
        .collect();
    serde_json::to_writer_pretty(writer, &records).context("serializing JSON")?;
    Ok(())
}

pub fn write_parquet<W: Write + Send>(table: &Table, writer: W) -> Result<()> {
    let batch = to_record_batch(table)?;
    let mut out =
        ArrowWriter::try_new(writer, batch.schema(), None).context("creating parquet writer")?;
    out.write(&batch).context("writing parquet batch")?;
    out.close().context("closing parquet writer")?;
    Ok(())
}

/// Render the first `limit` rows as an ASCII grid.
pub fn preview(table: &Table, limit: usize) -> Result<String> {
    let batch = to_record_batch(table)?;
    let shown = batch.slice(0, limit.min(batch.num_rows()));
    Ok(pretty_format_batches(&[shown])
        .context("formatting preview")?
        .to_string())
}

fn value_to_json(v: &Value) -> JsonValue {
    match v {
        Value::String(s) | Value::Date(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => JsonValue::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Null => JsonValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Arrow conversion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

/// Narrowest Arrow type holding every non-null value; ints widen to floats,
/// anything else mixed falls back to text.
fn infer_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for v in values {
        let k = match v {
            Value::Null => continue,
            Value::Integer(_) => ColumnKind::Int,
            Value::Float(_) => ColumnKind::Float,
            Value::Bool(_) => ColumnKind::Bool,
            Value::String(_) | Value::Date(_) => ColumnKind::Text,
        };
        kind = Some(match (kind, k) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Int), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Int) => ColumnKind::Float,
            _ => return ColumnKind::Text,
        });
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for (idx, name) in table.columns().iter().enumerate() {
        let cells = move || table.rows().iter().map(move |row| &row[idx]);
        let (data_type, array): (DataType, ArrayRef) = match infer_kind(cells()) {
            ColumnKind::Int => (
                DataType::Int64,
                Arc::new(Int64Array::from(
                    cells()
                        .map(|v| match v {
                            Value::Integer(i) => Some(*i),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
            ),
            ColumnKind::Float => (
                DataType::Float64,
                Arc::new(Float64Array::from(
                    cells()
                        .map(|v| match v {
                            Value::Float(f) => Some(*f),
                            Value::Integer(i) => Some(*i as f64),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
            ),
            ColumnKind::Bool => (
                DataType::Boolean,
                Arc::new(BooleanArray::from(
                    cells()
                        .map(|v| match v {
                            Value::Bool(b) => Some(*b),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                )),
            ),
            ColumnKind::Text => (
                DataType::Utf8,
                Arc::new(StringArray::from(
                    cells()
                        .map(|v| (!v.is_null()).then(|| v.as_text().into_owned()))
                        .collect::<Vec<_>>(),
                )),
            ),
        };
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(table.row_count()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
        .context("building record batch")
}
