use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type,
};
use arrow::util::display::array_value_to_string;
use calamine::{Data, ExcelDateTime, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Table, Value};

/// Extensions accepted by [`load_file`].
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["csv", "xls", "xlsx", "xlsm", "xlsb", "json", "parquet", "pq"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`                            – header row, then one record per line
/// * `.xls` / `.xlsx` / `.xlsm` / `.xlsb` – first worksheet, first row is the header
/// * `.json`                           – `[{ "col": value, ... }, ...]`
/// * `.parquet`                        – flat (non-nested) columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "xls" | "xlsx" | "xlsm" | "xlsb" => load_spreadsheet(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.row_count(),
        table.columns(),
        path.display()
    );
    Ok(table)
}

/// Name blank headers `Unnamed: <idx>` and de-duplicate repeats as
/// `name.1`, `name.2`, ...
fn unique_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for (idx, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = unique_headers(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.to_string()),
    );

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        records.push(result.with_context(|| format!("CSV row {row_no}"))?);
    }

    let kinds: Vec<CellKind> = (0..headers.len())
        .map(|col| infer_column(records.iter().filter_map(|r| r.get(col))))
        .collect();
    let rows: Vec<Vec<Value>> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&kinds)
                .map(|(cell, kind)| kind.parse(cell))
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows)?)
}

/// Type shared by every cell of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl CellKind {
    fn parse(self, cell: &str) -> Value {
        if cell.is_empty() {
            return Value::Null;
        }
        let parsed = match self {
            CellKind::Integer => cell.parse().ok().map(Value::Integer),
            CellKind::Float => cell.parse::<f64>().ok().map(Value::from),
            CellKind::Bool => Some(Value::Bool(cell == "true")),
            CellKind::Text => None,
        };
        parsed.unwrap_or_else(|| Value::String(cell.to_string()))
    }
}

/// Narrowest kind for every non-empty cell; integers widen to floats and any
/// other mix keeps the text.
fn infer_column<'a>(cells: impl Iterator<Item = &'a str>) -> CellKind {
    let mut kind: Option<CellKind> = None;
    for cell in cells.filter(|c| !c.is_empty()) {
        let k = if is_plain_integer(cell) {
            CellKind::Integer
        } else if is_plain_decimal(cell) {
            CellKind::Float
        } else if cell == "true" || cell == "false" {
            CellKind::Bool
        } else {
            return CellKind::Text;
        };
        kind = Some(match (kind, k) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(CellKind::Integer), CellKind::Float)
            | (Some(CellKind::Float), CellKind::Integer) => CellKind::Float,
            _ => return CellKind::Text,
        });
    }
    kind.unwrap_or(CellKind::Text)
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

// Zero-padded codes such as `007` stay text.
fn has_leading_zero(int_part: &str) -> bool {
    int_part.len() > 1 && int_part.starts_with('0')
}

fn is_plain_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && all_digits(digits)
        && !has_leading_zero(digits)
        && s.parse::<i64>().is_ok()
}

/// `[-]digits[.digits]` only: no exponent, no `inf`/`nan`.
fn is_plain_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac) = body.split_once('.').unwrap_or((body, ""));
    !(int_part.is_empty() && frac.is_empty())
        && all_digits(int_part)
        && all_digits(frac)
        && !has_leading_zero(int_part)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("reading first worksheet")?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Table::default());
    };
    let headers = unique_headers(
        header_row
            .iter()
            .map(|cell| cell_to_value(cell).as_text().into_owned()),
    );

    let rows: Vec<Vec<Value>> = sheet_rows
        .filter(|cells| !cells.iter().all(|c| matches!(c, Data::Empty)))
        .map(|cells| cells.iter().map(cell_to_value).collect())
        .collect();

    Ok(Table::new(headers, rows)?)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Integer(*i),
        // Excel stores every number as a float.
        Data::Float(f) if is_integral(*f) => Value::Integer(*f as i64),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => excel_date(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Date(s.clone()),
        Data::Error(e) => Value::String(format!("#{e:?}")),
    }
}

fn is_integral(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// ISO text for a date cell: `2024-01-05`, or `2024-01-05T10:30:00` when it
/// carries a time. Durations keep their serial value.
fn excel_date(dt: &ExcelDateTime) -> Value {
    match dt.as_datetime() {
        Some(when) if dt.is_datetime() => {
            if dt.as_f64().fract() == 0.0 {
                Value::Date(when.date().to_string())
            } else {
                Value::Date(format!("{}T{}", when.date(), when.time()))
            }
        }
        _ => Value::from(dt.as_f64()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "id": 1, "name": "john", "city": "Paris" },
///   { "id": 2, "name": "mary", "city": null }
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> Result<Vec<(String, Value)>> {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(obj
                .iter()
                .map(|(key, val)| (key.clone(), json_to_value(val)))
                .collect())
        })
        .collect::<Result<_>>()?;

    Ok(Table::from_records(rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat columns.
///
/// Strings, integers, floats and booleans map to the matching [`Value`];
/// dates and timestamps become [`Value::Date`] text. Anything else is kept
/// as its display string.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_value(col.as_ref(), row))
                    .collect(),
            );
        }
    }

    Ok(Table::new(columns, rows)?)
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &dyn Array, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }

    let typed = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| Value::String(a.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| Value::String(a.value(row).to_string())),
        DataType::Int8 => col
            .as_primitive_opt::<Int8Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Int16 => col
            .as_primitive_opt::<Int16Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| Value::Integer(a.value(row))),
        DataType::UInt8 => col
            .as_primitive_opt::<UInt8Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::UInt16 => col
            .as_primitive_opt::<UInt16Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::UInt32 => col
            .as_primitive_opt::<UInt32Type>()
            .map(|a| Value::Integer(i64::from(a.value(row)))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| Value::from(f64::from(a.value(row)))),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| Value::from(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| Value::Bool(a.value(row))),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            array_value_to_string(col, row).ok().map(Value::Date)
        }
        _ => None,
    };

    typed.unwrap_or_else(|| {
        array_value_to_string(col, row)
            .map(Value::String)
            .unwrap_or(Value::Null)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_columns_share_one_type() {
        assert_eq!(infer_column(["1", "", "-20"].into_iter()), CellKind::Integer);
        assert_eq!(infer_column(["1", "2.5", "-0.5"].into_iter()), CellKind::Float);
        assert_eq!(infer_column(["true", "false"].into_iter()), CellKind::Bool);
        assert_eq!(infer_column(["1", "john"].into_iter()), CellKind::Text);
        assert_eq!(infer_column(["", ""].into_iter()), CellKind::Text);

        assert_eq!(CellKind::Float.parse("2"), Value::Float(2.0));
        assert_eq!(CellKind::Integer.parse(""), Value::Null);
        assert_eq!(CellKind::Text.parse("42"), Value::from("42"));
    }

    #[test]
    fn csv_number_lookalikes_stay_text() {
        for cell in ["007", "01.5", "1e3", "nan", "Nan", "inf", "Infinity", "-", ".", "1.2.3"] {
            assert_eq!(infer_column([cell].into_iter()), CellKind::Text, "{cell}");
        }
        assert_eq!(infer_column(["0", "0.25", ".5"].into_iter()), CellKind::Float);
    }

    #[test]
    fn headers_are_named_and_deduplicated() {
        let raw = ["id", "", "name", "name", "name"].map(String::from);
        assert_eq!(
            unique_headers(raw),
            vec!["id", "Unnamed: 1", "name", "name.1", "name.2"]
        );
    }

    #[test]
    fn json_scalars_map_to_values() {
        assert_eq!(json_to_value(&serde_json::json!(3)), Value::Integer(3));
        assert_eq!(json_to_value(&serde_json::json!(2.5)), Value::Float(2.5));
        assert_eq!(json_to_value(&serde_json::json!(null)), Value::Null);
        assert_eq!(json_to_value(&serde_json::json!(-0.0)).as_text(), "0.0");
        assert_eq!(
            json_to_value(&serde_json::json!([1, 2])),
            Value::from("[1,2]")
        );
    }

    #[test]
    fn spreadsheet_cells_map_to_values() {
        assert_eq!(cell_to_value(&Data::Empty), Value::Null);
        assert_eq!(cell_to_value(&Data::String(String::new())), Value::Null);
        assert_eq!(cell_to_value(&Data::Int(7)), Value::Integer(7));
        assert_eq!(cell_to_value(&Data::Bool(false)), Value::Bool(false));
        assert_eq!(cell_to_value(&Data::Float(1.0)), Value::Integer(1));
        assert_eq!(cell_to_value(&Data::Float(-0.0)), Value::Integer(0));
        assert_eq!(cell_to_value(&Data::Float(2.5)), Value::Float(2.5));
        assert_eq!(cell_to_value(&Data::Float(1e300)), Value::Float(1e300));
    }

    #[test]
    fn spreadsheet_dates_become_iso_text() {
        use calamine::ExcelDateTimeType;

        let day = ExcelDateTime::new(45296.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            cell_to_value(&Data::DateTime(day)),
            Value::Date("2024-01-05".into())
        );
        let noon = ExcelDateTime::new(45296.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            cell_to_value(&Data::DateTime(noon)),
            Value::Date("2024-01-05T12:00:00".into())
        );
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("data.txt")).unwrap_err();
        assert!(format!("{err:#}").contains(".txt"));
    }
}
