use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMillisecondType,
};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{CellValue, DisplayColumn, RawTable, Visit, VisitTable};
use crate::config::ColumnConfig;

/// Calendar month names indexed by `month0`.
pub const MONTHS_RU: [&str; 12] = [
    "Январь", "Февраль", "Март", "Апрель", "Май", "Июнь",
    "Июль", "Август", "Сентябрь", "Октябрь", "Ноябрь", "Декабрь",
];

/// Month label for a date.
pub fn month_label(date: NaiveDate) -> &'static str {
    MONTHS_RU[date.month0() as usize]
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a visit table from a file and resolve the configured columns.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – first worksheet, header in row 1
/// * `.csv`     – header row, comma separated
/// * `.json`    – `[{ "Зона": "...", "lat": 55.7, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path, columns: &ColumnConfig) -> Result<VisitTable> {
    let raw = read_raw(path)?;
    let table = build_table(raw, columns, path)?;
    log::info!(
        "Loaded {} visits from {} ({} rows skipped, weight column: {})",
        table.len(),
        path.display(),
        table.skipped_rows,
        table.has_weight
    );
    Ok(table)
}

/// Read the header row and cells without interpreting any column.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat {
            extension: other.to_string(),
            path: path.to_path_buf(),
        }
        .into()),
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

struct ColumnIndex {
    date: usize,
    weekday: usize,
    zone: usize,
    counterparty: usize,
    category: usize,
    document: usize,
    amount: usize,
    lat: usize,
    lon: usize,
    weight: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &[String], columns: &ColumnConfig, path: &Path) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name.trim());
        let require = |name: &str| {
            find(name).ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
        };

        Ok(Self {
            date: require(&columns.date)?,
            weekday: require(&columns.weekday)?,
            zone: require(&columns.zone)?,
            counterparty: require(&columns.counterparty)?,
            category: require(&columns.category)?,
            document: require(&columns.document)?,
            amount: require(&columns.amount)?,
            lat: require(&columns.lat)?,
            lon: require(&columns.lon)?,
            weight: columns.weight.as_deref().and_then(|name| find(name)),
        })
    }
}

/// Turn a raw sheet into typed visits. Missing required columns are fatal;
/// rows with an unreadable date, coordinate or amount are skipped.
pub fn build_table(raw: RawTable, columns: &ColumnConfig, path: &Path) -> Result<VisitTable> {
    if raw.headers.is_empty() {
        return Err(LoadError::EmptySheet { path: path.to_path_buf() }.into());
    }
    let idx = ColumnIndex::resolve(&raw.headers, columns, path)?;
    if columns.weight.is_some() && idx.weight.is_none() {
        log::info!("{}: no weight column, weight features disabled", path.display());
    }

    let mut visits = Vec::with_capacity(raw.rows.len());
    let mut skipped_rows = 0;

    for (row_no, mut cells) in raw.rows.into_iter().enumerate() {
        // Spreadsheet rows may be ragged; pad so every column index is valid.
        if cells.len() < raw.headers.len() {
            cells.resize(raw.headers.len(), CellValue::Null);
        }
        if cells.iter().all(CellValue::is_null) {
            continue;
        }

        // Data row N is sheet line N + 2 (header is line 1).
        let line = row_no + 2;
        let reject = |column: &str, cell: &CellValue| {
            log::warn!(
                "{}: row {line}: cannot read '{column}' from '{cell}', row skipped",
                path.display()
            );
        };

        let Some(date) = parse_date(&cells[idx.date]) else {
            reject(&columns.date, &cells[idx.date]);
            skipped_rows += 1;
            continue;
        };
        let Some(lat) = parse_number(&cells[idx.lat]) else {
            reject(&columns.lat, &cells[idx.lat]);
            skipped_rows += 1;
            continue;
        };
        let Some(lon) = parse_number(&cells[idx.lon]) else {
            reject(&columns.lon, &cells[idx.lon]);
            skipped_rows += 1;
            continue;
        };
        let Some(amount) = parse_number(&cells[idx.amount]) else {
            reject(&columns.amount, &cells[idx.amount]);
            skipped_rows += 1;
            continue;
        };

        visits.push(Visit {
            document: cell_text(&cells[idx.document]),
            date,
            weekday: cell_text(&cells[idx.weekday]),
            month: month_label(date.date()),
            zone: cell_text(&cells[idx.zone]),
            counterparty: cell_text(&cells[idx.counterparty]),
            category: cell_text(&cells[idx.category]),
            amount,
            lat,
            lon,
            weight: idx.weight.and_then(|i| parse_weight(&cells[i])),
            cells,
        });
    }

    let mut display_columns: Vec<DisplayColumn> = raw
        .headers
        .iter()
        .enumerate()
        .map(|(index, name)| DisplayColumn::Source { name: name.clone(), index })
        .collect();
    let has_column = |name: &str| raw.headers.iter().any(|h| h.trim() == name);
    if !has_column(&columns.month) {
        display_columns.push(DisplayColumn::Month(columns.month.clone()));
    }
    let has_weight = idx.weight.is_some();
    if has_weight && !has_column(&columns.weight_numeric) {
        display_columns.push(DisplayColumn::Weight(columns.weight_numeric.clone()));
    }

    let weekdays: BTreeSet<String> = visits
        .iter()
        .map(|v| v.weekday.clone())
        .filter(|s| !s.is_empty())
        .collect();
    let zones: BTreeSet<String> = visits
        .iter()
        .map(|v| v.zone.clone())
        .filter(|s| !s.is_empty())
        .collect();
    let month_numbers: BTreeSet<u32> = visits.iter().map(|v| v.date.month0()).collect();
    let months = month_numbers
        .into_iter()
        .map(|m| MONTHS_RU[m as usize])
        .collect();

    Ok(VisitTable {
        display_columns,
        visits,
        skipped_rows,
        has_weight,
        weekdays,
        zones,
        months,
    })
}

// ---------------------------------------------------------------------------
// Cell interpretation
// ---------------------------------------------------------------------------

/// Best-effort weight: numbers pass through, text is normalised
/// (`"1 234,5 кг"` → `1234.5`). Anything unreadable is `None`.
pub fn parse_weight(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Float(v) => v.is_finite().then_some(*v),
        CellValue::Integer(i) => Some(*i as f64),
        CellValue::String(s) => parse_weight_text(s),
        _ => None,
    }
}

pub fn parse_weight_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .replace(['\u{a0}', ' '], "")
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if matches!(cleaned.as_str(), "" | "." | "-") {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric field (amount, coordinates): numbers pass through, text uses the
/// same normalisation as weights.
fn parse_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::String(s) => parse_weight_text(s),
        other => other.as_f64().filter(|v| v.is_finite()),
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

fn parse_date(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Date(dt) => Some(*dt),
        CellValue::Float(v) => excel_serial_to_datetime(*v),
        CellValue::Integer(i) => excel_serial_to_datetime(*i as f64),
        CellValue::String(s) => parse_date_text(s),
        _ => None,
    }
}

/// Text dates keep their time of day; a bare date is taken as midnight.
pub fn parse_date_text(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            // ISO timestamps with fractional seconds or an offset (wall clock kept).
            DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
        })
}

/// Excel stores timestamps as days since 1899-12-30, the fraction being the
/// time of day.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let day = NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_days(chrono::Days::new(serial.trunc() as u64))?;
    let seconds = (serial.fract() * 86_400.0).round() as i64;
    day.and_time(NaiveTime::MIN)
        .checked_add_signed(chrono::Duration::seconds(seconds))
}

/// Text form of a label cell; whole floats drop their fraction so document
/// numbers read as typed.
fn cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{v:.0}"),
        other => other.to_string().trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Workbook loader
// ---------------------------------------------------------------------------

/// First worksheet; the first row is the header.
fn load_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook: {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::NoWorksheet { path: path.to_path_buf() })?
        .with_context(|| format!("failed to read first worksheet: {}", path.display()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| data_to_cell(c).to_string()).collect(),
        None => return Err(LoadError::EmptySheet { path: path.to_path_buf() }.into()),
    };
    let rows = rows.map(|r| r.iter().map(data_to_cell).collect()).collect();

    Ok(RawTable { headers, rows })
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::String(s.clone()),
        Data::Float(v) => CellValue::Float(*v),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(CellValue::Date)
            .unwrap_or_else(|_| CellValue::String(s.clone())),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable { headers, rows })
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    // Leading zeros mark identifiers, not numbers.
    let leading_zero = s.len() > 1 && s.starts_with('0') && !s.starts_with("0.");
    if !leading_zero {
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON: an array of flat objects keyed by column name.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading JSON file {}", path.display()))?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    let mut parsed: Vec<BTreeMap<String, CellValue>> = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        parsed.push(row);
    }

    let rows = parsed
        .into_iter()
        .map(|mut row| {
            headers
                .iter()
                .map(|h| row.remove(h).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per sheet column.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening parquet file {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let start = rows.len();
        rows.resize_with(start + batch.num_rows(), || Vec::with_capacity(headers.len()));

        for (col_idx, col) in batch.columns().iter().enumerate() {
            let cells = column_cells(col)
                .with_context(|| format!("column '{}'", headers[col_idx]))?;
            for (row, cell) in rows[start..].iter_mut().zip(cells) {
                row.push(cell);
            }
        }
    }

    Ok(RawTable { headers, rows })
}

/// Convert one Arrow column into cells.
fn column_cells(col: &ArrayRef) -> Result<Vec<CellValue>> {
    let n = col.len();
    let cells = |f: &dyn Fn(usize) -> CellValue| -> Vec<CellValue> {
        (0..n)
            .map(|i| if col.is_null(i) { CellValue::Null } else { f(i) })
            .collect()
    };

    let out = match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_string_opt::<i32>().context("expected Utf8 array")?;
            cells(&|i| CellValue::String(arr.value(i).to_string()))
        }
        DataType::LargeUtf8 => {
            let arr = col.as_string_opt::<i64>().context("expected LargeUtf8 array")?;
            cells(&|i| CellValue::String(arr.value(i).to_string()))
        }
        DataType::Int32 => {
            let arr = col.as_primitive_opt::<Int32Type>().context("expected Int32 array")?;
            cells(&|i| CellValue::Integer(arr.value(i) as i64))
        }
        DataType::Int64 => {
            let arr = col.as_primitive_opt::<Int64Type>().context("expected Int64 array")?;
            cells(&|i| CellValue::Integer(arr.value(i)))
        }
        DataType::Float32 => {
            let arr = col.as_primitive_opt::<Float32Type>().context("expected Float32 array")?;
            cells(&|i| CellValue::Float(arr.value(i) as f64))
        }
        DataType::Float64 => {
            let arr = col.as_primitive_opt::<Float64Type>().context("expected Float64 array")?;
            cells(&|i| CellValue::Float(arr.value(i)))
        }
        DataType::Boolean => {
            let arr = col.as_boolean_opt().context("expected Boolean array")?;
            cells(&|i| CellValue::Bool(arr.value(i)))
        }
        DataType::Date32 => {
            let arr = col.as_primitive_opt::<Date32Type>().context("expected Date32 array")?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch")?;
            cells(&|i| {
                epoch
                    .checked_add_signed(chrono::Duration::days(arr.value(i) as i64))
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(CellValue::Date)
                    .unwrap_or(CellValue::Null)
            })
        }
        DataType::Timestamp(_, _) | DataType::Date64 => {
            let millis = arrow::compute::cast(col, &DataType::Timestamp(TimeUnit::Millisecond, None))
                .context("casting timestamp column")?;
            let arr = millis
                .as_primitive_opt::<TimestampMillisecondType>()
                .context("expected millisecond timestamps")?;
            cells(&|i| {
                DateTime::from_timestamp_millis(arr.value(i))
                    .map(|dt| CellValue::Date(dt.naive_utc()))
                    .unwrap_or(CellValue::Null)
            })
        }
        _ => {
            let text = arrow::compute::cast(col, &DataType::Utf8)
                .with_context(|| format!("unsupported column type {:?}", col.data_type()))?;
            let arr = text.as_string_opt::<i32>().context("expected Utf8 array")?;
            cells(&|i| CellValue::String(arr.value(i).to_string()))
        }
    };
    Ok(out)
}
