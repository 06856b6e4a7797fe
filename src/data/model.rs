use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the source sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed spreadsheet cell, kept so the table view can show every
/// original column as it was loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => {
                if d.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", d.date())
                } else {
                    write!(f, "{d}")
                }
            }
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Interpret the cell as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – what every reader produces before columns are resolved
// ---------------------------------------------------------------------------

/// Header row plus untyped cells, in source order.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

// ---------------------------------------------------------------------------
// Visit – one row of the sheet
// ---------------------------------------------------------------------------

/// A single delivery/visit record with its typed fields resolved at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub document: String,
    /// Document timestamp; midnight when the sheet only holds a date.
    pub date: NaiveDateTime,
    pub weekday: String,
    /// Calendar month name derived from `date`.
    pub month: &'static str,
    pub zone: String,
    pub counterparty: String,
    pub category: String,
    /// Amount including VAT.
    pub amount: f64,
    pub lat: f64,
    pub lon: f64,
    /// Best-effort numeric weight; `None` when missing or unparseable.
    pub weight: Option<f64>,
    /// Original cells in source column order.
    pub cells: Vec<CellValue>,
}

// ---------------------------------------------------------------------------
// VisitTable – the complete loaded sheet
// ---------------------------------------------------------------------------

/// The full parsed sheet with pre-computed selector values.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitTable {
    /// Columns shown in the table view: the originals, then derived ones that
    /// were not already present.
    pub display_columns: Vec<DisplayColumn>,
    pub visits: Vec<Visit>,
    /// Rows rejected at load because a required field could not be read.
    pub skipped_rows: usize,
    /// Whether the sheet carries a weight column at all.
    pub has_weight: bool,
    pub weekdays: BTreeSet<String>,
    pub zones: BTreeSet<String>,
    /// Distinct month labels in calendar order.
    pub months: Vec<&'static str>,
}

/// One column of the table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayColumn {
    /// Index into [`Visit::cells`].
    Source { name: String, index: usize },
    /// The derived calendar month label.
    Month(String),
    /// The derived numeric weight.
    Weight(String),
}

impl DisplayColumn {
    pub fn name(&self) -> &str {
        match self {
            DisplayColumn::Source { name, .. } => name,
            DisplayColumn::Month(name) | DisplayColumn::Weight(name) => name,
        }
    }

    /// Text shown for this column in the given row.
    pub fn cell_text(&self, visit: &Visit) -> String {
        match self {
            DisplayColumn::Source { index, .. } => visit
                .cells
                .get(*index)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            DisplayColumn::Month(_) => visit.month.to_string(),
            DisplayColumn::Weight(_) => visit.weight.map(|w| format!("{w:.2}")).unwrap_or_default(),
        }
    }
}

impl VisitTable {
    /// Number of visits.
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
