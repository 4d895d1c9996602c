use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a pole after SCID normalization.
pub type PoleId = String;

/// A single spreadsheet cell value. Survey exports mix free text, numbers and
/// the occasional boolean flag in the same column, so the value keeps its
/// source shape until a consumer asks for a specific representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    /// Plain text cell.
    Text(String),
    /// Numeric cell.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Empty cell.
    Empty,
}

impl CellValue {
    /// Builds a text value.
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Returns `true` for empty cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(value) => value.trim().is_empty(),
            CellValue::Empty => true,
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    /// Returns the trimmed textual form of the cell.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(value) => value.trim().to_string(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Bool(value) => value.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Returns the numeric form of the cell when it holds a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Text(value) => value.trim().parse::<f64>().ok(),
            CellValue::Bool(_) | CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Normalizes a column label for comparison: newlines and runs of whitespace
/// collapse into single spaces, surrounding whitespace is dropped and the
/// result is lower-cased.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One labelled cell of an input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub label: String,
    pub value: CellValue,
}

/// One input record as handed over by the tabular input adapter. Cells keep
/// the header order of the source sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number in the source sheet, used in reports.
    pub row: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    /// Creates an empty row with the given source row number.
    pub fn new(row: usize) -> Self {
        Self {
            row,
            cells: Vec::new(),
        }
    }

    /// Appends a cell and returns the row, for fixture-style construction.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(label, value);
        self
    }

    /// Appends a cell.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.push(Cell {
            label: label.into(),
            value: value.into(),
        });
    }

    /// Looks up a cell by label, tolerating whitespace and case differences.
    pub fn get(&self, label: &str) -> Option<&CellValue> {
        let wanted = normalize_label(label);
        self.cells
            .iter()
            .find(|cell| normalize_label(&cell.label) == wanted)
            .map(|cell| &cell.value)
    }

    /// Returns `true` when every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| cell.value.is_empty())
    }
}

/// Attachment or record category. Provider categories are configured per
/// utility company, so the set is open and the name is kept as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const POLE: &'static str = "Pole";
    pub const POWER: &'static str = "Power";
    pub const STREET_LIGHT: &'static str = "Street Light";
    /// Generic communication attachment still waiting for its `comm<k>` slot.
    pub const COMM: &'static str = "comm";
    pub const SYSTEM: &'static str = "System";
    pub const NEW_GUY: &'static str = "New Guy";
    pub const SPAN: &'static str = "Span";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generic communication slot `comm<slot>`.
    pub fn comm(slot: usize) -> Self {
        Self(format!("comm{slot}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Field names of the record-level categories.
pub mod field {
    pub const NUMBER: &str = "Number";
    pub const TAG: &str = "Tag";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const ADDRESS: &str = "Address";
    pub const HEIGHT_CLASS: &str = "Height & Class";
    pub const MR_NOTES: &str = "MR Notes";
    pub const TO_POLE: &str = "To Pole";
    pub const LENGTH: &str = "Length";
    pub const REFERENCE_LENGTH: &str = "Reference Length";
    pub const LINE_NUMBER: &str = "Line Number";
    pub const ALL_COMM_HEIGHTS: &str = "All Comm Heights";
    pub const TOTAL_COMM_COUNT: &str = "Total Comm Count";
    pub const EXISTING_RISERS: &str = "Number of Existing Risers";
    pub const ATTACHMENT_HT: &str = "Attachment Ht";
    pub const MIDSPAN_HT: &str = "Midspan Ht";
    pub const LOWEST_HEIGHT: &str = "Lowest Height";
    pub const LOWEST_MIDSPAN: &str = "Lowest Midspan";
}

/// A cell resolved to a category and field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedField {
    pub category: Category,
    pub field: String,
    pub value: CellValue,
    /// Column label the cell was read from, whitespace collapsed.
    pub label: String,
    /// Source row number of the cell.
    pub row: usize,
}

/// Span data recorded on one survey row of a pole.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpanRecord {
    pub to_pole: Option<PoleId>,
    pub length: Option<f64>,
    pub reference_length: Option<f64>,
    pub row: usize,
}

/// Guy wire parsed out of the make-ready notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuyAttachment {
    pub lead: String,
    pub direction: String,
    pub size: Option<String>,
}

/// Aggregated record of a physical pole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pole {
    pub id: PoleId,
    pub tag: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub height_class: Option<String>,
    pub mr_notes: Option<String>,
    /// Category → field → value for physical attachments.
    pub attachments: BTreeMap<Category, BTreeMap<String, CellValue>>,
    /// Remaining `Pole` fields without a dedicated slot.
    pub properties: BTreeMap<String, CellValue>,
    /// `System` fields such as the source line number.
    pub system: BTreeMap<String, CellValue>,
    pub spans: Vec<SpanRecord>,
    pub guys: Vec<GuyAttachment>,
    /// Every communication height on the pole, highest first, with its owner.
    pub comm_heights: Option<String>,
    pub comm_count: usize,
    /// Risers owned by existing attachers.
    pub existing_risers: usize,
    /// Source rows merged into this pole.
    pub rows: Vec<usize>,
}

impl Pole {
    pub fn new(id: impl Into<PoleId>) -> Self {
        Self {
            id: id.into(),
            tag: None,
            latitude: None,
            longitude: None,
            address: None,
            height_class: None,
            mr_notes: None,
            attachments: BTreeMap::new(),
            properties: BTreeMap::new(),
            system: BTreeMap::new(),
            spans: Vec::new(),
            guys: Vec::new(),
            comm_heights: None,
            comm_count: 0,
            existing_risers: 0,
            rows: Vec::new(),
        }
    }

    /// Inserts or replaces an attachment field.
    pub fn insert_attachment(&mut self, category: Category, field: String, value: CellValue) {
        self.attachments
            .entry(category)
            .or_default()
            .insert(field, value);
    }

    pub fn attachment(&self, category: &str, field: &str) -> Option<&CellValue> {
        self.attachments
            .get(&Category::from(category))
            .and_then(|fields| fields.get(field))
    }

    /// Coordinates, when both are known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Outgoing "To Pole" references in row order.
    pub fn linked_poles(&self) -> impl Iterator<Item = &str> {
        self.spans
            .iter()
            .filter_map(|record| record.to_pole.as_deref())
    }
}

/// A pole-to-pole connection listed in a QC workbook, ids normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcConnection {
    pub from: PoleId,
    pub to: PoleId,
    pub sheet: String,
    /// 1-based row of the connection in its sheet.
    pub row: usize,
}

/// A reconciled span between two poles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub from: PoleId,
    pub to: PoleId,
    pub length: Option<f64>,
    pub reference_length: Option<f64>,
    /// Vacuously `true` when either length is missing.
    pub within_tolerance: bool,
}

/// Strategy that produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    Manual,
    Qc,
    Linked,
    Positional,
    Empty,
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::Manual => write!(f, "manual"),
            RouteSource::Qc => write!(f, "qc"),
            RouteSource::Linked => write!(f, "linked"),
            RouteSource::Positional => write!(f, "positional"),
            RouteSource::Empty => write!(f, "empty"),
        }
    }
}

/// Ordered spans connecting the surveyed poles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub spans: Vec<Span>,
    pub source: RouteSource,
    /// When set, only poles on the route belong in the output.
    pub restricted: bool,
}

impl Route {
    pub fn empty() -> Self {
        Self {
            spans: Vec::new(),
            source: RouteSource::Empty,
            restricted: false,
        }
    }

    /// Pole ids in order of first appearance along the spans.
    pub fn pole_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::new();
        for span in &self.spans {
            for id in [span.from.as_str(), span.to.as_str()] {
                if !order.contains(&id) {
                    order.push(id);
                }
            }
        }
        order
    }

    /// Spans leaving the given pole, in route order.
    pub fn outgoing<'a>(&'a self, pole: &'a str) -> impl Iterator<Item = &'a Span> + 'a {
        self.spans.iter().filter(move |span| span.from == pole)
    }
}

/// One output line: a pole and, when it has one, the span leaving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleRecord {
    /// 1-based line number in the output.
    pub line_number: usize,
    pub pole: Pole,
    pub span: Option<Span>,
}

/// Final ordered model handed to template rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedModel {
    pub records: Vec<PoleRecord>,
    pub route_source: RouteSource,
}

impl NormalizedModel {
    /// Distinct pole ids in output order.
    pub fn pole_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for record in &self.records {
            if !ids.contains(&record.pole.id.as_str()) {
                ids.push(record.pole.id.as_str());
            }
        }
        ids
    }
}
