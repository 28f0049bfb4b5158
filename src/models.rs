use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Cohort group key. Time-based axes carry a parsed instant, term axes the
/// raw bucket value. Grouping compares by value, never by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CohortKey {
    Date(DateTime<Utc>),
    Term(String),
}

/// One (cohort, period) observation after parsing and cumulative aggregation.
#[derive(Debug, Clone)]
pub struct CohortRecord {
    pub date: CohortKey,
    pub period: u32,
    pub total: f64,
    pub value: f64,
    pub cumulative_value: f64,
}

/// Per-period min/max/mean of the selected metric across all cohorts.
/// `mean` is rounded to 2 decimals; it is reused verbatim in the footer row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub label: String,
    /// `None` for the two fixed leading columns (Total, Date/Term).
    pub period: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    /// `None` means the cohort has no record for this period (empty cell).
    /// A present NaN (division by a zero total) is kept, not zeroed.
    #[serde(serialize_with = "serialize_metric")]
    pub value: Option<f64>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    /// Formatted cohort date or term.
    pub key: String,
    pub total: f64,
    /// One cell per period column, in column order.
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FooterCell {
    pub label: String,
    #[serde(serialize_with = "serialize_metric")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableModel {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
    pub footer: Vec<FooterCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tooltip {
    pub label: String,
    pub period: u32,
    #[serde(serialize_with = "serialize_metric")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub period: u32,
    #[serde(serialize_with = "serialize_metric")]
    pub value: Option<f64>,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub key: String,
    pub color: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartModel {
    pub x_domain: [u32; 2],
    pub y_domain: [f64; 2],
    pub y_label: String,
    pub series: Vec<Series>,
    pub legend: Vec<LegendEntry>,
}

/// Serializes metric values so a NaN (undefined percentage over a zero
/// total) reaches the renderer as the string "NaN" instead of being
/// flattened to null by serde_json.
fn serialize_metric<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        None => serializer.serialize_none(),
        Some(v) if v.is_nan() => serializer.serialize_str("NaN"),
        Some(v) => serializer.serialize_f64(*v),
    }
}
