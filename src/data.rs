use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::format::Interval;
use crate::models::{CohortKey, CohortRecord};

// Synthetic positional column ids assigned by the aggregation layer.
const DATE_COLUMN: &str = "col-0-2";
const TOTAL_COLUMN: &str = "col-1-1";
const PERIOD_COLUMN: &str = "col-2-3";
const VALUE_COLUMN: &str = "col-3-1";

const DATE_COLUMN_NAME: &str = "Cohort Date";
const DATE_HISTOGRAM_TYPE: &str = "date_histogram";

/// Row set plus column metadata, as produced by the upstream query layer.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub meta: Option<AggMeta>,
}

#[derive(Debug, Deserialize)]
pub struct AggMeta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "aggConfigParams")]
    pub agg_config_params: Option<AggConfigParams>,
}

#[derive(Debug, Deserialize)]
pub struct AggConfigParams {
    #[serde(default)]
    pub interval: Option<String>,
}

/// Looks up the cohort-date column's bucketing interval. `None` when the
/// axis is term-based, the metadata is absent, or the interval code is
/// unknown; in all of those cases no date parsing or formatting happens.
pub fn date_histogram(response: &QueryResponse) -> Option<Interval> {
    let column = response
        .columns
        .iter()
        .find(|column| column.name == DATE_COLUMN_NAME)?;
    let meta = column.meta.as_ref()?;
    if meta.kind != DATE_HISTOGRAM_TYPE {
        return None;
    }
    let code = meta.agg_config_params.as_ref()?.interval.as_deref()?;
    Interval::parse(code)
}

/// Numeric coercion for raw row fields: finite numbers pass through,
/// anything else gets a best-effort parse, and failures become 0 so a
/// malformed field never aborts the render.
pub fn parse_number(raw: &Value) -> f64 {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_number_str(s),
        _ => 0.0,
    }
}

fn parse_number_str(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|v| v as i64))
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    None
}

/// Cohort key for one raw date/term value. On a time-based axis an
/// unparseable date falls back to a term key rather than poisoning the
/// group map with a single invalid instant.
fn cohort_key(raw: &Value, time_based: bool) -> CohortKey {
    if time_based {
        if let Some(date) = parse_date(raw) {
            return CohortKey::Date(date);
        }
    }
    match raw {
        Value::String(s) => CohortKey::Term(s.clone()),
        other => CohortKey::Term(other.to_string()),
    }
}

/// Parses the raw row set into cohort records and runs the cumulative pass.
/// An empty row set yields an empty record set (nothing to render).
pub fn process_response(response: &QueryResponse, interval: Option<Interval>) -> Vec<CohortRecord> {
    let time_based = interval.is_some();
    let records = response
        .rows
        .iter()
        .map(|row| {
            let raw_date = row.get(DATE_COLUMN).unwrap_or(&Value::Null);
            CohortRecord {
                date: cohort_key(raw_date, time_based),
                period: parse_period(row.get(PERIOD_COLUMN).unwrap_or(&Value::Null)),
                total: parse_number(row.get(TOTAL_COLUMN).unwrap_or(&Value::Null)),
                value: parse_number(row.get(VALUE_COLUMN).unwrap_or(&Value::Null)),
                cumulative_value: 0.0,
            }
        })
        .collect();
    accumulate(records)
}

fn parse_period(raw: &Value) -> u32 {
    parse_number(raw).max(0.0) as u32
}

/// Assigns running sums of `value` per cohort key, in arrival order.
/// Cumulative semantics are defined by input order, so this is a single
/// left-to-right pass with an explicit per-key accumulator map.
pub fn accumulate(mut records: Vec<CohortRecord>) -> Vec<CohortRecord> {
    let mut running: HashMap<CohortKey, f64> = HashMap::new();
    for record in records.iter_mut() {
        let sum = running.entry(record.date.clone()).or_insert(0.0);
        *sum += record.value;
        record.cumulative_value = *sum;
    }
    records
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    total: String,
    period: String,
    value: String,
}

fn read_csv_records<R: Read>(reader: R, time_based: bool) -> anyhow::Result<Vec<CohortRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize::<CsvRow>() {
        let row = result?;
        records.push(CohortRecord {
            date: cohort_key(&Value::String(row.date), time_based),
            period: parse_number_str(&row.period).max(0.0) as u32,
            total: parse_number_str(&row.total),
            value: parse_number_str(&row.value),
            cumulative_value: 0.0,
        });
    }

    Ok(accumulate(records))
}

/// Loads cohort records from a JSON query response or a flat CSV feed
/// (`date,total,period,value`), returning the records together with the
/// date-bucketing interval in effect. `interval_override` declares the
/// bucketing for inputs that carry no column metadata.
pub fn load_records(
    path: &Path,
    interval_override: Option<Interval>,
) -> anyhow::Result<(Vec<CohortRecord>, Option<Interval>)> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let records = read_csv_records(file, interval_override.is_some())?;
        debug!("loaded {} records from csv input", records.len());
        return Ok((records, interval_override));
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let response: QueryResponse =
        serde_json::from_str(&raw).context("malformed query response JSON")?;
    let interval = interval_override.or_else(|| date_histogram(&response));
    let records = process_response(&response, interval);
    debug!(
        "loaded {} records from query response ({} axis)",
        records.len(),
        if interval.is_some() { "date" } else { "term" }
    );
    Ok((records, interval))
}
