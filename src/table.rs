use std::collections::HashMap;

use log::debug;

use crate::color::{ColorMode, ColorScale};
use crate::format::{self, Interval};
use crate::models::{
    Cell, CohortRecord, Column, ColumnStatistics, FooterCell, TableModel, TableRow,
};
use crate::value::{self, round, ValueOptions};

/// Builds the pivot grid: one column per distinct period (ascending), one
/// row per formatted cohort group (first-appearance order), plus a footer of
/// per-period means.
pub fn build_table(
    records: &[CohortRecord],
    options: ValueOptions,
    mode: ColorMode,
    interval: Option<Interval>,
) -> TableModel {
    let periods = distinct_periods(records);
    let stats = column_statistics(records, &periods, options);
    let scale = ColorScale::new(mode, records, options);

    let mut columns = vec![
        Column {
            label: "Total".to_string(),
            period: None,
        },
        Column {
            label: if interval.is_some() { "Date" } else { "Term" }.to_string(),
            period: None,
        },
    ];
    columns.extend(periods.iter().map(|&period| Column {
        label: period.to_string(),
        period: Some(period),
    }));

    let rows = grouped(records, interval)
        .into_iter()
        .map(|(key, group)| {
            // The displayed total is whichever period's total was matched
            // last while scanning left to right; kept for compatibility with
            // the established rendering (benign when totals are constant
            // within a cohort).
            let mut total = 0.0;
            let cells = periods
                .iter()
                .enumerate()
                .map(|(index, &period)| {
                    match group.iter().find(|record| record.period == period) {
                        Some(record) => {
                            total = round(record.total);
                            let metric = options.apply(record);
                            Cell {
                                value: Some(metric),
                                color: scale.color(metric, &stats[index]),
                            }
                        }
                        None => Cell {
                            value: None,
                            color: None,
                        },
                    }
                })
                .collect();
            TableRow { key, total, cells }
        })
        .collect::<Vec<_>>();

    let footer = build_footer(&stats);

    debug!(
        "built table model: {} rows, {} period columns",
        rows.len(),
        periods.len()
    );
    TableModel {
        columns,
        rows,
        footer,
    }
}

fn distinct_periods(records: &[CohortRecord]) -> Vec<u32> {
    let mut periods: Vec<u32> = records.iter().map(|record| record.period).collect();
    periods.sort_unstable();
    periods.dedup();
    periods
}

/// Min/max/mean of the selected metric per period column, across all
/// cohorts. Means are rounded to 2 decimals; they double as footer cells.
fn column_statistics(
    records: &[CohortRecord],
    periods: &[u32],
    options: ValueOptions,
) -> Vec<ColumnStatistics> {
    periods
        .iter()
        .map(|&period| {
            let metrics: Vec<f64> = records
                .iter()
                .filter(|record| record.period == period)
                .map(|record| options.apply(record))
                .collect();
            let (min, max) =
                value::finite_extent(metrics.iter().copied()).unwrap_or((f64::NAN, f64::NAN));
            let mean = value::finite_mean(metrics.iter().copied())
                .map(round)
                .unwrap_or(f64::NAN);
            ColumnStatistics { min, max, mean }
        })
        .collect()
}

/// Groups records by their formatted cohort key, keeping first-appearance
/// order. Shared with the chart builder so rows and series line up.
pub fn grouped<'a>(
    records: &'a [CohortRecord],
    interval: Option<Interval>,
) -> Vec<(String, Vec<&'a CohortRecord>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&CohortRecord>> = HashMap::new();

    for record in records {
        let key = format::format_key(&record.date, interval);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(record);
    }

    order
        .into_iter()
        .map(|key| {
            let group = groups.remove(&key).unwrap_or_default();
            (key, group)
        })
        .collect()
}

fn build_footer(stats: &[ColumnStatistics]) -> Vec<FooterCell> {
    let means: Vec<f64> = stats.iter().map(|s| s.mean).collect();
    let mean_of_means = value::finite_mean(means.iter().copied())
        .map(round)
        .unwrap_or(f64::NAN);

    let mut footer = vec![
        FooterCell {
            label: "-".to_string(),
            value: None,
        },
        FooterCell {
            label: format!("Mean ({mean_of_means})"),
            value: Some(mean_of_means),
        },
    ];
    footer.extend(means.into_iter().map(|mean| FooterCell {
        label: mean.to_string(),
        value: Some(mean),
    }));
    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CohortKey;

    fn record(term: &str, period: u32, total: f64, value: f64) -> CohortRecord {
        CohortRecord {
            date: CohortKey::Term(term.to_string()),
            period,
            total,
            value,
            cumulative_value: 0.0,
        }
    }

    fn two_cohorts() -> Vec<CohortRecord> {
        crate::data::accumulate(vec![
            record("A", 0, 100.0, 50.0),
            record("A", 1, 100.0, 30.0),
            record("A", 2, 100.0, 20.0),
            record("B", 0, 100.0, 40.0),
            record("B", 1, 100.0, 20.0),
            record("B", 2, 100.0, 10.0),
        ])
    }

    fn percent() -> ValueOptions {
        ValueOptions {
            percentual: true,
            ..ValueOptions::default()
        }
    }

    #[test]
    fn builds_the_reference_scenario() {
        let model = build_table(&two_cohorts(), percent(), ColorMode::None, None);

        let labels: Vec<&str> = model.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Total", "Term", "0", "1", "2"]);
        assert_eq!(model.rows.len(), 2);

        let a = &model.rows[0];
        assert_eq!(a.key, "A");
        assert_eq!(a.total, 100.0);
        let a_values: Vec<Option<f64>> = a.cells.iter().map(|c| c.value).collect();
        assert_eq!(a_values, vec![Some(50.0), Some(30.0), Some(20.0)]);

        let b = &model.rows[1];
        let b_values: Vec<Option<f64>> = b.cells.iter().map(|c| c.value).collect();
        assert_eq!(b_values, vec![Some(40.0), Some(20.0), Some(10.0)]);

        // Footer: placeholder, mean of means, then per-period means.
        assert_eq!(model.footer.len(), 5);
        assert_eq!(model.footer[0].label, "-");
        assert_eq!(model.footer[0].value, None);
        assert_eq!(model.footer[1].label, "Mean (28.33)");
        assert_eq!(model.footer[1].value, Some(28.33));
        assert_eq!(model.footer[2].value, Some(45.0));
        assert_eq!(model.footer[3].value, Some(25.0));
        assert_eq!(model.footer[4].value, Some(15.0));
    }

    #[test]
    fn cumulative_view_uses_running_sums() {
        let model = build_table(
            &two_cohorts(),
            ValueOptions {
                cumulative: true,
                percentual: true,
                ..ValueOptions::default()
            },
            ColorMode::None,
            None,
        );
        let a_values: Vec<Option<f64>> = model.rows[0].cells.iter().map(|c| c.value).collect();
        assert_eq!(a_values, vec![Some(50.0), Some(80.0), Some(100.0)]);
        let b_values: Vec<Option<f64>> = model.rows[1].cells.iter().map(|c| c.value).collect();
        assert_eq!(b_values, vec![Some(40.0), Some(60.0), Some(70.0)]);
    }

    #[test]
    fn period_columns_sort_ascending_regardless_of_input_order() {
        let records = crate::data::accumulate(vec![
            record("A", 12, 100.0, 5.0),
            record("A", 0, 100.0, 50.0),
            record("B", 3, 100.0, 25.0),
            record("A", 3, 100.0, 30.0),
        ]);
        let model = build_table(&records, ValueOptions::default(), ColorMode::None, None);
        let periods: Vec<u32> = model.columns.iter().filter_map(|c| c.period).collect();
        assert_eq!(periods, vec![0, 3, 12]);
    }

    #[test]
    fn missing_periods_leave_empty_cells() {
        let records = crate::data::accumulate(vec![
            record("A", 0, 100.0, 50.0),
            record("A", 2, 100.0, 20.0),
            record("B", 0, 100.0, 40.0),
            record("B", 1, 100.0, 30.0),
        ]);
        let model = build_table(&records, ValueOptions::default(), ColorMode::None, None);

        let a: Vec<Option<f64>> = model.rows[0].cells.iter().map(|c| c.value).collect();
        assert_eq!(a, vec![Some(50.0), None, Some(20.0)]);
        let b: Vec<Option<f64>> = model.rows[1].cells.iter().map(|c| c.value).collect();
        assert_eq!(b, vec![Some(40.0), Some(30.0), None]);
    }

    #[test]
    fn row_total_carries_over_from_the_last_matched_period() {
        // Totals differ across periods within the cohort; the displayed
        // total is the last one matched scanning periods left to right.
        let records = crate::data::accumulate(vec![
            record("A", 0, 100.0, 50.0),
            record("A", 1, 90.0, 30.0),
        ]);
        let model = build_table(&records, ValueOptions::default(), ColorMode::None, None);
        assert_eq!(model.rows[0].total, 90.0);

        // A trailing unmatched period does not reset the carried total.
        let records = crate::data::accumulate(vec![
            record("A", 0, 100.0, 50.0),
            record("B", 1, 70.0, 30.0),
        ]);
        let model = build_table(&records, ValueOptions::default(), ColorMode::None, None);
        assert_eq!(model.rows[0].total, 100.0);
        assert_eq!(model.rows[1].total, 70.0);
    }

    #[test]
    fn zero_total_surfaces_nan_in_the_cell() {
        let records = crate::data::accumulate(vec![
            record("A", 0, 0.0, 50.0),
            record("B", 0, 100.0, 40.0),
        ]);
        let model = build_table(&records, percent(), ColorMode::Heatmap, None);

        let cell = &model.rows[0].cells[0];
        assert!(cell.value.unwrap().is_nan());
        assert!(cell.color.is_none());

        // The finite cohort still gets colored.
        assert!(model.rows[1].cells[0].color.is_some());
    }

    #[test]
    fn heatmap_colors_span_the_whole_dataset() {
        let model = build_table(&two_cohorts(), percent(), ColorMode::Heatmap, None);
        // Dataset extent is [10, 50]: B's period-2 cell is the red end,
        // A's period-0 cell the green end.
        assert_eq!(
            model.rows[1].cells[2].color.as_deref(),
            Some("#ff4e61")
        );
        assert_eq!(
            model.rows[0].cells[0].color.as_deref(),
            Some("#32c77c")
        );
        // A's period-1 value (30) sits exactly at the domain midpoint.
        assert_eq!(
            model.rows[0].cells[1].color.as_deref(),
            Some("#ffef7d")
        );
    }

    #[test]
    fn above_average_colors_compare_per_column() {
        let model = build_table(&two_cohorts(), percent(), ColorMode::AboveAverage, None);
        // Period 0: A=50 > mean 45 → green; B=40 < 45 → red.
        assert_eq!(model.rows[0].cells[0].color.as_deref(), Some("#32c77c"));
        assert_eq!(model.rows[1].cells[0].color.as_deref(), Some("#ff4e61"));
    }

    #[test]
    fn date_axis_labels_and_groups_by_bucket() {
        use chrono::{TimeZone, Utc};
        let date = |day: u32| {
            CohortKey::Date(Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap())
        };
        let records = crate::data::accumulate(vec![
            CohortRecord {
                date: date(5),
                period: 0,
                total: 10.0,
                value: 5.0,
                cumulative_value: 0.0,
            },
            CohortRecord {
                date: date(12),
                period: 0,
                total: 20.0,
                value: 8.0,
                cumulative_value: 0.0,
            },
        ]);
        let model = build_table(
            &records,
            ValueOptions::default(),
            ColorMode::None,
            Some(Interval::Day),
        );
        assert_eq!(model.columns[1].label, "Date");
        assert_eq!(model.rows[0].key, "2026/01/05");
        assert_eq!(model.rows[1].key, "2026/01/12");
    }
}
