use log::debug;

use crate::color;
use crate::format::Interval;
use crate::models::{ChartModel, ChartPoint, CohortRecord, LegendEntry, Series, Tooltip};
use crate::table::grouped;
use crate::value::{self, round, ValueOptions};

/// Builds the multi-series line-chart description: one series per cohort
/// group, palette colors assigned in series order, and a legend entry per
/// series.
pub fn build_chart(
    records: &[CohortRecord],
    options: ValueOptions,
    interval: Option<Interval>,
) -> ChartModel {
    let x_min = records.iter().map(|record| record.period).min().unwrap_or(0);
    let x_max = records.iter().map(|record| record.period).max().unwrap_or(0);
    let x_domain = [x_min, x_max];

    let y_max = value::finite_extent(records.iter().map(|record| options.apply(record)))
        .map(|(_, max)| max)
        .unwrap_or(0.0);

    let series: Vec<Series> = grouped(records, interval)
        .into_iter()
        .enumerate()
        .map(|(index, (key, group))| {
            let points = group
                .iter()
                .map(|record| {
                    let metric = options.apply(record);
                    ChartPoint {
                        period: record.period,
                        value: Some(metric),
                        tooltip: Tooltip {
                            label: key.clone(),
                            period: record.period,
                            value: Some(round(metric)),
                        },
                    }
                })
                .collect();
            Series {
                key,
                color: color::series_color(index),
                points,
            }
        })
        .collect();

    let legend = series
        .iter()
        .map(|entry| LegendEntry {
            label: entry.key.clone(),
            color: entry.color.clone(),
        })
        .collect();

    debug!("built chart model: {} series", series.len());
    ChartModel {
        x_domain,
        y_domain: [0.0, y_max],
        y_label: if options.percentual { "%" } else { "Total" }.to_string(),
        series,
        legend,
    }
}
