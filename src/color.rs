use crate::models::{CohortRecord, ColumnStatistics};
use crate::value::{self, ValueOptions};

const RED: (u8, u8, u8) = (0xff, 0x4e, 0x61);
const YELLOW: (u8, u8, u8) = (0xff, 0xef, 0x7d);
const GREEN: (u8, u8, u8) = (0x32, 0xc7, 0x7c);

/// Categorical palette for chart series, assigned in series order.
pub const SERIES_PALETTE: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728",
    "#ff9896", "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2",
    "#7f7f7f", "#c7c7c7", "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

pub fn series_color(index: usize) -> String {
    SERIES_PALETTE[index % SERIES_PALETTE.len()].to_string()
}

/// Table cell coloring mode. Unrecognized configuration values resolve to
/// `None` so a bad option degrades to an uncolored table instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Heatmap,
    Mean,
    AboveAverage,
    None,
}

impl ColorMode {
    pub fn parse(mode: &str) -> ColorMode {
        match mode {
            "heatmap" => ColorMode::Heatmap,
            "mean" => ColorMode::Mean,
            "aboveAverage" => ColorMode::AboveAverage,
            _ => ColorMode::None,
        }
    }
}

/// Value-to-color mapping, resolved once per render. The heatmap mode fixes
/// its domain over the whole dataset up front; the per-column modes consult
/// the column statistics passed at lookup time.
#[derive(Debug, Clone)]
pub struct ColorScale {
    mode: ColorMode,
    /// [min, midpoint, max] of the metric over all records; heatmap only.
    heatmap_domain: Option<[f64; 3]>,
}

impl ColorScale {
    pub fn new(mode: ColorMode, records: &[CohortRecord], options: ValueOptions) -> ColorScale {
        let heatmap_domain = match mode {
            ColorMode::Heatmap => {
                value::finite_extent(records.iter().map(|r| options.apply(r)))
                    .map(|(min, max)| [min, (min + max) / 2.0, max])
            }
            _ => None,
        };
        ColorScale {
            mode,
            heatmap_domain,
        }
    }

    /// Color for one cell value, or `None` when the mode is uncolored or the
    /// value is NaN (an undefined percentage never gets a heat color).
    pub fn color(&self, value: f64, column: &ColumnStatistics) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        match self.mode {
            ColorMode::Heatmap => {
                let [min, mid, max] = self.heatmap_domain?;
                Some(ramp(value, min, mid, max))
            }
            ColorMode::Mean => {
                let mid = column.mean;
                Some(ramp(value, column.min, mid, column.max))
            }
            ColorMode::AboveAverage => {
                if value > column.mean {
                    Some(hex(GREEN))
                } else if value == column.mean {
                    Some(hex(YELLOW))
                } else {
                    Some(hex(RED))
                }
            }
            ColorMode::None => None,
        }
    }
}

/// Two-segment linear ramp over [min, mid, max] → [red, yellow, green],
/// matching a three-stop gradient. Values are clamped to the domain; a
/// collapsed domain maps everything to the middle stop.
fn ramp(value: f64, min: f64, mid: f64, max: f64) -> String {
    if min == max {
        return hex(YELLOW);
    }
    if value <= min {
        return hex(RED);
    }
    if value >= max {
        return hex(GREEN);
    }
    if value <= mid {
        if mid == min {
            return hex(YELLOW);
        }
        hex(lerp(RED, YELLOW, (value - min) / (mid - min)))
    } else {
        if max == mid {
            return hex(YELLOW);
        }
        hex(lerp(YELLOW, GREEN, (value - mid) / (max - mid)))
    }
}

fn lerp(from: (u8, u8, u8), to: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    (
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

fn hex(color: (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}
