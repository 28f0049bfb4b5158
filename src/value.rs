use crate::models::CohortRecord;

/// Round to 2 decimal places, matching the display precision used
/// throughout the table footer and chart tooltips.
pub fn round(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// How a record's metric is extracted: raw or cumulative base, optionally
/// expressed as a percentage of the cohort total (or its inverse).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueOptions {
    pub cumulative: bool,
    pub percentual: bool,
    pub inverse: bool,
}

impl ValueOptions {
    /// Applies the configured extraction to one record.
    ///
    /// When `percentual` is false the base value is returned as-is and
    /// `inverse` has no effect; this asymmetry is kept for compatibility
    /// with the established configuration surface. A zero `total` makes the
    /// percentage NaN, which is deliberately left to propagate.
    pub fn apply(&self, record: &CohortRecord) -> f64 {
        let base = if self.cumulative {
            record.cumulative_value
        } else {
            record.value
        };

        if !self.percentual {
            return base;
        }

        // A percentage over a zero total is undefined; surface it as NaN
        // (plain division would give an infinity for a nonzero base).
        if record.total == 0.0 {
            return f64::NAN;
        }

        if self.inverse {
            round(100.0 - base / record.total * 100.0)
        } else {
            round(base / record.total * 100.0)
        }
    }
}

/// Min/max over the finite values of an iterator. Non-finite entries (a NaN
/// percentage from a zero total) are skipped, the way d3's extent skips
/// undefined values. `None` when nothing finite remains.
pub fn finite_extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut extent: Option<(f64, f64)> = None;
    for v in values.filter(|v| v.is_finite()) {
        extent = Some(match extent {
            None => (v, v),
            Some((min, max)) => (min.min(v), max.max(v)),
        });
    }
    extent
}

/// Mean over the finite values of an iterator, `None` when empty.
pub fn finite_mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values.filter(|v| v.is_finite()) {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
