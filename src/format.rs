use crate::models::CohortKey;

/// Date-histogram bucketing granularity, as reported by the query layer.
/// Selects both the display pattern and (through it) how rows group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Custom,
    Auto,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    /// Accepts the short codes emitted by the aggregation layer alongside
    /// spelled-out names. Unknown codes mean no date formatting is possible.
    pub fn parse(code: &str) -> Option<Interval> {
        match code {
            "custom" => Some(Interval::Custom),
            "auto" => Some(Interval::Auto),
            "ms" | "millisecond" => Some(Interval::Millisecond),
            "s" | "second" => Some(Interval::Second),
            "m" | "minute" => Some(Interval::Minute),
            "h" | "hour" => Some(Interval::Hour),
            "d" | "day" => Some(Interval::Day),
            "w" | "week" => Some(Interval::Week),
            "M" | "month" => Some(Interval::Month),
            "y" | "year" => Some(Interval::Year),
            _ => None,
        }
    }

    fn pattern(self) -> &'static str {
        match self {
            Interval::Custom | Interval::Auto | Interval::Second => "%Y/%m/%d %H:%M:%S",
            Interval::Millisecond => "%Y/%m/%d %H:%M:%S,%3f",
            Interval::Minute | Interval::Hour => "%Y/%m/%d %H:%M",
            Interval::Day | Interval::Week => "%Y/%m/%d",
            Interval::Month => "%Y/%m",
            Interval::Year => "%Y",
        }
    }
}

/// Renders a cohort key for row grouping, legends, and tooltips. Terms pass
/// through unchanged; instants format at the bucket granularity, so two
/// instants in the same bucket render (and group) identically.
pub fn format_key(key: &CohortKey, interval: Option<Interval>) -> String {
    match (key, interval) {
        (CohortKey::Date(date), Some(interval)) => {
            date.format(interval.pattern()).to_string()
        }
        (CohortKey::Date(date), None) => date.to_rfc3339(),
        (CohortKey::Term(term), _) => term.clone(),
    }
}
