//! Filter & aggregate over the dataset

use serde::Serialize;

use crate::dataset::Record;

/// Rows of one species, in dataset order
pub fn filter<'a>(records: &'a [Record], species: &str) -> Vec<&'a Record> {
    records.iter().filter(|r| r.species == species).collect()
}

/// Round half away from zero to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summary of a filtered subset.
///
/// An empty subset has no min/max/mean; it reports `NoData` instead of NaN
/// or infinities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatsSummary {
    Values {
        min_length: f64,
        max_length: f64,
        avg_width: f64,
    },
    NoData,
}

impl StatsSummary {
    pub fn compute(subset: &[&Record]) -> Self {
        if subset.is_empty() {
            return StatsSummary::NoData;
        }

        let (mut min, mut max, mut width_sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for r in subset {
            min = min.min(r.sepal_length);
            max = max.max(r.sepal_length);
            width_sum += r.sepal_width;
        }

        StatsSummary::Values {
            min_length: round2(min),
            max_length: round2(max),
            avg_width: round2(width_sum / subset.len() as f64),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StatsSummary::NoData)
    }
}
