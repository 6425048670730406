//! Render - pure functions from a filtered subset to chart and stats views
//!
//! Nothing here touches I/O or shared state. Identical inputs give
//! identical (==) outputs.

use serde::Serialize;

use crate::dataset::Record;
use crate::palette::Palette;
use crate::stats::StatsSummary;

pub const TEMPLATE: &str = "plotly_dark";

/// Binding of a record field to a chart axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub field: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

/// Points of one categorical value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    pub points: Vec<[f64; 2]>,
}

/// Declarative scatter chart, independent of how it is drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub template: &'static str,
    pub margin: Margin,
    pub x: Axis,
    pub y: Axis,
    pub marker_size: u32,
    /// Categorical value -> colour, in order of first appearance
    pub color_map: Vec<(String, String)>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

/// Python-style title case: first letter of each word upper, rest lower
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Scatter of sepal width (x) against sepal length (y), coloured by species.
///
/// `point_size` is trusted to be inside the slider range.
pub fn build_chart(subset: &[&Record], point_size: u32, palette: &Palette, species: &str) -> ChartSpec {
    let mut series: Vec<Series> = Vec::new();
    for record in subset {
        let idx = match series.iter().position(|s| s.name == record.species) {
            Some(idx) => idx,
            None => {
                series.push(Series {
                    name: record.species.clone(),
                    color: palette.color(series.len()).to_string(),
                    points: Vec::new(),
                });
                series.len() - 1
            }
        };
        series[idx].points.push([record.sepal_width, record.sepal_length]);
    }

    ChartSpec {
        title: format!("Sepal Length vs Width — {}", title_case(species)),
        template: TEMPLATE,
        margin: Margin { l: 40, r: 20, t: 60, b: 40 },
        x: Axis {
            field: "sepal_width",
            label: "Sepal Width",
        },
        y: Axis {
            field: "sepal_length",
            label: "Sepal Length",
        },
        marker_size: point_size,
        color_map: series
            .iter()
            .map(|s| (s.name.clone(), s.color.clone()))
            .collect(),
        series,
    }
}

/// One "label: value" line of the stats block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatLine {
    pub label: &'static str,
    pub value: String,
}

/// Display fragment for the stats region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsFragment {
    pub summary: StatsSummary,
    pub lines: Vec<StatLine>,
}

pub const NO_DATA: &str = "no data";

pub fn build_stats(subset: &[&Record]) -> StatsFragment {
    let summary = StatsSummary::compute(subset);
    let values = match summary {
        StatsSummary::Values {
            min_length,
            max_length,
            avg_width,
        } => [
            format!("{:.2}", min_length),
            format!("{:.2}", max_length),
            format!("{:.2}", avg_width),
        ],
        StatsSummary::NoData => [NO_DATA.to_string(), NO_DATA.to_string(), NO_DATA.to_string()],
    };
    let labels = ["Min Length:", "Max Length:", "Avg Width:"];

    StatsFragment {
        summary,
        lines: labels
            .into_iter()
            .zip(values)
            .map(|(label, value)| StatLine { label, value })
            .collect(),
    }
}

impl StatsFragment {
    /// HTML for the stats region
    pub fn to_html(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                format!(
                    "<div><span>{}</span><b> {}</b></div>",
                    crate::layout::escape(line.label),
                    crate::layout::escape(&line.value)
                )
            })
            .collect()
    }
}
