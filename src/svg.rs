//! SVG renderer for [`ChartSpec`]
//!
//! Draws the scatter server-side so the page needs no charting library.

use std::fmt::Write;

use crate::chart::ChartSpec;
use crate::layout::escape;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 420.0;
const TICKS: usize = 5;

const BACKGROUND: &str = "#111111";
const GRID: &str = "#283442";
const TEXT: &str = "#f2f5fa";

/// Data range of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    lo: f64,
    hi: f64,
}

impl Extent {
    /// Bounds over `values`, padded by 5% (or ±0.5 for a single value)
    fn padded(values: impl Iterator<Item = f64>) -> Option<Self> {
        let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        Some(Extent {
            lo: lo - pad,
            hi: hi + pad,
        })
    }

    fn scale(&self, v: f64, from: f64, to: f64) -> f64 {
        from + (v - self.lo) / (self.hi - self.lo) * (to - from)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..TICKS).map(move |i| self.lo + (self.hi - self.lo) * i as f64 / (TICKS - 1) as f64)
    }
}

/// Render a chart as a standalone SVG element
pub fn render(chart: &ChartSpec) -> String {
    let m = &chart.margin;
    // room for tick labels
    let left = f64::from(m.l.max(56));
    let right = WIDTH - f64::from(m.r);
    let top = f64::from(m.t);
    let bottom = HEIGHT - f64::from(m.b.max(48));

    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" class="chart">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        out,
        r#"<rect width="{}" height="{}" fill="{}"/>"#,
        WIDTH, HEIGHT, BACKGROUND
    );
    let _ = write!(
        out,
        r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="17">{}</text>"#,
        left,
        top / 2.0 + 6.0,
        TEXT,
        escape(&chart.title)
    );

    let points = || chart.series.iter().flat_map(|s| s.points.iter());
    let (xs, ys) = match (
        Extent::padded(points().map(|p| p[0])),
        Extent::padded(points().map(|p| p[1])),
    ) {
        (Some(xs), Some(ys)) => (xs, ys),
        _ => {
            let _ = write!(
                out,
                r#"<text x="{:.1}" y="{:.1}" fill="{}" text-anchor="middle" class="no-data">No data</text></svg>"#,
                (left + right) / 2.0,
                (top + bottom) / 2.0,
                TEXT
            );
            return out;
        }
    };

    // grid + tick labels
    for t in xs.ticks() {
        let x = xs.scale(t, left, right);
        let _ = write!(
            out,
            r#"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="{GRID}"/><text x="{x:.1}" y="{:.1}" fill="{TEXT}" font-size="11" text-anchor="middle">{t:.1}</text>"#,
            bottom + 16.0
        );
    }
    for t in ys.ticks() {
        let y = ys.scale(t, bottom, top);
        let _ = write!(
            out,
            r#"<line x1="{left:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="{GRID}"/><text x="{:.1}" y="{:.1}" fill="{TEXT}" font-size="11" text-anchor="end">{t:.1}</text>"#,
            left - 6.0,
            y + 4.0
        );
    }

    // axis titles
    let _ = write!(
        out,
        r#"<text x="{:.1}" y="{:.1}" fill="{TEXT}" font-size="13" text-anchor="middle">{}</text>"#,
        (left + right) / 2.0,
        HEIGHT - 10.0,
        chart.x.label
    );
    let _ = write!(
        out,
        r#"<text x="14" y="{:.1}" fill="{TEXT}" font-size="13" text-anchor="middle" transform="rotate(-90 14 {:.1})">{}</text>"#,
        (top + bottom) / 2.0,
        (top + bottom) / 2.0,
        chart.y.label
    );

    let radius = f64::from(chart.marker_size) / 2.0;
    for series in &chart.series {
        let _ = write!(
            out,
            r#"<g class="series" data-name="{}" fill="{}" fill-opacity="0.85">"#,
            escape(&series.name),
            escape(&series.color)
        );
        for p in &series.points {
            let _ = write!(
                out,
                r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}"/>"#,
                xs.scale(p[0], left, right),
                ys.scale(p[1], bottom, top),
                radius
            );
        }
        out.push_str("</g>");
    }

    // legend
    for (i, (name, color)) in chart.color_map.iter().enumerate() {
        let y = top + 14.0 + 18.0 * i as f64;
        let _ = write!(
            out,
            r#"<circle cx="{:.1}" cy="{:.1}" r="5" fill="{}"/><text x="{:.1}" y="{:.1}" fill="{TEXT}" font-size="12">{}</text>"#,
            right - 90.0,
            y,
            escape(color),
            right - 80.0,
            y + 4.0,
            escape(name)
        );
    }

    out.push_str("</svg>");
    out
}
