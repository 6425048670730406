//! Dashboard wiring - the page layout and its two callbacks
//!
//! `update-plot` recomputes the scatter figure and the stats block from the
//! species, marker size and shuffle click count. `tick` recomputes the clock
//! text. Both read only their declared inputs.

use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::chart::{build_chart, build_stats, title_case, ChartSpec, StatsFragment};
use crate::clock::format_time;
use crate::config::{Config, ConfigError, PointSizeConfig};
use crate::controller::{
    Callback, CallbackError, Controller, DispatchError, PropRef, PropertyMap, RegistrationError, Update,
};
use crate::dataset::{Dataset, Record};
use crate::layout::{div, escape, Component};
use crate::palette::{Palette, PaletteCycle};
use crate::stats::filter;
use crate::svg;

pub const SPECIES: &str = "species";
pub const POINT_SIZE: &str = "point-size";
pub const SHUFFLE: &str = "shuffle";
pub const SCATTER: &str = "scatter";
pub const STATS: &str = "stats";
pub const TIME: &str = "time";
pub const TICK: &str = "tick";

/// Values of the user-facing controls for one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub species: String,
    pub point_size: u32,
    pub clicks: u64,
}

impl ControlState {
    pub fn to_inputs(&self) -> PropertyMap {
        PropertyMap::from([
            (PropRef::new(SPECIES, "value"), json!(self.species)),
            (PropRef::new(POINT_SIZE, "value"), json!(self.point_size)),
            (PropRef::new(SHUFFLE, "n_clicks"), json!(self.clicks)),
        ])
    }
}

/// Everything the plot callback derives from one control state
#[derive(Debug, Clone, PartialEq)]
pub struct PlotView {
    pub chart: ChartSpec,
    pub svg: String,
    pub stats: StatsFragment,
}

/// Filter, pick the palette for `clicks`, and render.
pub fn plot_view(records: &[Record], palettes: &Arc<[Palette]>, state: &ControlState) -> PlotView {
    let subset = filter(records, &state.species);
    let cycle = PaletteCycle::at(palettes.clone(), state.clicks);
    let chart = build_chart(&subset, state.point_size, cycle.current(), &state.species);
    let svg = svg::render(&chart);
    PlotView {
        chart,
        svg,
        stats: build_stats(&subset),
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

pub struct Dashboard {
    config: Arc<Config>,
    dataset: Dataset,
    palettes: Arc<[Palette]>,
    layout: Component,
    controller: Controller,
}

impl Dashboard {
    pub fn new(config: Config, dataset: Dataset) -> Result<Self, DashboardError> {
        Self::build(config, dataset, Vec::new())
    }

    /// Dashboard with extra callbacks registered after the built-in ones
    #[cfg(test)]
    pub fn with_callbacks(config: Config, dataset: Dataset, extra: Vec<Callback>) -> Result<Self, DashboardError> {
        Self::build(config, dataset, extra)
    }

    fn build(config: Config, dataset: Dataset, extra: Vec<Callback>) -> Result<Self, DashboardError> {
        config.validate()?;
        let config = Arc::new(config);
        let palettes: Arc<[Palette]> = config.palettes.iter().cloned().map(Palette::from).collect();
        let layout = build_layout(&config, &dataset);

        let mut controller = Controller::new();
        controller.register(plot_callback(dataset.clone(), palettes.clone(), config.point_size))?;
        controller.register(tick_callback())?;
        for callback in extra {
            controller.register(callback)?;
        }

        tracing::info!(
            "Dashboard ready: {} records, {} palettes, {} callbacks",
            dataset.len(),
            palettes.len(),
            controller.callbacks().len()
        );

        Ok(Self {
            config,
            dataset,
            palettes,
            layout,
            controller,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn palettes(&self) -> &Arc<[Palette]> {
        &self.palettes
    }

    /// Control state the page opens with
    pub fn default_state(&self) -> ControlState {
        ControlState {
            species: self.dataset.species().into_iter().next().unwrap_or_default(),
            point_size: self.config.point_size.default,
            clicks: 0,
        }
    }

    pub fn update(&self, changed: &[PropRef], values: &PropertyMap) -> Result<Vec<Update>, DispatchError> {
        self.controller.dispatch(changed, values)
    }

    /// Clock text for the n-th tick
    pub fn tick(&self, n: u64) -> Result<Option<String>, DispatchError> {
        let tick = PropRef::new(TICK, "n_intervals");
        let values = PropertyMap::from([(tick.clone(), json!(n))]);
        let updates = self.controller.dispatch(&[tick], &values)?;
        Ok(updates
            .into_iter()
            .find(|u| u.target.component == TIME)
            .and_then(|u| u.value.as_str().map(str::to_string)))
    }

    /// Full HTML document with initial-mount outputs filled in
    pub fn page(&self) -> Result<String, DispatchError> {
        let outputs = self.controller.initial(&self.layout.initial_values())?;
        let title = escape(&self.config.app_name);
        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="/assets/style.css">
</head>
<body>
{body}
<script src="/assets/app.js"></script>
</body>
</html>
"#,
            body = self.layout.render(&outputs)
        ))
    }
}

fn build_layout(config: &Config, dataset: &Dataset) -> Component {
    let species = dataset.species();
    let selected = species.first().cloned().unwrap_or_default();
    let ps = config.point_size;
    let marks = (ps.min..=ps.max)
        .filter(|v| (v - ps.min) % 5 == 0 || *v == ps.max)
        .collect();

    div(
        "app-container",
        vec![
            div(
                "header",
                vec![
                    div("logo", vec![Component::Text(format!("🎨 {}", config.app_name))]),
                    div("subtitle", vec![Component::Text(config.subtitle.clone())]),
                ],
            ),
            div(
                "controls",
                vec![
                    Component::Dropdown {
                        id: SPECIES.to_string(),
                        options: species.iter().map(|s| (title_case(s), s.clone())).collect(),
                        value: selected,
                    },
                    Component::Slider {
                        id: POINT_SIZE.to_string(),
                        min: ps.min,
                        max: ps.max,
                        step: ps.step,
                        value: ps.default,
                        marks,
                    },
                    Component::Button {
                        id: SHUFFLE.to_string(),
                        label: "Shuffle Palette".to_string(),
                        n_clicks: 0,
                    },
                ],
            ),
            div(
                "content",
                vec![
                    Component::Graph {
                        id: SCATTER.to_string(),
                    },
                    Component::Div {
                        id: Some(STATS.to_string()),
                        class: Some("stats".to_string()),
                        children: vec![],
                    },
                ],
            ),
            div(
                "footer",
                vec![
                    Component::Span {
                        id: Some(TIME.to_string()),
                        text: String::new(),
                    },
                    Component::Span {
                        id: None,
                        text: " · ".to_string(),
                    },
                    Component::Link {
                        href: "/healthz".to_string(),
                        label: "Health".to_string(),
                        class: Some("health-link".to_string()),
                    },
                ],
            ),
            Component::Interval { id: TICK.to_string() },
        ],
    )
}

fn plot_callback(dataset: Dataset, palettes: Arc<[Palette]>, bounds: PointSizeConfig) -> Callback {
    Callback::new(
        "update-plot",
        vec![
            PropRef::new(SPECIES, "value"),
            PropRef::new(POINT_SIZE, "value"),
            PropRef::new(SHUFFLE, "n_clicks"),
        ],
        vec![PropRef::new(SCATTER, "figure"), PropRef::new(STATS, "children")],
        move |args| {
            let state = ControlState {
                species: decode_species(&args[0]),
                point_size: decode_point_size(&args[1], &bounds)?,
                clicks: decode_clicks(&args[2])?,
            };
            let view = plot_view(&dataset, &palettes, &state);
            let spec = serde_json::to_value(&view.chart).map_err(|e| CallbackError::Failed(e.to_string()))?;
            Ok(vec![
                json!({ "spec": spec, "svg": view.svg }),
                Value::String(view.stats.to_html()),
            ])
        },
    )
}

fn tick_callback() -> Callback {
    Callback::new(
        "tick",
        vec![PropRef::new(TICK, "n_intervals")],
        vec![PropRef::new(TIME, "children")],
        |_| Ok(vec![Value::String(format_time(Utc::now()))]),
    )
}

/// A missing or non-text selection filters to nothing
fn decode_species(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// Clamp into the slider range before anything is rendered
fn decode_point_size(value: &Value, bounds: &PointSizeConfig) -> Result<u32, CallbackError> {
    let size = value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        .ok_or_else(|| CallbackError::InvalidInput {
            input: PropRef::new(POINT_SIZE, "value"),
            reason: format!("expected a number, got {}", value),
        })?;
    Ok(bounds.clamp(size))
}

/// Buttons report no clicks as null before the first press
fn decode_clicks(value: &Value) -> Result<u64, CallbackError> {
    match value {
        Value::Null => Ok(0),
        v => v.as_u64().ok_or_else(|| CallbackError::InvalidInput {
            input: PropRef::new(SHUFFLE, "n_clicks"),
            reason: format!("expected a non-negative integer, got {}", v),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard() -> Dashboard {
        Dashboard::new(Config::default(), Dataset::iris().unwrap()).unwrap()
    }

    fn figure(updates: &[Update]) -> &Value {
        &updates
            .iter()
            .find(|u| u.target == PropRef::new(SCATTER, "figure"))
            .unwrap()
            .value
    }

    fn stats_html(updates: &[Update]) -> &str {
        updates
            .iter()
            .find(|u| u.target == PropRef::new(STATS, "children"))
            .unwrap()
            .value
            .as_str()
            .unwrap()
    }

    #[test]
    fn test_default_state() {
        let d = dashboard();
        assert_eq!(
            d.default_state(),
            ControlState {
                species: "setosa".into(),
                point_size: 10,
                clicks: 0
            }
        );
    }

    #[test]
    fn test_setosa_first_load() {
        let d = dashboard();
        let state = d.default_state();
        let updates = d.update(&[PropRef::new(SPECIES, "value")], &state.to_inputs()).unwrap();
        assert_eq!(updates.len(), 2);

        let fig = figure(&updates);
        assert_eq!(fig["spec"]["title"], "Sepal Length vs Width — Setosa");
        assert_eq!(fig["spec"]["marker_size"], 10);
        assert_eq!(fig["spec"]["color_map"][0][1], "#4F46E5");
        assert!(fig["svg"].as_str().unwrap().starts_with("<svg"));
        assert!(stats_html(&updates).contains("4.30"));
        assert!(stats_html(&updates).contains("3.43"));
    }

    #[test]
    fn test_four_clicks_picks_second_palette() {
        let d = dashboard();
        let state = ControlState {
            species: "setosa".into(),
            point_size: 10,
            clicks: 4,
        };
        let view = plot_view(d.dataset(), d.palettes(), &state);
        assert_eq!(view.chart.color_map[0].1, d.palettes()[1].color(0));
    }

    #[test]
    fn test_point_size_clamped_at_control_layer() {
        let d = dashboard();
        let mut values = d.default_state().to_inputs();
        values.insert(PropRef::new(POINT_SIZE, "value"), json!(99));
        let updates = d.update(&[PropRef::new(POINT_SIZE, "value")], &values).unwrap();
        assert_eq!(figure(&updates)["spec"]["marker_size"], 20);

        values.insert(PropRef::new(POINT_SIZE, "value"), json!(2.6));
        let updates = d.update(&[PropRef::new(POINT_SIZE, "value")], &values).unwrap();
        assert_eq!(figure(&updates)["spec"]["marker_size"], 5);
    }

    #[test]
    fn test_bad_point_size_is_callback_error() {
        let d = dashboard();
        let mut values = d.default_state().to_inputs();
        values.insert(PropRef::new(POINT_SIZE, "value"), json!("big"));
        let err = d.update(&[PropRef::new(POINT_SIZE, "value")], &values).unwrap_err();
        assert_eq!(err.callback, "update-plot");
        assert!(matches!(err.source, CallbackError::InvalidInput { .. }));
    }

    #[test]
    fn test_unknown_or_null_species_is_no_data() {
        let d = dashboard();
        for species in [json!("rosa"), Value::Null] {
            let mut values = d.default_state().to_inputs();
            values.insert(PropRef::new(SPECIES, "value"), species);
            let updates = d.update(&[PropRef::new(SPECIES, "value")], &values).unwrap();
            assert!(stats_html(&updates).contains("no data"));
            assert_eq!(figure(&updates)["spec"]["series"], json!([]));
        }
    }

    #[test]
    fn test_null_clicks_is_zero() {
        assert_eq!(decode_clicks(&Value::Null).unwrap(), 0);
        assert_eq!(decode_clicks(&json!(7)).unwrap(), 7);
        assert!(decode_clicks(&json!(-1)).is_err());
    }

    #[test]
    fn test_tick_only_touches_time() {
        let d = dashboard();
        let text = d.tick(3).unwrap().unwrap();
        assert!(text.ends_with(" UTC"));
    }

    #[test]
    fn test_page_contains_initial_outputs() {
        let d = dashboard();
        let html = d.page().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>ColorSplash</title>"));
        assert!(html.contains(r#"<option value="setosa" selected>Setosa</option>"#));
        assert!(html.contains("Sepal Length vs Width — Setosa"));
        assert!(html.contains("<b> 5.80</b>"));
        assert!(html.contains(r#"href="/healthz""#));
        assert!(html.contains(r#"<div id="tick" class="interval" hidden></div>"#));
    }

    #[test]
    fn test_empty_palettes_rejected() {
        let config = Config {
            palettes: vec![],
            ..Config::default()
        };
        let err = Dashboard::new(config, Dataset::iris().unwrap()).err().unwrap();
        assert!(matches!(err, DashboardError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_extra_callback_clashing_output_rejected() {
        let clash = Callback::new(
            "clash",
            vec![PropRef::new("x", "value")],
            vec![PropRef::new(TIME, "children")],
            |_| Ok(vec![Value::Null]),
        );
        let err = Dashboard::with_callbacks(Config::default(), Dataset::iris().unwrap(), vec![clash])
            .err()
            .unwrap();
        assert!(matches!(err, DashboardError::Registration(RegistrationError::DuplicateOutput { .. })));
    }

    #[test]
    fn test_slider_marks() {
        let d = dashboard();
        let marks = match &d.layout {
            Component::Div { children, .. } => children
                .iter()
                .find_map(|c| match c {
                    Component::Div { children, .. } => children.iter().find_map(|c| match c {
                        Component::Slider { marks, .. } => Some(marks.clone()),
                        _ => None,
                    }),
                    _ => None,
                }),
            _ => None,
        };
        assert_eq!(marks, Some(vec![5, 10, 15, 20]));
    }
}
