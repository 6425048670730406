//! Declarative page layout
//!
//! The page is a tree of [`Component`]s. The same tree yields the HTML
//! document and the initial value of every control property, which is what
//! the controller runs its initial-mount callbacks against.

use serde_json::{json, Value};
use std::fmt::Write;

use crate::controller::{PropRef, PropertyMap, Update};

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Div {
        id: Option<String>,
        class: Option<String>,
        children: Vec<Component>,
    },
    Text(String),
    Span {
        id: Option<String>,
        text: String,
    },
    Link {
        href: String,
        label: String,
        class: Option<String>,
    },
    Dropdown {
        id: String,
        /// (label, value)
        options: Vec<(String, String)>,
        value: String,
    },
    Slider {
        id: String,
        min: u32,
        max: u32,
        step: u32,
        value: u32,
        marks: Vec<u32>,
    },
    Button {
        id: String,
        label: String,
        n_clicks: u64,
    },
    Graph {
        id: String,
    },
    /// Target of the server-pushed clock ticks
    Interval {
        id: String,
    },
}

/// Escape text for HTML element content and attribute values
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn div(class: &str, children: Vec<Component>) -> Component {
    Component::Div {
        id: None,
        class: Some(class.to_string()),
        children,
    }
}

impl Component {
    /// Initial value of every control property in the tree
    pub fn initial_values(&self) -> PropertyMap {
        let mut values = PropertyMap::new();
        self.collect_values(&mut values);
        values
    }

    fn collect_values(&self, values: &mut PropertyMap) {
        match self {
            Component::Div { children, .. } => {
                for child in children {
                    child.collect_values(values);
                }
            }
            Component::Dropdown { id, value, .. } => {
                values.insert(PropRef::new(id, "value"), json!(value));
            }
            Component::Slider { id, value, .. } => {
                values.insert(PropRef::new(id, "value"), json!(value));
            }
            Component::Button { id, n_clicks, .. } => {
                values.insert(PropRef::new(id, "n_clicks"), json!(n_clicks));
            }
            Component::Interval { id, .. } => {
                values.insert(PropRef::new(id, "n_intervals"), json!(0));
            }
            Component::Text(_) | Component::Span { .. } | Component::Link { .. } | Component::Graph { .. } => {}
        }
    }

    /// Render to HTML, filling output regions from `outputs`.
    ///
    /// `children` outputs are HTML produced by callbacks; `figure` outputs
    /// carry their drawing under the `svg` key.
    pub fn render(&self, outputs: &[Update]) -> String {
        let mut out = String::new();
        self.render_into(&mut out, outputs);
        out
    }

    fn render_into(&self, out: &mut String, outputs: &[Update]) {
        let output = |id: &str, property: &str| find_output(outputs, id, property);

        match self {
            Component::Div { id, class, children } => {
                out.push_str("<div");
                push_attr(out, "id", id.as_deref());
                push_attr(out, "class", class.as_deref());
                out.push('>');
                match id.as_deref().and_then(|id| output(id, "children")) {
                    Some(html) => out.push_str(html.as_str().unwrap_or_default()),
                    None => {
                        for child in children {
                            child.render_into(out, outputs);
                        }
                    }
                }
                out.push_str("</div>");
            }
            Component::Text(text) => out.push_str(&escape(text)),
            Component::Span { id, text } => {
                out.push_str("<span");
                push_attr(out, "id", id.as_deref());
                out.push('>');
                match id.as_deref().and_then(|id| output(id, "children")) {
                    Some(html) => out.push_str(html.as_str().unwrap_or_default()),
                    None => out.push_str(&escape(text)),
                }
                out.push_str("</span>");
            }
            Component::Link { href, label, class } => {
                out.push_str("<a");
                push_attr(out, "href", Some(href.as_str()));
                push_attr(out, "class", class.as_deref());
                let _ = write!(out, ">{}</a>", escape(label));
            }
            Component::Dropdown { id, options, value } => {
                let _ = write!(
                    out,
                    r#"<select id="{id}" class="dropdown" data-prop="{id}.value">"#,
                    id = escape(id)
                );
                for (label, option) in options {
                    let selected = if option == value { " selected" } else { "" };
                    let _ = write!(
                        out,
                        r#"<option value="{}"{}>{}</option>"#,
                        escape(option),
                        selected,
                        escape(label)
                    );
                }
                out.push_str("</select>");
            }
            Component::Slider {
                id,
                min,
                max,
                step,
                value,
                marks,
            } => {
                let id = escape(id);
                let _ = write!(
                    out,
                    r#"<div class="slider"><input type="range" id="{id}" data-prop="{id}.value" min="{min}" max="{max}" step="{step}" value="{value}" list="{id}-marks"><datalist id="{id}-marks">"#
                );
                for mark in marks {
                    let _ = write!(out, r#"<option value="{mark}" label="{mark}"></option>"#);
                }
                let _ = write!(out, r#"</datalist><output for="{id}">{value}</output></div>"#);
            }
            Component::Button { id, label, n_clicks } => {
                let _ = write!(
                    out,
                    r#"<button id="{id}" class="btn" data-prop="{id}.n_clicks" data-n-clicks="{n_clicks}">{label}</button>"#,
                    id = escape(id),
                    label = escape(label)
                );
            }
            Component::Graph { id } => {
                let _ = write!(out, r#"<div id="{}" class="graph">"#, escape(id));
                if let Some(figure) = output(id.as_str(), "figure") {
                    out.push_str(figure["svg"].as_str().unwrap_or_default());
                }
                out.push_str("</div>");
            }
            Component::Interval { id } => {
                let _ = write!(out, r#"<div id="{}" class="interval" hidden></div>"#, escape(id));
            }
        }
    }
}

fn find_output<'a>(outputs: &'a [Update], id: &str, property: &str) -> Option<&'a Value> {
    outputs
        .iter()
        .find(|u| u.target.component == id && u.target.property == property)
        .map(|u| &u.value)
}

fn push_attr(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        let _ = write!(out, r#" {}="{}""#, name, escape(value));
    }
}
