use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// YlOrRd ramp stops, light to dark, used by the gradient policy.
static GRADIENT_STOPS: Lazy<Vec<[u8; 3]>> = Lazy::new(|| {
    [
        "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c", "#bd0026",
        "#800026",
    ]
    .iter()
    .map(|hex| parse_hex(hex))
    .collect()
});

fn parse_hex(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let channel = |range| u8::from_str_radix(hex.get(range).unwrap_or("0"), 16).unwrap_or(0);
    [channel(0..2), channel(2..4), channel(4..6)]
}

fn sample_gradient(t: f32) -> String {
    let stops = &*GRADIENT_STOPS;
    let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f32;
    let idx = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - idx as f32;
    let (a, b) = (stops[idx], stops[idx + 1]);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(a[0], b[0]),
        mix(a[1], b[1]),
        mix(a[2], b[2])
    )
}

/// Which flow endpoints must belong to the ingroup for an edge to be
/// highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IngroupScope {
    /// Only a node's flow to itself, and only for ingroup nodes.
    #[default]
    #[serde(rename = "self")]
    SelfFlow,
    /// Flows arriving at an ingroup node.
    #[serde(rename = "in")]
    InFlow,
    /// Flows leaving an ingroup node.
    #[serde(rename = "out")]
    OutFlow,
    /// Flows touching an ingroup node on either end.
    #[serde(rename = "all")]
    AllFlow,
}

/// One color for every node and band.
#[derive(Debug, Clone)]
pub struct SimpleStyle {
    pub node_color: String,
    pub node_alpha: f32,
    pub edge_color: String,
    pub edge_alpha: f32,
    pub curve: f32,
    pub background: String,
    pub text_color: String,
    pub show_legend: bool,
}

impl Default for SimpleStyle {
    fn default() -> Self {
        Self {
            node_color: "#75A8EB".to_string(),
            node_alpha: 1.0,
            edge_color: "#75A8EB".to_string(),
            edge_alpha: 0.6,
            curve: 0.4,
            background: "white".to_string(),
            text_color: "black".to_string(),
            show_legend: true,
        }
    }
}

/// Highlight a set of nodes and (per scope) their flows; grey out the rest.
#[derive(Debug, Clone)]
pub struct IngroupStyle {
    pub nodes: HashSet<String>,
    pub scope: IngroupScope,
    pub ingroup_color: String,
    pub ingroup_zorder: i32,
    pub outgroup_color: String,
    pub outgroup_zorder: i32,
    pub node_alpha: f32,
    pub edge_alpha: f32,
    pub curve: f32,
    pub background: String,
    pub text_color: String,
    pub show_legend: bool,
}

impl IngroupStyle {
    pub fn new(nodes: impl IntoIterator<Item = String>, scope: IngroupScope) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            scope,
            ingroup_color: "#75A8EB".to_string(),
            ingroup_zorder: 1,
            outgroup_color: "#cccccc".to_string(),
            outgroup_zorder: 0,
            node_alpha: 1.0,
            edge_alpha: 0.9,
            curve: 0.4,
            background: "white".to_string(),
            text_color: "black".to_string(),
            show_legend: true,
        }
    }

    fn edge_in_group(&self, node1: &str, node2: &str) -> bool {
        match self.scope {
            IngroupScope::SelfFlow => node1 == node2 && self.nodes.contains(node1),
            IngroupScope::InFlow => self.nodes.contains(node2),
            IngroupScope::OutFlow => self.nodes.contains(node1),
            IngroupScope::AllFlow => self.nodes.contains(node1) || self.nodes.contains(node2),
        }
    }
}

/// Spread the listed nodes over a color ramp; bands take the color of
/// their destination node. Unlisted nodes fall back to the outgroup color.
#[derive(Debug, Clone)]
pub struct GradientStyle {
    node_t: HashMap<String, f32>,
    pub ingroup_zorder: i32,
    pub outgroup_color: String,
    pub outgroup_zorder: i32,
    pub node_alpha: f32,
    pub edge_alpha: f32,
    pub curve: f32,
    pub background: String,
    pub text_color: String,
    pub show_legend: bool,
}

impl GradientStyle {
    pub fn new(nodes: Vec<String>) -> Self {
        let count = nodes.len();
        let mut node_t = HashMap::with_capacity(count);
        for (idx, node) in nodes.into_iter().enumerate() {
            let t = if count > 1 {
                idx as f32 / (count - 1) as f32
            } else {
                0.0
            };
            node_t.insert(node, t);
        }
        Self {
            node_t,
            ingroup_zorder: 10,
            outgroup_color: "#666666".to_string(),
            outgroup_zorder: 1,
            node_alpha: 1.0,
            edge_alpha: 0.8,
            curve: 0.4,
            background: "#181820".to_string(),
            text_color: "#999999".to_string(),
            show_legend: true,
        }
    }

    fn ramp_color(&self, node: &str) -> Option<String> {
        self.node_t.get(node).map(|&t| sample_gradient(t))
    }
}

/// Closed set of coloring policies behind one capability surface. The
/// layout engine never calls into this; only the renderer does.
#[derive(Debug, Clone)]
pub enum FlowStyle {
    Simple(SimpleStyle),
    Ingroup(IngroupStyle),
    Gradient(GradientStyle),
}

impl Default for FlowStyle {
    fn default() -> Self {
        FlowStyle::Simple(SimpleStyle::default())
    }
}

impl FlowStyle {
    pub fn node_color(&self, node: &str) -> String {
        match self {
            FlowStyle::Simple(style) => style.node_color.clone(),
            FlowStyle::Ingroup(style) => {
                if style.nodes.contains(node) {
                    style.ingroup_color.clone()
                } else {
                    style.outgroup_color.clone()
                }
            }
            FlowStyle::Gradient(style) => style
                .ramp_color(node)
                .unwrap_or_else(|| style.outgroup_color.clone()),
        }
    }

    pub fn node_alpha(&self, _node: &str) -> f32 {
        match self {
            FlowStyle::Simple(style) => style.node_alpha,
            FlowStyle::Ingroup(style) => style.node_alpha,
            FlowStyle::Gradient(style) => style.node_alpha,
        }
    }

    pub fn node_zorder(&self, node: &str) -> i32 {
        match self {
            FlowStyle::Simple(_) => 0,
            FlowStyle::Ingroup(style) => {
                if style.nodes.contains(node) {
                    style.ingroup_zorder
                } else {
                    style.outgroup_zorder
                }
            }
            FlowStyle::Gradient(style) => {
                if style.node_t.contains_key(node) {
                    style.ingroup_zorder
                } else {
                    style.outgroup_zorder
                }
            }
        }
    }

    pub fn edge_color(&self, _step1: &str, node1: &str, _step2: &str, node2: &str) -> String {
        match self {
            FlowStyle::Simple(style) => style.edge_color.clone(),
            FlowStyle::Ingroup(style) => {
                if style.edge_in_group(node1, node2) {
                    style.ingroup_color.clone()
                } else {
                    style.outgroup_color.clone()
                }
            }
            FlowStyle::Gradient(style) => style
                .ramp_color(node2)
                .unwrap_or_else(|| style.outgroup_color.clone()),
        }
    }

    pub fn edge_alpha(&self, _step1: &str, _node1: &str, _step2: &str, _node2: &str) -> f32 {
        match self {
            FlowStyle::Simple(style) => style.edge_alpha,
            FlowStyle::Ingroup(style) => style.edge_alpha,
            FlowStyle::Gradient(style) => style.edge_alpha,
        }
    }

    pub fn edge_zorder(&self, _step1: &str, node1: &str, _step2: &str, node2: &str) -> i32 {
        match self {
            FlowStyle::Simple(_) => 0,
            FlowStyle::Ingroup(style) => {
                if style.edge_in_group(node1, node2) {
                    style.ingroup_zorder
                } else {
                    style.outgroup_zorder
                }
            }
            FlowStyle::Gradient(style) => {
                if style.node_t.contains_key(node2) {
                    style.ingroup_zorder
                } else {
                    style.outgroup_zorder
                }
            }
        }
    }

    /// Band curvature: 0 draws straight ribbons, larger values bend harder
    /// around the midpoint.
    pub fn curve(&self) -> f32 {
        match self {
            FlowStyle::Simple(style) => style.curve,
            FlowStyle::Ingroup(style) => style.curve,
            FlowStyle::Gradient(style) => style.curve,
        }
    }

    pub fn background(&self) -> &str {
        match self {
            FlowStyle::Simple(style) => &style.background,
            FlowStyle::Ingroup(style) => &style.background,
            FlowStyle::Gradient(style) => &style.background,
        }
    }

    pub fn text_color(&self) -> &str {
        match self {
            FlowStyle::Simple(style) => &style.text_color,
            FlowStyle::Ingroup(style) => &style.text_color,
            FlowStyle::Gradient(style) => &style.text_color,
        }
    }

    pub fn show_legend(&self) -> bool {
        match self {
            FlowStyle::Simple(style) => style.show_legend,
            FlowStyle::Ingroup(style) => style.show_legend,
            FlowStyle::Gradient(style) => style.show_legend,
        }
    }
}
