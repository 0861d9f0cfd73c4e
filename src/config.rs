use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::style::{FlowStyle, GradientStyle, IngroupScope, IngroupStyle, SimpleStyle};

/// Scaling applied to every size before geometric use. Sqrt compensates
/// for area perception on wide diagrams; log10 tames heavy-tailed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightScale {
    #[default]
    Identity,
    Sqrt,
    Log10,
}

impl WeightScale {
    pub fn apply(self, weight: f32) -> f32 {
        match self {
            WeightScale::Identity => weight,
            WeightScale::Sqrt => weight.max(0.0).sqrt(),
            // Clamp to >= 1 so zero-mass entries stay degenerate instead
            // of going to -inf.
            WeightScale::Log10 => weight.max(1.0).log10(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Vertical gap between stacked node ports, in layout units.
    pub node_margin: f32,
    /// Horizontal port thickness, in step-axis units. A rendering hint;
    /// it never enters the vertical math.
    pub node_width: f32,
    pub scale: WeightScale,
    /// Tight stacking when true; otherwise every node reserves its
    /// maximum observed size at every step.
    pub compact: bool,
    /// Render the unallocated remainder of a node's own size as a
    /// stationary continuation.
    pub show_stationary_component: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_margin: 50.0,
            node_width: 0.02,
            scale: WeightScale::Identity,
            compact: true,
            show_stationary_component: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub credits: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
            padding: 40.0,
            credits: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    #[default]
    Simple,
    Ingroup,
    Gradient,
}

/// Declarative style selection for config files; `build` turns it into
/// the concrete policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StyleConfig {
    pub kind: StyleKind,
    /// Ingroup members or gradient ordering, depending on the kind.
    pub nodes: Vec<String>,
    pub scope: IngroupScope,
    pub node_color: Option<String>,
    pub edge_color: Option<String>,
    pub ingroup_color: Option<String>,
    pub outgroup_color: Option<String>,
}

impl StyleConfig {
    pub fn build(&self) -> FlowStyle {
        match self.kind {
            StyleKind::Simple => {
                let mut style = SimpleStyle::default();
                if let Some(color) = &self.node_color {
                    style.node_color = color.clone();
                }
                if let Some(color) = &self.edge_color {
                    style.edge_color = color.clone();
                }
                FlowStyle::Simple(style)
            }
            StyleKind::Ingroup => {
                let mut style = IngroupStyle::new(self.nodes.iter().cloned(), self.scope);
                if let Some(color) = &self.ingroup_color {
                    style.ingroup_color = color.clone();
                }
                if let Some(color) = &self.outgroup_color {
                    style.outgroup_color = color.clone();
                }
                FlowStyle::Ingroup(style)
            }
            StyleKind::Gradient => {
                let mut style = GradientStyle::new(self.nodes.clone());
                if let Some(color) = &self.outgroup_color {
                    style.outgroup_color = color.clone();
                }
                FlowStyle::Gradient(style)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutOptions,
    pub render: RenderConfig,
    pub style: StyleConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutOptionsFile {
    node_margin: Option<f32>,
    node_width: Option<f32>,
    scale: Option<WeightScale>,
    compact: Option<bool>,
    show_stationary_component: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
    credits: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StyleConfigFile {
    kind: Option<StyleKind>,
    nodes: Option<Vec<String>>,
    scope: Option<IngroupScope>,
    node_color: Option<String>,
    edge_color: Option<String>,
    ingroup_color: Option<String>,
    outgroup_color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutOptionsFile>,
    render: Option<RenderConfigFile>,
    style: Option<StyleConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let parsed: ConfigFile =
        serde_json::from_str(&contents).context("failed to parse config JSON")?;
    merge_config_file(&mut config, parsed);
    Ok(config)
}

fn merge_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_margin {
            config.layout.node_margin = v;
        }
        if let Some(v) = layout.node_width {
            config.layout.node_width = v;
        }
        if let Some(v) = layout.scale {
            config.layout.scale = v;
        }
        if let Some(v) = layout.compact {
            config.layout.compact = v;
        }
        if let Some(v) = layout.show_stationary_component {
            config.layout.show_stationary_component = v;
        }
    }
    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.padding {
            config.render.padding = v;
        }
        if let Some(v) = render.credits {
            config.render.credits = Some(v);
        }
    }
    if let Some(style) = parsed.style {
        if let Some(v) = style.kind {
            config.style.kind = v;
        }
        if let Some(v) = style.nodes {
            config.style.nodes = v;
        }
        if let Some(v) = style.scope {
            config.style.scope = v;
        }
        if let Some(v) = style.node_color {
            config.style.node_color = Some(v);
        }
        if let Some(v) = style.edge_color {
            config.style.edge_color = Some(v);
        }
        if let Some(v) = style.ingroup_color {
            config.style.ingroup_color = Some(v);
        }
        if let Some(v) = style.outgroup_color {
            config.style.outgroup_color = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = load_config(None).expect("defaults failed");
        assert_eq!(config.layout.node_margin, 50.0);
        assert_eq!(config.layout.node_width, 0.02);
        assert!(config.layout.compact);
        assert!(config.layout.show_stationary_component);
        assert_eq!(config.layout.scale, WeightScale::Identity);
        assert_eq!(config.render.width, 1600.0);
        assert_eq!(config.style.kind, StyleKind::Simple);
    }

    #[test]
    fn file_values_override_defaults() {
        let parsed: ConfigFile = serde_json::from_str(
            r#"{
                "layout": {"nodeMargin": 10.0, "compact": false, "scale": "sqrt"},
                "render": {"width": 800.0, "credits": "me"},
                "style": {"kind": "ingroup", "nodes": ["A"], "scope": "all"}
            }"#,
        )
        .expect("parse failed");
        let mut config = Config::default();
        merge_config_file(&mut config, parsed);

        assert_eq!(config.layout.node_margin, 10.0);
        assert!(!config.layout.compact);
        assert_eq!(config.layout.scale, WeightScale::Sqrt);
        // Untouched fields keep their defaults.
        assert!(config.layout.show_stationary_component);
        assert_eq!(config.render.width, 800.0);
        assert_eq!(config.render.height, 900.0);
        assert_eq!(config.render.credits.as_deref(), Some("me"));
        assert_eq!(config.style.kind, StyleKind::Ingroup);
        assert_eq!(config.style.scope, IngroupScope::AllFlow);

        match config.style.build() {
            FlowStyle::Ingroup(style) => assert!(style.nodes.contains("A")),
            other => panic!("expected ingroup style, got {other:?}"),
        }
    }

    #[test]
    fn style_overrides_reach_the_built_policy() {
        let config = StyleConfig {
            kind: StyleKind::Simple,
            node_color: Some("#112233".to_string()),
            ..Default::default()
        };
        match config.build() {
            FlowStyle::Simple(style) => {
                assert_eq!(style.node_color, "#112233");
                // Edge color untouched by the node override.
                assert_eq!(style.edge_color, "#75A8EB");
            }
            other => panic!("expected simple style, got {other:?}"),
        }
    }

    #[test]
    fn weight_scales_are_monotonic_and_safe_at_zero() {
        assert_eq!(WeightScale::Identity.apply(7.0), 7.0);
        assert_eq!(WeightScale::Sqrt.apply(100.0), 10.0);
        assert_eq!(WeightScale::Sqrt.apply(0.0), 0.0);
        assert_eq!(WeightScale::Log10.apply(1000.0), 3.0);
        assert_eq!(WeightScale::Log10.apply(0.0), 0.0);
    }
}
