use std::path::Path;

use anyhow::Result;

use crate::config::RenderConfig;
use crate::layout::FlowLayout;
use crate::style::FlowStyle;

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const FONT_SIZE: f32 = 13.0;
const LEGEND_SWATCH: f32 = 10.0;
const LEGEND_LINE: f32 = 18.0;

/// Maps layout coordinates (y grows upward) onto the SVG canvas
/// (y grows downward).
struct Viewport {
    origin_x: f32,
    origin_y: f32,
    scale_x: f32,
    scale_y: f32,
    pad: f32,
    height: f32,
}

impl Viewport {
    fn new(layout: &FlowLayout, config: &RenderConfig) -> Self {
        let span_x = (layout.max_x() - layout.min_x()).max(1.0);
        let span_y = (layout.max_y() - layout.min_y()).max(1.0);
        let inner_w = (config.width - 2.0 * config.padding).max(1.0);
        let inner_h = (config.height - 2.0 * config.padding).max(1.0);
        Self {
            origin_x: layout.min_x(),
            origin_y: layout.min_y(),
            scale_x: inner_w / span_x,
            scale_y: inner_h / span_y,
            pad: config.padding,
            height: config.height,
        }
    }

    fn x(&self, x: f32) -> f32 {
        self.pad + (x - self.origin_x) * self.scale_x
    }

    fn y(&self, y: f32) -> f32 {
        self.height - self.pad - (y - self.origin_y) * self.scale_y
    }

    fn len_x(&self, len: f32) -> f32 {
        len * self.scale_x
    }

    fn len_y(&self, len: f32) -> f32 {
        len * self.scale_y
    }
}

pub fn render_svg(layout: &FlowLayout, style: &FlowStyle, config: &RenderConfig) -> String {
    let viewport = Viewport::new(layout, config);
    let width = config.width;
    let height = config.height;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        style.background()
    ));

    // Bands first, ports on top, each group sorted by z-order. The sort is
    // stable, so ties keep step/node visitation order.
    let mut band_shapes = band_shapes(layout, style, &viewport);
    band_shapes.sort_by_key(|(zorder, _)| *zorder);
    for (_, shape) in band_shapes {
        svg.push_str(&shape);
    }

    let mut port_shapes = port_shapes(layout, style, &viewport);
    port_shapes.sort_by_key(|(zorder, _)| *zorder);
    for (_, shape) in port_shapes {
        svg.push_str(&shape);
    }

    push_step_labels(&mut svg, layout, style, &viewport);
    if style.show_legend() {
        push_legend(&mut svg, layout, style, config);
    }
    if let Some(credits) = &config.credits {
        push_credits(&mut svg, layout, style, &viewport, credits);
    }

    svg.push_str("</svg>");
    svg
}

fn band_shapes(layout: &FlowLayout, style: &FlowStyle, viewport: &Viewport) -> Vec<(i32, String)> {
    let mut shapes = Vec::new();
    // Bands start and end half a port width inside the column.
    let inset = layout.node_width() / 2.0;
    for pair in layout.steps().windows(2) {
        let (step1, step2) = (&pair[0], &pair[1]);
        let (Some(x1), Some(x2)) = (layout.step_x(step1), layout.step_x(step2)) else {
            continue;
        };
        for node1 in layout.nodes() {
            for node2 in layout.nodes() {
                let Some(band) = layout.band(step1, node1, node2) else {
                    continue;
                };
                let (Some(source_y), Some(target_y)) = (band.source_y, band.target_y) else {
                    continue;
                };
                let stroke = viewport.len_y(band.size);
                if stroke <= 0.0 {
                    continue;
                }
                let px1 = viewport.x(x1 + inset);
                let py1 = viewport.y(source_y);
                let px2 = viewport.x(x2 - inset);
                let py2 = viewport.y(target_y);
                let mid = (px2 - px1) * style.curve();
                let color = style.edge_color(step1, node1, step2, node2);
                let alpha = style.edge_alpha(step1, node1, step2, node2);
                let zorder = style.edge_zorder(step1, node1, step2, node2);
                shapes.push((
                    zorder,
                    format!(
                        "<path d=\"M {px1:.2} {py1:.2} C {:.2} {py1:.2}, {:.2} {py2:.2}, {px2:.2} {py2:.2}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{stroke:.2}\" stroke-opacity=\"{alpha}\"/>",
                        px1 + mid,
                        px2 - mid,
                    ),
                ));
            }
        }
    }
    shapes
}

fn port_shapes(layout: &FlowLayout, style: &FlowStyle, viewport: &Viewport) -> Vec<(i32, String)> {
    let mut shapes = Vec::new();
    let half_width = layout.node_width() / 2.0;
    for step in layout.steps() {
        let Some(x) = layout.step_x(step) else {
            continue;
        };
        for node in layout.nodes() {
            // Outgoing port sits just right of the column line, incoming
            // just left, so interior steps show both halves back to back.
            for (extent, center_dx) in [
                (layout.outgoing(step, node), half_width),
                (layout.incoming(step, node), -half_width),
            ] {
                let Some(extent) = extent else {
                    continue;
                };
                if extent.height() <= 0.0 {
                    continue;
                }
                let left = viewport.x(x + center_dx - half_width);
                let top = viewport.y(extent.y2);
                let rect_w = viewport.len_x(layout.node_width());
                let rect_h = viewport.len_y(extent.height());
                shapes.push((
                    style.node_zorder(node),
                    format!(
                        "<rect x=\"{left:.2}\" y=\"{top:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" fill=\"{}\" fill-opacity=\"{}\"/>",
                        style.node_color(node),
                        style.node_alpha(node),
                    ),
                ));
            }
        }
    }
    shapes
}

fn push_step_labels(svg: &mut String, layout: &FlowLayout, style: &FlowStyle, viewport: &Viewport) {
    let baseline = viewport.y(layout.min_y()) + FONT_SIZE * 0.5;
    for step in layout.steps() {
        let Some(x) = layout.step_x(step) else {
            continue;
        };
        let px = viewport.x(x);
        svg.push_str(&format!(
            "<text x=\"{px:.2}\" y=\"{baseline:.2}\" transform=\"rotate(-90 {px:.2} {baseline:.2})\" text-anchor=\"end\" font-family=\"{FONT_FAMILY}\" font-size=\"{FONT_SIZE}\" fill=\"{}\">{}</text>",
            style.text_color(),
            escape_xml(step),
        ));
    }
}

fn push_legend(svg: &mut String, layout: &FlowLayout, style: &FlowStyle, config: &RenderConfig) {
    let x = config.width - config.padding - 120.0;
    let mut y = config.padding + LEGEND_LINE;
    for node in layout.nodes().iter().rev() {
        let color = style.node_color(node);
        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{:.2}\" width=\"{LEGEND_SWATCH}\" height=\"{LEGEND_SWATCH}\" fill=\"{color}\"/>",
            y - LEGEND_SWATCH,
        ));
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{y:.2}\" font-family=\"{FONT_FAMILY}\" font-size=\"{FONT_SIZE}\" fill=\"{color}\">{}</text>",
            x + LEGEND_SWATCH + 6.0,
            escape_xml(node),
        ));
        y += LEGEND_LINE;
    }
}

fn push_credits(
    svg: &mut String,
    layout: &FlowLayout,
    style: &FlowStyle,
    viewport: &Viewport,
    credits: &str,
) {
    let Some(last_step) = layout.steps().last() else {
        return;
    };
    let Some(step_x) = layout.step_x(last_step) else {
        return;
    };
    // Compact layouts leave room above the last column; fixed layouts
    // leave it to the right.
    let (x, y) = if layout.compact() {
        let top = layout
            .nodes()
            .last()
            .and_then(|node| layout.incoming(last_step, node))
            .map(|extent| extent.y2)
            .unwrap_or(layout.min_y());
        (
            viewport.x(step_x),
            viewport.y(top + layout.node_margin()),
        )
    } else {
        (viewport.x(step_x + 0.2), viewport.y(layout.min_y()))
    };
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" transform=\"rotate(-90 {x:.2} {y:.2})\" text-anchor=\"start\" font-family=\"{FONT_FAMILY}\" font-size=\"{FONT_SIZE}\" fill=\"{}\">{}</text>",
        style.text_color(),
        escape_xml(credits),
    ));
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Helvetica".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .unwrap_or(usvg::Size::from_wh(800.0, 600.0).unwrap());

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutOptions;
    use crate::data::FlowDataset;
    use crate::layout::FlowLayout;

    fn sample_layout() -> FlowLayout {
        let mut data = FlowDataset::new(
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string(), "2".to_string()],
        );
        data.set_size("1", "A", 10.0);
        data.set_size("1", "B", 5.0);
        data.set_size("2", "A", 6.0);
        data.set_size("2", "B", 9.0);
        data.set_flow("1", "A", "2", "A", 6.0);
        data.set_flow("1", "A", "2", "B", 4.0);
        data.set_flow("1", "B", "2", "B", 5.0);
        FlowLayout::new(&data, &LayoutOptions::default()).expect("layout failed")
    }

    #[test]
    fn render_svg_basic() {
        let layout = sample_layout();
        let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        // One cubic path per drawable band.
        assert_eq!(svg.matches("<path").count(), 3);
        // Two outgoing ports at step 1, two incoming at step 2, plus the
        // background and legend swatches.
        assert_eq!(svg.matches("<rect").count(), 1 + 4 + 2);
    }

    #[test]
    fn legend_can_be_disabled() {
        let layout = sample_layout();
        let style = crate::style::SimpleStyle {
            show_legend: false,
            ..Default::default()
        };
        let svg = render_svg(&layout, &FlowStyle::Simple(style), &RenderConfig::default());
        assert!(!svg.contains(">A</text>"));
        assert_eq!(svg.matches("<rect").count(), 1 + 4);
    }

    #[test]
    fn credits_are_rendered_when_configured() {
        let layout = sample_layout();
        let config = RenderConfig {
            credits: Some("drawn by hand".to_string()),
            ..Default::default()
        };
        let svg = render_svg(&layout, &FlowStyle::default(), &config);
        assert!(svg.contains("drawn by hand"));
    }

    #[test]
    fn node_names_are_escaped() {
        let mut data = FlowDataset::new(
            vec!["R&D".to_string()],
            vec!["1".to_string(), "2".to_string()],
        );
        data.set_size("1", "R&D", 3.0);
        data.set_size("2", "R&D", 3.0);
        data.set_flow("1", "R&D", "2", "R&D", 3.0);
        let layout = FlowLayout::new(&data, &LayoutOptions::default()).expect("layout failed");
        let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
        assert!(svg.contains("R&amp;D"));
        assert!(!svg.contains(">R&D<"));
    }

    #[test]
    fn empty_layout_still_renders_a_document() {
        let data = FlowDataset::new(Vec::new(), Vec::new());
        let layout = FlowLayout::new(&data, &LayoutOptions::default()).expect("layout failed");
        let svg = render_svg(&layout, &FlowStyle::default(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 0);
    }
}
