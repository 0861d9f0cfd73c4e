use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::load_config;
use crate::data::FlowDataset;
use crate::layout::FlowLayout;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_svg};

#[derive(Parser, Debug)]
#[command(name = "alluv", version, about = "Alluvial flow diagram renderer")]
pub struct Args {
    /// Input dataset (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (layout options, style, canvas)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height in pixels
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Write the computed geometry as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let dataset = FlowDataset::from_json_str(&input)?;
    let layout = FlowLayout::new(&dataset, &config.layout)?;

    if let Some(path) = &args.dump_layout {
        write_layout_dump(&layout, path)?;
    }

    let style = config.style.build();
    let svg = render_svg(&layout, &style, &config.render);
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => write_png_output(&svg, &args.output, &config.render)?,
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for png output"))
}

#[cfg(feature = "png")]
fn write_png_output(
    svg: &str,
    output: &Option<PathBuf>,
    render_cfg: &crate::config::RenderConfig,
) -> Result<()> {
    let output = ensure_output(output)?;
    crate::render::write_output_png(svg, &output, render_cfg)
}

#[cfg(not(feature = "png"))]
fn write_png_output(
    _svg: &str,
    output: &Option<PathBuf>,
    _render_cfg: &crate::config::RenderConfig,
) -> Result<()> {
    let _ = ensure_output(output)?;
    Err(anyhow::anyhow!(
        "PNG output requires building with the 'png' feature"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn png_requires_an_output_path() {
        assert!(ensure_output(&None).is_err());
        let path = ensure_output(&Some(PathBuf::from("out.png"))).expect("path expected");
        assert_eq!(path, PathBuf::from("out.png"));
    }

    #[test]
    fn end_to_end_from_dataset_string() {
        let input = r#"{
            "nodes": ["A", "B"],
            "steps": ["1", "2"],
            "sequence": [
                {"step": "1", "node": "A", "size": 10.0},
                {"step": "2", "node": "B", "size": 10.0}
            ],
            "flows": [
                {"step1": "1", "node1": "A", "step2": "2", "node2": "B", "size": 10.0}
            ]
        }"#;
        let config = load_config(None).expect("defaults failed");
        let dataset = FlowDataset::from_json_str(input).expect("parse failed");
        let layout = FlowLayout::new(&dataset, &config.layout).expect("layout failed");
        let svg = render_svg(&layout, &config.style.build(), &config.render);
        assert!(svg.contains("<path"));
    }
}
