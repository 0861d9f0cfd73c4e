use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::layout::FlowLayout;

/// Flattened geometry snapshot for debugging and downstream tooling.
/// Entries follow the axis order, so dumps of the same dataset diff
/// cleanly.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub nodes: Vec<String>,
    pub steps: Vec<String>,
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    pub ports: Vec<PortDump>,
    pub bands: Vec<BandDump>,
}

#[derive(Debug, Serialize)]
pub struct PortDump {
    pub step: String,
    pub node: String,
    pub side: PortSide,
    pub y1: f32,
    pub y2: f32,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    Out,
    In,
}

#[derive(Debug, Serialize)]
pub struct BandDump {
    pub step1: String,
    pub node1: String,
    pub step2: String,
    pub node2: String,
    pub size: f32,
    pub source_y: Option<f32>,
    pub target_y: Option<f32>,
}

impl LayoutDump {
    pub fn from_layout(layout: &FlowLayout) -> Self {
        let mut ports = Vec::new();
        for step in layout.steps() {
            for node in layout.nodes() {
                if let Some(extent) = layout.outgoing(step, node) {
                    ports.push(PortDump {
                        step: step.clone(),
                        node: node.clone(),
                        side: PortSide::Out,
                        y1: extent.y1,
                        y2: extent.y2,
                    });
                }
                if let Some(extent) = layout.incoming(step, node) {
                    ports.push(PortDump {
                        step: step.clone(),
                        node: node.clone(),
                        side: PortSide::In,
                        y1: extent.y1,
                        y2: extent.y2,
                    });
                }
            }
        }

        let mut bands = Vec::new();
        for pair in layout.steps().windows(2) {
            for node1 in layout.nodes() {
                for node2 in layout.nodes() {
                    if let Some(band) = layout.band(&pair[0], node1, node2) {
                        bands.push(BandDump {
                            step1: pair[0].clone(),
                            node1: node1.clone(),
                            step2: pair[1].clone(),
                            node2: node2.clone(),
                            size: band.size,
                            source_y: band.source_y,
                            target_y: band.target_y,
                        });
                    }
                }
            }
        }

        Self {
            nodes: layout.nodes().to_vec(),
            steps: layout.steps().to_vec(),
            min_x: layout.min_x(),
            max_x: layout.max_x(),
            min_y: layout.min_y(),
            max_y: layout.max_y(),
            ports,
            bands,
        }
    }
}

pub fn write_layout_dump(layout: &FlowLayout, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &LayoutDump::from_layout(layout))?;
    Ok(())
}
