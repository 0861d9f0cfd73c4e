use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LayoutOptions;
use crate::data::FlowDataSource;

/// Horizontal room left after the last step for end-of-line decorations.
const TRAILING_X_MARGIN: f32 = 0.3;

/// Tolerance when checking whether outgoing flows overstate a node's size.
const SIZE_EPSILON: f32 = 1e-3;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),
    #[error("duplicate step: {0}")]
    DuplicateStep(String),
    #[error("flow {node1} -> {node2} references unknown step {step}")]
    UnknownStep {
        step: String,
        node1: String,
        node2: String,
    },
    #[error("flow {node1} -> {node2} spans non-adjacent steps {step1} -> {step2}")]
    NonAdjacentFlow {
        step1: String,
        node1: String,
        step2: String,
        node2: String,
    },
}

/// Vertical extent of one node's port at one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortExtent {
    pub y1: f32,
    pub y2: f32,
}

impl PortExtent {
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One flow band between a pair of ports across a step transition.
///
/// The centers stay `None` when the matching endpoint node has no sequence
/// entry at that step; such a band carries a size but cannot be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowBand {
    pub size: f32,
    pub source_y: Option<f32>,
    pub target_y: Option<f32>,
}

/// Computed alluvial diagram geometry.
///
/// The whole layout is derived eagerly at construction and is read-only
/// afterwards. Heights are proportional to (scaled) sizes: an outgoing
/// port is exactly as tall as its outgoing flows plus the stationary
/// remainder when that component is shown.
#[derive(Debug, Clone)]
pub struct FlowLayout {
    nodes: Vec<String>,
    steps: Vec<String>,
    node_index: HashMap<String, usize>,
    step_index: HashMap<String, usize>,
    // Flat composite keys: (step, node) for ports, (step1, node1, node2)
    // for bands. Incoming ports are keyed by the second step of the
    // transition that produced them.
    out_ports: HashMap<(usize, usize), PortExtent>,
    in_ports: HashMap<(usize, usize), PortExtent>,
    bands: HashMap<(usize, usize, usize), FlowBand>,
    node_margin: f32,
    node_width: f32,
    compact: bool,
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
}

impl FlowLayout {
    pub fn new(data: &dyn FlowDataSource, options: &LayoutOptions) -> Result<Self, LayoutError> {
        let scale = options.scale;
        Self::with_scale(data, options, move |weight| scale.apply(weight))
    }

    /// Builds the layout with an arbitrary scaling function applied to
    /// every size before geometric use. The function must be pure; it is
    /// applied once per input entry at ingestion.
    pub fn with_scale<F>(
        data: &dyn FlowDataSource,
        options: &LayoutOptions,
        scale: F,
    ) -> Result<Self, LayoutError>
    where
        F: Fn(f32) -> f32,
    {
        let nodes = data.nodes();
        let steps = data.steps();

        let mut node_index = HashMap::with_capacity(nodes.len());
        for (idx, name) in nodes.iter().enumerate() {
            if node_index.insert(name.clone(), idx).is_some() {
                return Err(LayoutError::DuplicateNode(name.clone()));
            }
        }
        let mut step_index = HashMap::with_capacity(steps.len());
        for (idx, step) in steps.iter().enumerate() {
            if step_index.insert(step.clone(), idx).is_some() {
                return Err(LayoutError::DuplicateStep(step.clone()));
            }
        }

        // (step, node) -> scaled size. Entries naming nodes outside the
        // node list are dropped here; the passes below only ever look up
        // names from the list, so they could never be reached anyway.
        let mut sizes: HashMap<(usize, usize), f32> = HashMap::new();
        for (key, size) in data.sequence() {
            let (Some(&si), Some(&ni)) = (step_index.get(&key.step), node_index.get(&key.node))
            else {
                continue;
            };
            sizes.insert((si, ni), scale(size));
        }

        // (step1, node1, node2) -> band. step2 is implied by adjacency;
        // a flow naming any other step pair violates the input contract.
        let mut bands: HashMap<(usize, usize, usize), FlowBand> = HashMap::new();
        for (key, size) in data.flows() {
            let Some(&s1) = step_index.get(&key.step1) else {
                return Err(LayoutError::UnknownStep {
                    step: key.step1,
                    node1: key.node1,
                    node2: key.node2,
                });
            };
            let Some(&s2) = step_index.get(&key.step2) else {
                return Err(LayoutError::UnknownStep {
                    step: key.step2,
                    node1: key.node1,
                    node2: key.node2,
                });
            };
            if s2 != s1 + 1 {
                return Err(LayoutError::NonAdjacentFlow {
                    step1: key.step1,
                    node1: key.node1,
                    step2: key.step2,
                    node2: key.node2,
                });
            }
            let (Some(&n1), Some(&n2)) = (node_index.get(&key.node1), node_index.get(&key.node2))
            else {
                continue;
            };
            bands.insert(
                (s1, n1, n2),
                FlowBand {
                    size: scale(size),
                    source_y: None,
                    target_y: None,
                },
            );
        }

        let mut overstated = 0usize;
        for s1 in 0..steps.len().saturating_sub(1) {
            for n1 in 0..nodes.len() {
                let Some(&node_size) = sizes.get(&(s1, n1)) else {
                    continue;
                };
                let total: f32 = (0..nodes.len())
                    .filter_map(|n2| bands.get(&(s1, n1, n2)).map(|band| band.size))
                    .sum();
                if total - node_size > SIZE_EPSILON {
                    overstated += 1;
                }
            }
        }
        if overstated > 0 {
            warn!(
                ports = overstated,
                "outgoing flows exceed node sizes; stationary remainders will be negative"
            );
        }

        // In non-compact mode every node reserves its maximum observed
        // size at every step, so columns keep a constant footprint.
        let mut node_max = vec![0.0f32; nodes.len()];
        if !options.compact {
            for si in 0..steps.len() {
                for ni in 0..nodes.len() {
                    if let Some(&size) = sizes.get(&(si, ni)) {
                        node_max[ni] = node_max[ni].max(size);
                    }
                }
            }
        }

        let min_x = 0.0;
        let max_x = steps.len() as f32 - 1.0 + TRAILING_X_MARGIN;
        let min_y = 0.0;
        let mut max_y = 0.0f32;

        let mut out_ports = HashMap::new();
        let mut in_ports = HashMap::new();

        // Visitation order is the contract: step pairs in increasing order,
        // nodes in list order. Running offsets (and float rounding) depend
        // on it.
        for s1 in 0..steps.len().saturating_sub(1) {
            let s2 = s1 + 1;

            let mut pos = min_y;
            for n1 in 0..nodes.len() {
                let y1 = pos;
                if let Some(&node_size) = sizes.get(&(s1, n1)) {
                    let mut allocated = 0.0f32;
                    for n2 in 0..nodes.len() {
                        if let Some(band) = bands.get_mut(&(s1, n1, n2)) {
                            band.source_y = Some(pos + band.size / 2.0);
                            allocated += band.size;
                            pos += band.size;
                        }
                    }
                    if options.show_stationary_component {
                        // Unallocated remainder; negative when the caller's
                        // flows overstate the node. Not clamped.
                        pos += node_size - allocated;
                    }
                }
                out_ports.insert((s1, n1), PortExtent { y1, y2: pos });
                if !options.compact {
                    pos = y1 + node_max[n1];
                }
                pos += options.node_margin;
            }
            max_y = max_y.max(pos);

            let mut pos = min_y;
            for n2 in 0..nodes.len() {
                let y1 = pos;
                if let Some(&node_size) = sizes.get(&(s2, n2)) {
                    let mut allocated = 0.0f32;
                    for n1 in 0..nodes.len() {
                        if let Some(band) = bands.get_mut(&(s1, n1, n2)) {
                            band.target_y = Some(pos + band.size / 2.0);
                            allocated += band.size;
                            pos += band.size;
                        }
                    }
                    if options.show_stationary_component {
                        pos += node_size - allocated;
                    }
                }
                in_ports.insert((s2, n2), PortExtent { y1, y2: pos });
                if !options.compact {
                    pos = y1 + node_max[n2];
                }
                pos += options.node_margin;
            }
            max_y = max_y.max(pos);
        }

        debug!(
            nodes = nodes.len(),
            steps = steps.len(),
            bands = bands.len(),
            max_y,
            "computed alluvial layout"
        );

        Ok(Self {
            nodes,
            steps,
            node_index,
            step_index,
            out_ports,
            in_ports,
            bands,
            node_margin: options.node_margin,
            node_width: options.node_width,
            compact: options.compact,
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Horizontal position of a step: its index on the step axis.
    pub fn step_x(&self, step: &str) -> Option<f32> {
        self.step_index.get(step).map(|&idx| idx as f32)
    }

    /// Outgoing (left) port extent of a node at a step. Present for every
    /// node at every step except the last.
    pub fn outgoing(&self, step: &str, node: &str) -> Option<PortExtent> {
        let key = (*self.step_index.get(step)?, *self.node_index.get(node)?);
        self.out_ports.get(&key).copied()
    }

    /// Incoming (right) port extent of a node at a step. Present for every
    /// node at every step except the first.
    pub fn incoming(&self, step: &str, node: &str) -> Option<PortExtent> {
        let key = (*self.step_index.get(step)?, *self.node_index.get(node)?);
        self.in_ports.get(&key).copied()
    }

    /// Band for the flow leaving `node1` at `step1` towards `node2` at the
    /// following step. `None` when no such flow was supplied.
    pub fn band(&self, step1: &str, node1: &str, node2: &str) -> Option<&FlowBand> {
        let key = (
            *self.step_index.get(step1)?,
            *self.node_index.get(node1)?,
            *self.node_index.get(node2)?,
        );
        self.bands.get(&key)
    }

    pub fn node_margin(&self) -> f32 {
        self.node_margin
    }

    pub fn node_width(&self) -> f32 {
        self.node_width
    }

    pub fn compact(&self) -> bool {
        self.compact
    }

    pub fn min_x(&self) -> f32 {
        self.min_x
    }

    pub fn max_x(&self) -> f32 {
        self.max_x
    }

    pub fn min_y(&self) -> f32 {
        self.min_y
    }

    pub fn max_y(&self) -> f32 {
        self.max_y
    }
}
