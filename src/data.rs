use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Composite key for one node's magnitude at one step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub step: String,
    pub node: String,
}

impl SequenceKey {
    pub fn new(step: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            node: node.into(),
        }
    }
}

/// Composite key for the volume moving from `node1` at `step1` to `node2`
/// at `step2`. `step2` must be the immediate successor of `step1` on the
/// step axis; the layout engine rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub step1: String,
    pub node1: String,
    pub step2: String,
    pub node2: String,
}

impl FlowKey {
    pub fn new(
        step1: impl Into<String>,
        node1: impl Into<String>,
        step2: impl Into<String>,
        node2: impl Into<String>,
    ) -> Self {
        Self {
            step1: step1.into(),
            node1: node1.into(),
            step2: step2.into(),
            node2: node2.into(),
        }
    }
}

/// Supplies the three inputs of an alluvial layout. Implementations hand
/// over immutable snapshots; the engine reads each accessor exactly once.
pub trait FlowDataSource {
    /// Ordered list of distinct node names. The order fixes the vertical
    /// stacking order at every step.
    fn nodes(&self) -> Vec<String>;

    /// Ordered, deduplicated step axis.
    fn steps(&self) -> Vec<String>;

    /// Per-(step, node) magnitudes. A missing entry means the node is
    /// absent at that step, not an error.
    fn sequence(&self) -> HashMap<SequenceKey, f32>;

    /// Per-transition volumes. A missing entry means zero flow.
    fn flows(&self) -> HashMap<FlowKey, f32>;
}

/// In-memory flow dataset, also the target of the JSON dataset format
/// read by the CLI.
#[derive(Debug, Clone, Default)]
pub struct FlowDataset {
    nodes: Vec<String>,
    steps: Vec<String>,
    sequence: HashMap<SequenceKey, f32>,
    flows: HashMap<FlowKey, f32>,
}

impl FlowDataset {
    pub fn new(nodes: Vec<String>, steps: Vec<String>) -> Self {
        Self {
            nodes,
            steps,
            ..Default::default()
        }
    }

    pub fn set_size(&mut self, step: &str, node: &str, size: f32) {
        self.sequence.insert(SequenceKey::new(step, node), size);
    }

    pub fn set_flow(&mut self, step1: &str, node1: &str, step2: &str, node2: &str, size: f32) {
        self.flows
            .insert(FlowKey::new(step1, node1, step2, node2), size);
    }

    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        let parsed: DatasetFile =
            serde_json::from_str(input).context("failed to parse flow dataset JSON")?;
        let mut dataset = Self::new(parsed.nodes, parsed.steps);
        for entry in parsed.sequence {
            dataset.set_size(&entry.step, &entry.node, entry.size);
        }
        for entry in parsed.flows {
            dataset.set_flow(
                &entry.step1,
                &entry.node1,
                &entry.step2,
                &entry.node2,
                entry.size,
            );
        }
        Ok(dataset)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        Self::from_json_str(&contents)
    }
}

impl FlowDataSource for FlowDataset {
    fn nodes(&self) -> Vec<String> {
        self.nodes.clone()
    }

    fn steps(&self) -> Vec<String> {
        self.steps.clone()
    }

    fn sequence(&self) -> HashMap<SequenceKey, f32> {
        self.sequence.clone()
    }

    fn flows(&self) -> HashMap<FlowKey, f32> {
        self.flows.clone()
    }
}

// JSON object keys cannot be composite, so the file format carries entry
// lists and is folded into the keyed maps on load.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    nodes: Vec<String>,
    steps: Vec<String>,
    #[serde(default)]
    sequence: Vec<SequenceEntry>,
    #[serde(default)]
    flows: Vec<FlowEntry>,
}

#[derive(Debug, Deserialize)]
struct SequenceEntry {
    step: String,
    node: String,
    size: f32,
}

#[derive(Debug, Deserialize)]
struct FlowEntry {
    step1: String,
    node1: String,
    step2: String,
    node2: String,
    size: f32,
}
