pub mod config;
pub mod data;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod style;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{Config, LayoutOptions, RenderConfig, StyleConfig, WeightScale, load_config};
pub use data::{FlowDataSource, FlowDataset, FlowKey, SequenceKey};
pub use layout::{FlowBand, FlowLayout, LayoutError, PortExtent};
pub use render::{render_svg, write_output_svg};
#[cfg(feature = "png")]
pub use render::write_output_png;
pub use style::{FlowStyle, GradientStyle, IngroupScope, IngroupStyle, SimpleStyle};

#[cfg(feature = "cli")]
pub use cli::run;
