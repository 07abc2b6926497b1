//! Built-in image filters

pub mod blur;
pub mod color_convert;
pub mod resize;
pub mod running_average;
pub mod sobel;
pub mod threshold;

pub use blur::BlurModel;
pub use color_convert::ColorConvertModel;
pub use resize::ResizeModel;
pub use running_average::RunningAverageModel;
pub use sobel::SobelEdgeModel;
pub use threshold::ThresholdModel;

use visionbox_plugin_sdk::{NodeFactory, Plugin, PluginInfo};

pub const PLUGIN_ID: &str = "visionbox.filters";

/// Plugin providing the filter nodes
#[derive(Debug, Default)]
pub struct FiltersPlugin;

impl Plugin for FiltersPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PLUGIN_ID, "Filters", env!("CARGO_PKG_VERSION"))
            .with_description("Smoothing, thresholding, colour conversion and resampling")
            .with_author("VisionBox")
            .with_categories(&["Filters"])
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        vec![
            NodeFactory::new("BlurModel", "Blur", || Box::new(BlurModel::default())),
            NodeFactory::new("ThresholdModel", "Threshold", || Box::new(ThresholdModel::default())),
            NodeFactory::new("ColorConvertModel", "Color Convert", || Box::new(ColorConvertModel::default())),
            NodeFactory::new("SobelEdgeModel", "Sobel Edges", || Box::new(SobelEdgeModel::default())),
            NodeFactory::new("ResizeModel", "Resize", || Box::new(ResizeModel::default())),
            NodeFactory::new("RunningAverageModel", "Running Average", || {
                Box::new(RunningAverageModel::default())
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factories_match_models() {
        for factory in FiltersPlugin.node_factories() {
            let model = factory.create();
            assert_eq!(model.type_name(), factory.type_name);
            assert_eq!(model.caption(), factory.caption);
        }
    }
}
