//! Example VisionBox plugin built as a shared library.
//!
//! Build with `cargo build -p visionbox-invert-plugin` and copy the
//! resulting library into a plugin directory, or pass its directory with
//! `--plugin-dir`.

use image::DynamicImage;
use visionbox_plugin_sdk::{
    declare_plugin, ComputeError, DataType, NodeData, NodeFactory, NodeModel, ParameterSet,
    ParameterSpec, Plugin, PluginInfo, PortDefinition,
};

/// Inverts colour channels, optionally leaving alpha alone
#[derive(Debug, Clone)]
pub struct InvertModel {
    parameters: ParameterSet,
}

impl Default for InvertModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![ParameterSpec::boolean("keep_alpha", "Keep Alpha", true)]),
        }
    }
}

impl NodeModel for InvertModel {
    fn type_name(&self) -> &str {
        "InvertModel"
    }

    fn caption(&self) -> &str {
        "Invert"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let image = inputs
            .first()
            .and_then(NodeData::as_image)
            .ok_or_else(|| ComputeError::MissingInput("Image".to_string()))?;

        let mut inverted: DynamicImage = image.clone();
        if self.parameters.bool("keep_alpha") {
            inverted.invert();
        } else {
            let mut rgba = inverted.to_rgba8();
            rgba.pixels_mut().for_each(|p| p.0.iter_mut().for_each(|v| *v = 255 - *v));
            inverted = DynamicImage::ImageRgba8(rgba);
        }
        Ok(vec![NodeData::image(inverted)])
    }
}

#[derive(Debug, Default)]
pub struct InvertPlugin;

impl Plugin for InvertPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("visionbox.example.invert", "Invert", env!("CARGO_PKG_VERSION"))
            .with_description("Colour inversion")
            .with_categories(&["Filters"])
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        vec![NodeFactory::new("InvertModel", "Invert", || Box::new(InvertModel::default()))]
    }
}

declare_plugin!(InvertPlugin::default);
