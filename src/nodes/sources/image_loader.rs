//! Reads an image file from disk

use log::debug;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

#[derive(Debug, Clone)]
pub struct ImageLoaderModel {
    parameters: ParameterSet,
}

impl Default for ImageLoaderModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![ParameterSpec::path("path", "File")]),
        }
    }
}

impl NodeModel for ImageLoaderModel {
    fn type_name(&self) -> &str {
        "ImageLoaderModel"
    }

    fn caption(&self) -> &str {
        "Image Loader"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        Vec::new()
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

    fn compute(&mut self, _inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let path = self
            .parameters
            .path("path")
            .ok_or_else(|| ComputeError::MissingInput("path".to_string()))?;
        let image = image::open(path)?;
        debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
        Ok(vec![NodeData::image(image)])
    }
}
