//! Image resampling

use image::imageops::FilterType;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::input_image;

pub const INTERPOLATIONS: [&str; 4] = ["Nearest", "Linear", "Cubic", "Lanczos"];

pub fn filter_type(name: &str) -> FilterType {
    match name {
        "Nearest" => FilterType::Nearest,
        "Cubic" => FilterType::CatmullRom,
        "Lanczos" => FilterType::Lanczos3,
        _ => FilterType::Triangle,
    }
}

#[derive(Debug, Clone)]
pub struct ResizeModel {
    parameters: ParameterSet,
}

impl Default for ResizeModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::int("width", "Width", 320, 1, 8192),
                ParameterSpec::int("height", "Height", 240, 1, 8192),
                ParameterSpec::boolean("keep_aspect", "Keep Aspect Ratio", false),
                ParameterSpec::choice("interpolation", "Interpolation", "Linear", &INTERPOLATIONS),
            ]),
        }
    }
}

impl NodeModel for ResizeModel {
    fn type_name(&self) -> &str {
        "ResizeModel"
    }

    fn caption(&self) -> &str {
        "Resize"
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
        let image = input_image(inputs, 0, "Image")?;
        let width = self.parameters.int("width") as u32;
        let height = self.parameters.int("height") as u32;
        let filter = filter_type(self.parameters.text("interpolation"));

        // `resize` fits inside the box, `resize_exact` stretches
        let resized = if self.parameters.bool("keep_aspect") {
            image.resize(width, height, filter)
        } else {
            image.resize_exact(width, height, filter)
        };
        Ok(vec![NodeData::image(resized)])
    }
}
