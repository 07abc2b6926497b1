//! Generates a uniformly coloured image

use std::time::Duration;

use image::{DynamicImage, Luma, LumaA, Rgb, Rgba};
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::constants::node::SOURCE_DEBOUNCE;
use crate::nodes::image_utils::filled;

/// Debounced: colour sliders fire many edits in quick succession
#[derive(Debug, Clone)]
pub struct SolidColorModel {
    parameters: ParameterSet,
}

impl Default for SolidColorModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::int("width", "Width", 64, 1, 8192),
                ParameterSpec::int("height", "Height", 64, 1, 8192),
                ParameterSpec::int("channels", "Channels", 3, 1, 4),
                ParameterSpec::int("red", "Red", 0, 0, 255),
                ParameterSpec::int("green", "Green", 0, 0, 255),
                ParameterSpec::int("blue", "Blue", 0, 0, 255),
            ]),
        }
    }
}

impl NodeModel for SolidColorModel {
    fn type_name(&self) -> &str {
        "SolidColorModel"
    }

    fn caption(&self) -> &str {
        "Solid Color"
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
        let width = self.parameters.int("width") as u32;
        let height = self.parameters.int("height") as u32;
        let [r, g, b] = ["red", "green", "blue"].map(|name| self.parameters.int(name) as u8);

        let image = match self.parameters.int("channels") {
            1 => DynamicImage::ImageLuma8(filled(width, height, Luma([luma(r, g, b)]))),
            2 => DynamicImage::ImageLumaA8(filled(width, height, LumaA([luma(r, g, b), 255]))),
            3 => DynamicImage::ImageRgb8(filled(width, height, Rgb([r, g, b]))),
            _ => DynamicImage::ImageRgba8(filled(width, height, Rgba([r, g, b, 255]))),
        };
        Ok(vec![NodeData::image(image)])
    }

    fn debounce(&self) -> Option<Duration> {
        Some(SOURCE_DEBOUNCE)
    }
}

/// ITU-R BT.601 luma
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)).round() as u8
}
