//! Fixed-level thresholding applied to every colour channel

use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::{input_image, FloatImage};

pub const THRESHOLD_TYPES: [&str; 5] = ["Binary", "Binary Inverted", "Truncate", "To Zero", "To Zero Inverted"];

/// Applies a threshold rule to one sample
pub fn threshold_sample(value: f32, threshold: f32, max_value: f32, kind: &str) -> f32 {
    let above = value > threshold;
    match kind {
        "Binary Inverted" => if above { 0.0 } else { max_value },
        "Truncate" => if above { threshold } else { value },
        "To Zero" => if above { value } else { 0.0 },
        "To Zero Inverted" => if above { 0.0 } else { value },
        _ => if above { max_value } else { 0.0 },
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdModel {
    parameters: ParameterSet,
}

impl Default for ThresholdModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::choice("type", "Type", "Binary", &THRESHOLD_TYPES),
                ParameterSpec::float("threshold", "Threshold", 127.0, 0.0, 255.0),
                ParameterSpec::float("max_value", "Max Value", 255.0, 0.0, 255.0),
            ]),
        }
    }
}

impl NodeModel for ThresholdModel {
    fn type_name(&self) -> &str {
        "ThresholdModel"
    }

    fn caption(&self) -> &str {
        "Threshold"
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
        let threshold = self.parameters.float("threshold") as f32;
        let max_value = self.parameters.float("max_value") as f32;
        let kind = self.parameters.text("type");

        let mut pixels = FloatImage::from_dynamic(image);
        pixels.map_color(|v| threshold_sample(v, threshold, max_value, kind));
        Ok(vec![NodeData::image(pixels.into_dynamic()?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use visionbox_plugin_sdk::ParameterValue;

    #[test]
    fn test_threshold_rules() {
        assert_eq!(threshold_sample(200.0, 127.0, 255.0, "Binary"), 255.0);
        assert_eq!(threshold_sample(100.0, 127.0, 255.0, "Binary"), 0.0);
        assert_eq!(threshold_sample(200.0, 127.0, 255.0, "Binary Inverted"), 0.0);
        assert_eq!(threshold_sample(200.0, 127.0, 255.0, "Truncate"), 127.0);
        assert_eq!(threshold_sample(100.0, 127.0, 255.0, "To Zero"), 0.0);
        assert_eq!(threshold_sample(100.0, 127.0, 255.0, "To Zero Inverted"), 100.0);
    }

    #[test]
    fn test_binary_threshold_image() {
        let mut gray = GrayImage::new(2, 1);
        gray.put_pixel(0, 0, Luma([50]));
        gray.put_pixel(1, 0, Luma([180]));

        let mut model = ThresholdModel::default();
        model.parameters_mut().set("max_value", ParameterValue::Int(200)).unwrap();
        let outputs = model.compute(&[NodeData::image(DynamicImage::ImageLuma8(gray))]).unwrap();
        assert_eq!(outputs[0].as_image().unwrap().as_bytes(), &[0, 200]);
    }
}
