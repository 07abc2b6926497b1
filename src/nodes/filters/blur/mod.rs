//! Blur node implementation
//!
//! - mod.rs: node model, ports and parameters
//! - functions.rs: kernel construction and convolution

mod functions;

pub use functions::*;

use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::constants::node::MAX_KERNEL_SIZE;
use crate::nodes::image_utils::{input_image, luma_plane, FloatImage};

/// Gaussian or box blur with an optional mask input
#[derive(Debug, Clone)]
pub struct BlurModel {
    parameters: ParameterSet,
}

impl Default for BlurModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::choice("method", "Method", "Gaussian", &BlurMethod::NAMES),
                ParameterSpec::int("kernel_size", "Kernel Size", 5, 1, MAX_KERNEL_SIZE),
                ParameterSpec::float("sigma", "Sigma", 0.0, 0.0, 100.0),
                ParameterSpec::boolean("use_mask", "Use Mask", false),
            ]),
        }
    }
}

impl NodeModel for BlurModel {
    fn type_name(&self) -> &str {
        "BlurModel"
    }

    fn caption(&self) -> &str {
        "Blur"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        let mut ports = vec![PortDefinition::required("Image", DataType::Image)];
        if self.parameters.bool("use_mask") {
            ports.push(PortDefinition::required("Mask", DataType::Image));
        }
        ports
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
        let kernel_size = self.parameters.int("kernel_size");
        let limit = image.width().min(image.height()) as i64;
        if kernel_size > limit {
            return Err(ComputeError::out_of_range("kernel_size", kernel_size, 1, limit));
        }

        let method = BlurMethod::from_name(self.parameters.text("method"));
        let weights = kernel_weights(method, kernel_size as usize, self.parameters.float("sigma"));
        let original = FloatImage::from_dynamic(image);
        let mut blurred = blur(&original, &weights);

        if self.parameters.bool("use_mask") {
            let mask = input_image(inputs, 1, "Mask")?;
            if mask.width() != image.width() || mask.height() != image.height() {
                return Err(ComputeError::UnsupportedInput(format!(
                    "mask is {}x{} but image is {}x{}",
                    mask.width(),
                    mask.height(),
                    image.width(),
                    image.height()
                )));
            }
            apply_mask(&original, &mut blurred, &luma_plane(mask));
        }

        Ok(vec![NodeData::image(blurred.into_dynamic()?)])
    }
}
