//! Exponential running average over successive images

use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::{input_image, FloatImage};

/// Stateful: the output depends on every image seen since the last reset
#[derive(Debug, Clone)]
pub struct RunningAverageModel {
    parameters: ParameterSet,
    accumulator: Option<FloatImage>,
    frames: u64,
}

impl Default for RunningAverageModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![ParameterSpec::float("alpha", "Alpha", 0.1, 0.0, 1.0)]),
            accumulator: None,
            frames: 0,
        }
    }
}

impl RunningAverageModel {
    /// Images accumulated since the last reset
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl NodeModel for RunningAverageModel {
    fn type_name(&self) -> &str {
        "RunningAverageModel"
    }

    fn caption(&self) -> &str {
        "Running Average"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Average", DataType::Image)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let frame = FloatImage::from_dynamic(input_image(inputs, 0, "Image")?);
        let alpha = self.parameters.float("alpha") as f32;

        let average = match self.accumulator.take() {
            Some(mut acc) if acc.same_shape(&frame) => {
                for (a, v) in acc.data.iter_mut().zip(&frame.data) {
                    *a = (1.0 - alpha) * *a + alpha * v;
                }
                self.frames += 1;
                acc
            }
            _ => {
                // First frame, or the input shape changed
                self.frames = 1;
                frame
            }
        };

        let output = average.clone().into_dynamic()?;
        self.accumulator = Some(average);
        Ok(vec![NodeData::image(output)])
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.accumulator = None;
        self.frames = 0;
    }
}
