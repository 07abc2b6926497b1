//! Sobel edge detection on the luma plane

use image::{DynamicImage, GrayImage};
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::{input_image, luma_plane};

pub const DIRECTIONS: [&str; 3] = ["X", "Y", "Magnitude"];

/// Horizontal and vertical 3x3 Sobel responses with replicated borders
pub fn sobel_gradients(plane: &[f32], width: u32, height: u32) -> (Vec<f32>, Vec<f32>) {
    let (w, h) = (width as i64, height as i64);
    let at = |x: i64, y: i64| plane[(y.clamp(0, h - 1) * w + x.clamp(0, w - 1)) as usize];

    let mut gx = vec![0.0; plane.len()];
    let mut gy = vec![0.0; plane.len()];
    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            gx[i] = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            gy[i] = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
        }
    }
    (gx, gy)
}

#[derive(Debug, Clone)]
pub struct SobelEdgeModel {
    parameters: ParameterSet,
}

impl Default for SobelEdgeModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::choice("direction", "Direction", "Magnitude", &DIRECTIONS),
                ParameterSpec::float("scale", "Scale", 1.0, 0.0, 16.0),
            ]),
        }
    }
}

impl NodeModel for SobelEdgeModel {
    fn type_name(&self) -> &str {
        "SobelEdgeModel"
    }

    fn caption(&self) -> &str {
        "Sobel Edges"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Edges", DataType::Image)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let image = input_image(inputs, 0, "Image")?;
        let (width, height) = (image.width(), image.height());
        let (gx, gy) = sobel_gradients(&luma_plane(image), width, height);
        let scale = self.parameters.float("scale") as f32;

        let direction = self.parameters.text("direction");
        let bytes: Vec<u8> = gx
            .iter()
            .zip(&gy)
            .map(|(x, y)| {
                let response = match direction {
                    "X" => x.abs(),
                    "Y" => y.abs(),
                    _ => x.hypot(*y),
                };
                (response * scale).round().clamp(0.0, 255.0) as u8
            })
            .collect();

        let edges = GrayImage::from_raw(width, height, bytes)
            .ok_or_else(|| ComputeError::Algorithm("edge buffer does not match image size".to_string()))?;
        Ok(vec![NodeData::image(DynamicImage::ImageLuma8(edges))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_flat_image_has_no_edges() {
        let plane = vec![80.0; 16];
        let (gx, gy) = sobel_gradients(&plane, 4, 4);
        assert!(gx.iter().chain(&gy).all(|v| *v == 0.0));
    }

    #[test]
    fn test_vertical_step_responds_in_x() {
        let mut gray = GrayImage::new(6, 6);
        for y in 0..6 {
            for x in 3..6 {
                gray.put_pixel(x, y, Luma([100]));
            }
        }
        let mut model = SobelEdgeModel::default();
        model
            .parameters_mut()
            .set("direction", visionbox_plugin_sdk::ParameterValue::Choice("Y".into()))
            .unwrap();
        let y_only = model.compute(&[NodeData::image(DynamicImage::ImageLuma8(gray.clone()))]).unwrap();
        assert!(y_only[0].as_image().unwrap().as_bytes().iter().all(|&v| v == 0));

        model
            .parameters_mut()
            .set("direction", visionbox_plugin_sdk::ParameterValue::Choice("X".into()))
            .unwrap();
        let x_only = model.compute(&[NodeData::image(DynamicImage::ImageLuma8(gray))]).unwrap();
        let edges = x_only[0].as_image().unwrap().to_luma8();
        assert_eq!(edges.get_pixel(3, 3), &Luma([255]));
        assert_eq!(edges.get_pixel(0, 3), &Luma([0]));
    }
}
