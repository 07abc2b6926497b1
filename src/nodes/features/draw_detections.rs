//! Overlays detections and keypoints on an image

use image::DynamicImage;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::{color_by_name, draw_cross, draw_rectangle, input_image, COLOR_NAMES};

#[derive(Debug, Clone)]
pub struct DrawDetectionsModel {
    parameters: ParameterSet,
}

impl Default for DrawDetectionsModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::choice("color", "Color", "Green", &COLOR_NAMES),
                ParameterSpec::int("thickness", "Thickness", 2, 1, 20),
                ParameterSpec::float("min_confidence", "Min Confidence", 0.0, 0.0, 1.0),
            ]),
        }
    }
}

impl NodeModel for DrawDetectionsModel {
    fn type_name(&self) -> &str {
        "DrawDetectionsModel"
    }

    fn caption(&self) -> &str {
        "Draw Detections"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition::required("Image", DataType::Image),
            PortDefinition::optional("Detections", DataType::Detections),
            PortDefinition::optional("Keypoints", DataType::Keypoints),
        ]
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
        let mut canvas = input_image(inputs, 0, "Image")?.to_rgb8();
        let color = color_by_name(self.parameters.text("color"));
        let thickness = self.parameters.int("thickness") as u32;
        let min_confidence = self.parameters.float("min_confidence") as f32;

        if let Some(detections) = inputs.get(1).and_then(NodeData::as_detections) {
            for detection in detections.iter().filter(|d| d.confidence >= min_confidence) {
                draw_rectangle(&mut canvas, &detection.bounding_box, color, thickness);
            }
        }
        if let Some(points) = inputs.get(2).and_then(NodeData::as_keypoints) {
            for point in points {
                draw_cross(&mut canvas, point.x, point.y, 2 + thickness as i64, color);
            }
        }
        Ok(vec![NodeData::image(DynamicImage::ImageRgb8(canvas))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use visionbox_plugin_sdk::{BoundingBox, Detection, KeyPoint};

    fn canvas() -> NodeData {
        NodeData::image(DynamicImage::ImageRgb8(RgbImage::new(20, 20)))
    }

    #[test]
    fn test_image_only_is_copied() {
        let mut model = DrawDetectionsModel::default();
        let outputs = model.compute(&[canvas(), NodeData::None, NodeData::None]).unwrap();
        assert!(outputs[0].as_image().unwrap().as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_draws_boxes_and_points() {
        let detections = NodeData::detections(vec![Detection {
            label: "blob".to_string(),
            confidence: 0.9,
            bounding_box: BoundingBox { x: 2, y: 2, width: 6, height: 6 },
        }]);
        let points = NodeData::keypoints(vec![KeyPoint { x: 15.0, y: 15.0, response: 1.0, size: 3.0 }]);

        let mut model = DrawDetectionsModel::default();
        let outputs = model.compute(&[canvas(), detections, points]).unwrap();
        let image = outputs[0].as_image().unwrap().to_rgb8();

        assert_eq!(image.get_pixel(2, 2), &Rgb([0, 255, 0]));
        assert_eq!(image.get_pixel(15, 15), &Rgb([0, 255, 0]));
        assert_eq!(image.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }
}
