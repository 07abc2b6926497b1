//! Harris corner detection

use image::DynamicImage;
use visionbox_plugin_sdk::{
    ComputeError, DataType, KeyPoint, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::filters::sobel::sobel_gradients;
use crate::nodes::image_utils::{color_by_name, draw_cross, input_image, luma_plane, COLOR_NAMES};

/// Harris response `det(M) - k * trace(M)^2` of the gradient structure
/// tensor summed over a `block_size` window
pub fn harris_response(plane: &[f32], width: u32, height: u32, block_size: usize, k: f32) -> Vec<f32> {
    let (gx, gy) = sobel_gradients(plane, width, height);
    let (w, h) = (width as i64, height as i64);
    let lo = (block_size as i64 - 1) / 2;
    let hi = block_size as i64 / 2;

    let mut response = vec![0.0; plane.len()];
    for y in 0..h {
        for x in 0..w {
            let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
            for wy in (y - lo).max(0)..=(y + hi).min(h - 1) {
                for wx in (x - lo).max(0)..=(x + hi).min(w - 1) {
                    let i = (wy * w + wx) as usize;
                    sxx += gx[i] * gx[i];
                    syy += gy[i] * gy[i];
                    sxy += gx[i] * gy[i];
                }
            }
            let trace = sxx + syy;
            response[(y * w + x) as usize] = sxx * syy - sxy * sxy - k * trace * trace;
        }
    }
    response
}

/// Local maxima above `quality * max_response`, strongest first
pub fn pick_corners(response: &[f32], width: u32, height: u32, quality: f32, block_size: usize) -> Vec<KeyPoint> {
    let max = response.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }
    let cutoff = quality * max;
    let (w, h) = (width as i64, height as i64);

    let mut corners = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let value = response[(y * w + x) as usize];
            if value <= cutoff {
                continue;
            }
            let is_peak = (-1..=1).all(|dy| {
                (-1..=1).all(|dx| {
                    let (nx, ny) = (x + dx, y + dy);
                    if (dx == 0 && dy == 0) || nx < 0 || ny < 0 || nx >= w || ny >= h {
                        return true;
                    }
                    let neighbour = response[(ny * w + nx) as usize];
                    // Ties go to the first pixel in scan order
                    neighbour < value || (neighbour == value && (ny, nx) > (y, x))
                })
            });
            if is_peak {
                corners.push(KeyPoint {
                    x: x as f32,
                    y: y as f32,
                    response: value,
                    size: block_size as f32,
                });
            }
        }
    }
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));
    corners
}

/// Outputs the input annotated with markers on port 0 and the corners on port 1
#[derive(Debug, Clone)]
pub struct CornerDetectorModel {
    parameters: ParameterSet,
}

impl Default for CornerDetectorModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::int("block_size", "Block Size", 3, 2, 15),
                ParameterSpec::float("k", "Harris k", 0.04, 0.0, 0.25),
                ParameterSpec::float("quality", "Quality Level", 0.01, 0.0, 1.0),
                ParameterSpec::int("max_corners", "Max Corners (0 = all)", 100, 0, 10_000),
                ParameterSpec::choice("marker_color", "Marker Color", "Red", &COLOR_NAMES),
            ]),
        }
    }
}

impl NodeModel for CornerDetectorModel {
    fn type_name(&self) -> &str {
        "CornerDetectorModel"
    }

    fn caption(&self) -> &str {
        "Corner Detector"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition::required("Image", DataType::Image),
            PortDefinition::required("Corners", DataType::Keypoints),
        ]
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
        let block_size = self.parameters.int("block_size") as usize;

        let response = harris_response(
            &luma_plane(image),
            width,
            height,
            block_size,
            self.parameters.float("k") as f32,
        );
        let mut corners = pick_corners(
            &response,
            width,
            height,
            self.parameters.float("quality") as f32,
            block_size,
        );
        let max_corners = self.parameters.int("max_corners") as usize;
        if max_corners > 0 {
            corners.truncate(max_corners);
        }

        let mut canvas = image.to_rgb8();
        let color = color_by_name(self.parameters.text("marker_color"));
        for corner in &corners {
            draw_cross(&mut canvas, corner.x, corner.y, 3, color);
        }

        Ok(vec![
            NodeData::image(DynamicImage::ImageRgb8(canvas)),
            NodeData::keypoints(corners),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn square(size: u32, from: u32, to: u32) -> NodeData {
        let mut gray = GrayImage::new(size, size);
        for y in from..to {
            for x in from..to {
                gray.put_pixel(x, y, Luma([255]));
            }
        }
        NodeData::image(DynamicImage::ImageLuma8(gray))
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let mut model = CornerDetectorModel::default();
        let outputs = model.compute(&[NodeData::image(DynamicImage::ImageLuma8(GrayImage::new(16, 16)))]).unwrap();
        assert!(outputs[1].as_keypoints().unwrap().is_empty());
        assert_eq!(outputs[0].summary(), "image 16x16x3");
    }

    #[test]
    fn test_square_corners_are_found() {
        let mut model = CornerDetectorModel::default();
        let outputs = model.compute(&[square(24, 6, 18)]).unwrap();
        let corners = outputs[1].as_keypoints().unwrap();
        assert!(corners.len() >= 4);

        let expected = [(6.0, 6.0), (17.0, 6.0), (6.0, 17.0), (17.0, 17.0)];
        for corner in corners {
            let near = expected
                .iter()
                .any(|(x, y)| (corner.x - x).abs() <= 3.0 && (corner.y - y).abs() <= 3.0);
            assert!(near, "unexpected corner at ({}, {})", corner.x, corner.y);
        }
        for (x, y) in expected {
            assert!(corners
                .iter()
                .any(|c| (c.x - x).abs() <= 3.0 && (c.y - y).abs() <= 3.0));
        }
    }

    #[test]
    fn test_max_corners_limits_output() {
        let mut model = CornerDetectorModel::default();
        model
            .parameters_mut()
            .set("max_corners", visionbox_plugin_sdk::ParameterValue::Int(2))
            .unwrap();
        let outputs = model.compute(&[square(24, 6, 18)]).unwrap();
        assert_eq!(outputs[1].as_keypoints().unwrap().len(), 2);
    }
}
