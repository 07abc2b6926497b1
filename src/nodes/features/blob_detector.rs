//! Connected-component blob detection on a thresholded luma plane

use std::collections::VecDeque;

use visionbox_plugin_sdk::{
    BoundingBox, ComputeError, DataType, Detection, NodeData, NodeModel, ParameterSet, ParameterSpec,
    PortDefinition,
};

use crate::nodes::image_utils::{input_image, luma_plane};

/// Finds 4-connected regions of `true` cells. Regions smaller than
/// `min_area` pixels are dropped.
pub fn find_blobs(mask: &[bool], width: u32, height: u32, min_area: u64) -> Vec<Detection> {
    let (w, h) = (width as usize, height as usize);
    let mut visited = vec![false; mask.len()];
    let mut blobs = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0, 0);
        let mut area = 0u64;
        while let Some(i) = queue.pop_front() {
            let (x, y) = (i % w, i / w);
            area += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < w).then(|| i + 1),
                (y > 0).then(|| i - w),
                (y + 1 < h).then(|| i + w),
            ];
            for n in neighbours.into_iter().flatten() {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }

        if area < min_area {
            continue;
        }
        let bounding_box = BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        };
        blobs.push(Detection {
            label: "blob".to_string(),
            confidence: area as f32 / bounding_box.area() as f32,
            bounding_box,
        });
    }
    blobs
}

#[derive(Debug, Clone)]
pub struct BlobDetectorModel {
    parameters: ParameterSet,
}

impl Default for BlobDetectorModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::int("threshold", "Threshold", 128, 0, 255),
                ParameterSpec::boolean("dark_blobs", "Detect Dark Blobs", false),
                ParameterSpec::int("min_area", "Min Area", 10, 1, 100_000_000),
            ]),
        }
    }
}

impl NodeModel for BlobDetectorModel {
    fn type_name(&self) -> &str {
        "BlobDetectorModel"
    }

    fn caption(&self) -> &str {
        "Blob Detector"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Blobs", DataType::Detections)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        let image = input_image(inputs, 0, "Image")?;
        let threshold = self.parameters.int("threshold") as f32;
        let dark = self.parameters.bool("dark_blobs");

        let mask: Vec<bool> = luma_plane(image)
            .into_iter()
            .map(|v| if dark { v < threshold } else { v >= threshold })
            .collect();
        let blobs = find_blobs(
            &mask,
            image.width(),
            image.height(),
            self.parameters.int("min_area") as u64,
        );
        Ok(vec![NodeData::detections(blobs)])
    }
}
