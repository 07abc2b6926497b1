//! Writes every incoming image as a numbered PNG frame

use std::path::PathBuf;

use log::debug;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterSet, ParameterSpec, PortDefinition,
};

use crate::nodes::image_utils::input_image;

/// Stateful: the frame counter advances on every write and restarts on reset
#[derive(Debug, Clone)]
pub struct ImageWriterModel {
    parameters: ParameterSet,
    next_frame: u64,
}

impl Default for ImageWriterModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(vec![
                ParameterSpec::path("directory", "Output Directory"),
                ParameterSpec::text("prefix", "File Prefix", "frame"),
            ]),
            next_frame: 0,
        }
    }
}

impl ImageWriterModel {
    /// Path the next frame will be written to
    pub fn next_path(&self) -> Option<PathBuf> {
        let directory = self.parameters.path("directory")?;
        let file_name = format!("{}_{:05}.png", self.parameters.text("prefix"), self.next_frame);
        Some(directory.join(file_name))
    }
}

impl NodeModel for ImageWriterModel {
    fn type_name(&self) -> &str {
        "ImageWriterModel"
    }

    fn caption(&self) -> &str {
        "Image Writer"
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
        let path = self
            .next_path()
            .ok_or_else(|| ComputeError::Io("output directory is not set".to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image.save_with_format(&path, image::ImageFormat::Png)?;
        debug!("Wrote {}", path.display());
        self.next_frame += 1;

        Ok(vec![inputs[0].clone()])
    }

    fn is_stateful(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.next_frame = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use visionbox_plugin_sdk::ParameterValue;

    fn frame() -> NodeData {
        NodeData::image(DynamicImage::ImageRgb8(RgbImage::new(4, 4)))
    }

    #[test]
    fn test_creates_directory_and_numbers_frames() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let mut model = ImageWriterModel::default();
        model.parameters_mut().set("directory", ParameterValue::Path(out.clone())).unwrap();

        assert!(!out.exists());

        let input = frame();
        let outputs = model.compute(&[input.clone()]).unwrap();
        assert!(outputs[0].same_as(&input));
        model.compute(&[frame()]).unwrap();

        assert!(out.join("frame_00000.png").exists());
        assert!(out.join("frame_00001.png").exists());

        model.reset();
        assert_eq!(model.next_path(), Some(out.join("frame_00000.png")));
    }

    #[test]
    fn test_unset_directory_fails() {
        let mut model = ImageWriterModel::default();
        assert!(matches!(model.compute(&[frame()]), Err(ComputeError::Io(_))));
    }
}
