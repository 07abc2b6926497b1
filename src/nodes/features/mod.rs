//! Built-in feature detection nodes

pub mod blob_detector;
pub mod corner_detector;
pub mod draw_detections;
pub mod image_writer;

pub use blob_detector::BlobDetectorModel;
pub use corner_detector::CornerDetectorModel;
pub use draw_detections::DrawDetectionsModel;
pub use image_writer::ImageWriterModel;

use visionbox_plugin_sdk::{NodeFactory, Plugin, PluginInfo};

pub const PLUGIN_ID: &str = "visionbox.features";

/// Plugin providing detectors and their consumers
#[derive(Debug, Default)]
pub struct FeaturesPlugin;

impl Plugin for FeaturesPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PLUGIN_ID, "Feature Detection", env!("CARGO_PKG_VERSION"))
            .with_description("Corner and blob detectors, overlays and frame output")
            .with_author("VisionBox")
            .with_categories(&["Feature Detection"])
            .with_dependencies(&[super::filters::PLUGIN_ID])
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        vec![
            NodeFactory::new("CornerDetectorModel", "Corner Detector", || {
                Box::new(CornerDetectorModel::default())
            }),
            NodeFactory::new("BlobDetectorModel", "Blob Detector", || Box::new(BlobDetectorModel::default())),
            NodeFactory::new("DrawDetectionsModel", "Draw Detections", || {
                Box::new(DrawDetectionsModel::default())
            }),
            NodeFactory::new("ImageWriterModel", "Image Writer", || Box::new(ImageWriterModel::default())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PluginManager;
    use visionbox_plugin_sdk::PluginError;

    #[test]
    fn test_requires_filters_plugin() {
        let manager = PluginManager::new();
        assert!(matches!(
            manager.register_plugin(Box::new(FeaturesPlugin)),
            Err(PluginError::MissingDependency { .. })
        ));

        manager.register_plugin(Box::new(crate::nodes::filters::FiltersPlugin)).unwrap();
        assert!(manager.register_plugin(Box::new(FeaturesPlugin)).is_ok());
    }

    #[test]
    fn test_stateful_nodes() {
        let stateful: Vec<String> = FeaturesPlugin
            .node_factories()
            .iter()
            .filter(|f| f.create().is_stateful())
            .map(|f| f.type_name.clone())
            .collect();
        assert_eq!(stateful, vec!["ImageWriterModel"]);
    }
}
