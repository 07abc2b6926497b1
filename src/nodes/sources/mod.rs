//! Built-in image sources

pub mod image_loader;
pub mod solid_color;

pub use image_loader::ImageLoaderModel;
pub use solid_color::SolidColorModel;

use visionbox_plugin_sdk::{NodeFactory, Plugin, PluginInfo};

pub const PLUGIN_ID: &str = "visionbox.sources";

/// Plugin providing nodes without inputs
#[derive(Debug, Default)]
pub struct SourcesPlugin;

impl Plugin for SourcesPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PLUGIN_ID, "Sources", env!("CARGO_PKG_VERSION"))
            .with_description("Image files and generated images")
            .with_author("VisionBox")
            .with_categories(&["Sources"])
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        vec![
            NodeFactory::new("ImageLoaderModel", "Image Loader", || Box::new(ImageLoaderModel::default())),
            NodeFactory::new("SolidColorModel", "Solid Color", || Box::new(SolidColorModel::default())),
        ]
    }
}
