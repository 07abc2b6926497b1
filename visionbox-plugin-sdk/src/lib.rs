//! VisionBox plugin SDK
//!
//! Types shared by the VisionBox host and by plugin libraries: artifacts,
//! parameters, the node model trait and the plugin interface.

pub mod data;
pub mod model;
pub mod parameters;
pub mod plugin;

pub use data::{BoundingBox, DataType, Detection, KeyPoint, NodeData};
pub use model::{ComputeError, NodeCreator, NodeModel, PortDefinition};
pub use parameters::{ParameterError, ParameterKind, ParameterSet, ParameterSpec, ParameterValue};
pub use plugin::{NodeFactory, Plugin, PluginError, PluginHandle, PluginInfo};

/// Interface version checked by the host before a library's plugin object
/// is used. Bump on any change to the types above.
pub const PLUGIN_API_VERSION: u32 = 1;

/// Exported symbol returning [`PLUGIN_API_VERSION`]
pub const API_VERSION_SYMBOL: &[u8] = b"visionbox_plugin_api_version";

/// Exported symbol returning a [`PluginHandle`]
pub const CREATE_PLUGIN_SYMBOL: &[u8] = b"visionbox_create_plugin";
