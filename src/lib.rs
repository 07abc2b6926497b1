//! VisionBox core library
//!
//! A node-graph engine for image processing: plugins provide node types,
//! a graph model wires node instances together and propagates results
//! downstream whenever an input, a connection or a parameter changes.

pub mod app;
pub mod constants;
pub mod file_manager;
pub mod nodes;
pub mod plugins;

pub use app::{App, AppConfig};
pub use file_manager::{FileError, FileManager, GraphDocument};
pub use nodes::{Connection, GraphError, GraphEvent, GraphModel, NodeId, NodeRegistry};
pub use plugins::PluginManager;

// Plugin authors only need the SDK; re-exported for host-side code
pub use visionbox_plugin_sdk as sdk;
