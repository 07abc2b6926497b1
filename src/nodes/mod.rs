//! Node system - graph model, propagation and the built-in node types

// Core node system modules
pub mod execution_engine;
pub mod factory;
pub mod graph;
pub mod node;
pub mod port;

pub mod image_utils;

// Built-in node implementations
pub mod features;
pub mod filters;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;

pub use execution_engine::{ExecutionEngine, ExecutionStats};
pub use factory::{NodeRegistry, RegistryEntry};
pub use graph::{Connection, GraphError, GraphEvent, GraphModel};
pub use node::{Node, NodeError, NodeId, NodeState, ParameterUpdate, Position};
pub use port::{PortDirection, PortId};

use visionbox_plugin_sdk::{PluginError, PluginInfo};

use crate::plugins::PluginManager;

/// Registers the built-in plugins in dependency order
pub fn register_builtin_plugins(manager: &PluginManager) -> Result<Vec<PluginInfo>, PluginError> {
    Ok(vec![
        manager.register_plugin(Box::new(sources::SourcesPlugin))?,
        manager.register_plugin(Box::new(filters::FiltersPlugin))?,
        manager.register_plugin(Box::new(features::FeaturesPlugin))?,
    ])
}
