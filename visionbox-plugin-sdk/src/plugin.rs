//! Plugin interface consumed by the host's plugin manager.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{NodeCreator, NodeModel};

/// Metadata describing a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    /// Free-text tags used to group the plugin's nodes
    pub categories: Vec<String>,
    /// Ids of plugins that must be loaded first
    pub dependencies: Vec<String>,
}

impl PluginInfo {
    pub fn new(id: &str, name: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: String::new(),
            author: String::new(),
            categories: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Factory for one node type provided by a plugin
#[derive(Debug, Clone)]
pub struct NodeFactory {
    pub type_name: String,
    pub caption: String,
    /// Palette category. Falls back to the plugin's first category.
    pub category: Option<String>,
    pub create: NodeCreator,
}

impl NodeFactory {
    pub fn new(type_name: &str, caption: &str, create: NodeCreator) -> Self {
        Self {
            type_name: type_name.to_string(),
            caption: caption.to_string(),
            category: None,
            create,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn create(&self) -> Box<dyn NodeModel> {
        (self.create)()
    }
}

/// Errors raised while loading, validating or running a plugin
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PluginError {
    #[error("'{0}' is not a shared library")]
    InvalidFileType(String),
    #[error("plugin file '{0}' does not exist")]
    NotFound(String),
    #[error("plugin '{0}' is already loaded")]
    AlreadyLoaded(String),
    #[error("failed to load library: {0}")]
    LoadError(String),
    #[error("plugin interface mismatch: {0}")]
    InterfaceMismatch(String),
    #[error("invalid plugin: {0}")]
    Validation(String),
    #[error("a plugin with id '{0}' is already loaded")]
    DuplicateId(String),
    #[error("plugin '{0}' is not configured")]
    NotConfigured(String),
    #[error("plugin '{plugin}' depends on '{dependency}', which is not loaded")]
    MissingDependency { plugin: String, dependency: String },
    #[error("plugin initialization failed: {0}")]
    InitError(String),
    #[error("{0}")]
    Other(String),
}

/// A bundle of node types
pub trait Plugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    /// Whether the plugin has everything it needs to run
    fn is_configured(&self) -> bool {
        true
    }

    /// Called once after validation, before any node is created
    fn initialize(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once before the plugin is unloaded
    fn cleanup(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// One factory per node type, in a fixed order
    fn node_factories(&self) -> Vec<NodeFactory>;
}

/// Owned plugin object passed across the library boundary
#[repr(C)]
pub struct PluginHandle {
    plugin: *mut Box<dyn Plugin>,
}

impl PluginHandle {
    pub fn new(plugin: Box<dyn Plugin>) -> Self {
        Self {
            plugin: Box::into_raw(Box::new(plugin)),
        }
    }

    pub fn is_null(&self) -> bool {
        self.plugin.is_null()
    }

    /// Take ownership of the plugin object.
    ///
    /// # Safety
    ///
    /// The handle must have been produced by [`PluginHandle::new`] in a
    /// library built against this SDK version, and must not be used again.
    pub unsafe fn into_plugin(self) -> Box<dyn Plugin> {
        *Box::from_raw(self.plugin)
    }
}

/// Export a plugin type from a `cdylib`.
///
/// ```ignore
/// visionbox_plugin_sdk::declare_plugin!(MyPlugin::default);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($constructor:path) => {
        #[no_mangle]
        pub extern "C" fn visionbox_plugin_api_version() -> u32 {
            $crate::PLUGIN_API_VERSION
        }

        #[no_mangle]
        pub extern "C" fn visionbox_create_plugin() -> $crate::PluginHandle {
            let plugin: Box<dyn $crate::Plugin> = Box::new($constructor());
            $crate::PluginHandle::new(plugin)
        }
    };
}
