//! Node registry built from the factories of loaded plugins

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use libloading::Library;
use log::{debug, error, warn};
use visionbox_plugin_sdk::{NodeFactory, NodeModel};

use super::node::{Node, NodeId};
use crate::plugins::{PluginManager, PluginNodeTypes};

/// Category used when neither the factory nor its plugin names one
pub const UNCATEGORIZED: &str = "Other";

/// One creatable node type
#[derive(Clone)]
pub struct RegistryEntry {
    pub factory: NodeFactory,
    pub category: String,
    /// Id of the plugin that provided the type
    pub plugin_id: String,
    library: Option<Arc<Library>>,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_name", &self.factory.type_name)
            .field("category", &self.category)
            .field("plugin_id", &self.plugin_id)
            .finish()
    }
}

/// Registry for managing node factories
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    entries: BTreeMap<String, RegistryEntry>,
    categories: BTreeMap<String, Vec<String>>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every node type of every plugin loaded in `manager`
    pub fn from_plugins(manager: &PluginManager) -> Self {
        let mut registry = Self::new();
        for node_types in manager.node_types() {
            registry.register_plugin(node_types);
        }
        registry
    }

    /// Registers the node types of one plugin. A type name that is already
    /// registered keeps its first factory.
    pub fn register_plugin(&mut self, node_types: PluginNodeTypes) {
        let PluginNodeTypes { info, factories, library } = node_types;
        let fallback = info
            .categories
            .first()
            .cloned()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        for factory in factories {
            if let Some(existing) = self.entries.get(&factory.type_name) {
                warn!(
                    "Node type '{}' from plugin {} is already provided by {}; ignoring",
                    factory.type_name, info.id, existing.plugin_id
                );
                continue;
            }

            let category = factory.category.clone().unwrap_or_else(|| fallback.clone());
            let type_name = factory.type_name.clone();
            self.categories
                .entry(category.clone())
                .or_default()
                .push(type_name.clone());
            self.entries.insert(
                type_name.clone(),
                RegistryEntry {
                    factory,
                    category,
                    plugin_id: info.id.clone(),
                    library: library.clone(),
                },
            );
            debug!("Registered node type {} from {}", type_name, info.id);
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn entry(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(type_name)
    }

    /// Create a node model by type name. `None` when the type is unknown or
    /// its constructor panicked.
    pub fn create(&self, type_name: &str) -> Option<Box<dyn NodeModel>> {
        self.entries.get(type_name).and_then(|entry| instantiate(&entry.factory))
    }

    /// Create a node instance that keeps its plugin library alive
    pub fn create_node(&self, id: NodeId, type_name: &str) -> Option<Node> {
        let entry = self.entries.get(type_name)?;
        let model = instantiate(&entry.factory)?;
        Some(Node::new(id, model, entry.library.clone()))
    }

    /// Get all available node types, sorted
    pub fn type_names(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    /// Get nodes in a specific category, in registration order
    pub fn nodes_in_category(&self, category: &str) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|nodes| nodes.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Get all categories, sorted
    pub fn categories(&self) -> Vec<&str> {
        self.categories.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Runs a factory's constructor, containing panics from plugin code
pub(crate) fn instantiate(factory: &NodeFactory) -> Option<Box<dyn NodeModel>> {
    match panic::catch_unwind(AssertUnwindSafe(|| factory.create())) {
        Ok(model) => Some(model),
        Err(_) => {
            error!("Panic occurred while creating node of type {}", factory.type_name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{PanickingModel, PassThroughModel};
    use visionbox_plugin_sdk::PluginInfo;

    fn node_types(id: &str, categories: &[&str], factories: Vec<NodeFactory>) -> PluginNodeTypes {
        PluginNodeTypes {
            info: PluginInfo::new(id, id, "1.0").with_categories(categories),
            factories,
            library: None,
        }
    }

    fn pass_through() -> NodeFactory {
        NodeFactory::new("PassThroughModel", "Pass Through", || Box::new(PassThroughModel::default()))
    }

    fn panicking() -> NodeFactory {
        NodeFactory::new("PanickingModel", "Panicking", || Box::new(PanickingModel::default()))
    }

    #[test]
    fn test_categories_fall_back_to_plugin() {
        let mut registry = NodeRegistry::new();
        registry.register_plugin(node_types(
            "test",
            &["Testing"],
            vec![pass_through(), panicking().with_category("Broken")],
        ));

        assert_eq!(registry.categories(), vec!["Broken", "Testing"]);
        assert_eq!(registry.nodes_in_category("Testing"), vec!["PassThroughModel"]);
        assert_eq!(registry.entry("PanickingModel").unwrap().category, "Broken");
    }

    #[test]
    fn test_uncategorized_plugin() {
        let mut registry = NodeRegistry::new();
        registry.register_plugin(node_types("test", &[], vec![pass_through()]));
        assert_eq!(registry.categories(), vec![UNCATEGORIZED]);
    }

    #[test]
    fn test_duplicate_type_keeps_first() {
        let mut registry = NodeRegistry::new();
        registry.register_plugin(node_types("first", &["A"], vec![pass_through()]));
        registry.register_plugin(node_types("second", &["B"], vec![pass_through()]));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entry("PassThroughModel").unwrap().plugin_id, "first");
        assert!(registry.nodes_in_category("B").is_empty());
    }

    #[test]
    fn test_create_by_type_name() {
        let mut registry = NodeRegistry::new();
        registry.register_plugin(node_types("test", &["Testing"], vec![pass_through()]));

        let model = registry.create("PassThroughModel").unwrap();
        assert_eq!(model.type_name(), "PassThroughModel");
        assert!(registry.create("Missing").is_none());

        let node = registry.create_node(7, "PassThroughModel").unwrap();
        assert_eq!(node.id, 7);
    }

    fn unconstructible() -> Box<dyn NodeModel> {
        panic!("constructor failed")
    }

    #[test]
    fn test_panicking_constructor_is_contained() {
        let mut registry = NodeRegistry::new();
        registry.register_plugin(node_types(
            "test",
            &["Testing"],
            vec![NodeFactory::new("BrokenModel", "Broken", unconstructible)],
        ));

        assert!(registry.contains("BrokenModel"));
        assert!(registry.create("BrokenModel").is_none());
        assert!(registry.create_node(0, "BrokenModel").is_none());
    }

    #[test]
    fn test_from_builtin_plugins() {
        let manager = PluginManager::new();
        crate::nodes::register_builtin_plugins(&manager).unwrap();
        let registry = NodeRegistry::from_plugins(&manager);

        assert!(registry.contains("BlurModel"));
        assert!(registry.contains("CornerDetectorModel"));
        assert_eq!(registry.categories(), vec!["Feature Detection", "Filters", "Sources"]);
        assert_eq!(registry.len(), manager.registered_node_models().len());
    }
}
