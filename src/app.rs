//! Application context: plugins, registry, graph and file state

use std::path::{Path, PathBuf};

use log::{debug, info};
use visionbox_plugin_sdk::PluginError;

use crate::constants;
use crate::file_manager::{FileError, FileManager};
use crate::nodes::{register_builtin_plugins, GraphModel, NodeRegistry};
use crate::plugins::PluginManager;

/// Plugin search configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Extra directories scanned after the defaults
    pub plugin_directories: Vec<PathBuf>,
    /// Scan `~/.visionbox/plugins`, `./plugins` and `VISIONBOX_PLUGIN_PATH`
    pub load_default_directories: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plugin_directories: Vec::new(),
            load_default_directories: true,
        }
    }
}

impl AppConfig {
    /// Standard plugin directories
    pub fn default_directories() -> Vec<PathBuf> {
        let mut directories = Vec::new();
        if let Some(home) = dirs::home_dir() {
            directories.push(home.join(constants::plugin::HOME_SUBDIR));
        }
        directories.push(PathBuf::from(constants::plugin::LOCAL_DIR));
        if let Some(paths) = std::env::var_os(constants::plugin::PATH_ENV_VAR) {
            directories.extend(std::env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
        }
        directories
    }

    /// Every directory to scan, without duplicates
    pub fn search_directories(&self) -> Vec<PathBuf> {
        let mut directories = if self.load_default_directories {
            Self::default_directories()
        } else {
            Vec::new()
        };
        for dir in &self.plugin_directories {
            if !directories.contains(dir) {
                directories.push(dir.clone());
            }
        }
        directories
    }
}

/// Everything a front end needs to edit and evaluate graphs
pub struct App {
    // Declared before `plugins` so nodes are dropped before their libraries
    // are cleaned up.
    graph: GraphModel,
    files: FileManager,
    plugins: PluginManager,
}

impl App {
    /// Registers the built-in plugins, scans plugin directories and creates
    /// an empty graph over the resulting registry
    pub fn new(config: AppConfig) -> Result<Self, PluginError> {
        let plugins = PluginManager::with_directories(config.search_directories());
        register_builtin_plugins(&plugins)?;

        let loaded = plugins.discover_and_load_plugins();
        debug!("Loaded {} plugin libraries", loaded);

        let registry = NodeRegistry::from_plugins(&plugins);
        info!(
            "{} plugins provide {} node types",
            plugins.plugin_count(),
            registry.len()
        );

        Ok(Self {
            graph: GraphModel::new(registry),
            files: FileManager::new(),
            plugins,
        })
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn registry(&self) -> &NodeRegistry {
        self.graph.registry()
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    /// Mutable graph access; marks the current file modified
    pub fn graph_mut(&mut self) -> &mut GraphModel {
        self.files.mark_modified();
        &mut self.graph
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    pub fn open(&mut self, path: &Path) -> Result<(), FileError> {
        self.files.load_from_file(path, &mut self.graph)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<PathBuf, FileError> {
        self.files.save_to_file(path, &self.graph)
    }

    pub fn save(&mut self) -> Result<PathBuf, FileError> {
        self.files.save(&self.graph)
    }

    /// Runs every recomputation still waiting on a debounce
    pub fn settle(&mut self) -> usize {
        self.graph.flush_pending()
    }

    /// One line per node: id, type, state, recompute count and outputs
    pub fn graph_summary(&self) -> Vec<String> {
        self.graph
            .nodes()
            .map(|node| {
                let outputs: Vec<String> = node.outputs().iter().map(|o| o.summary()).collect();
                format!(
                    "#{} {} [{:?}] computed {}x -> {}",
                    node.id,
                    node.type_name(),
                    node.state(),
                    node.compute_count(),
                    outputs.join(", ")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Connection;

    fn isolated() -> AppConfig {
        AppConfig {
            plugin_directories: Vec::new(),
            load_default_directories: false,
        }
    }

    #[test]
    fn test_search_directories() {
        let config = AppConfig {
            plugin_directories: vec![PathBuf::from("/opt/vb"), PathBuf::from("/opt/vb")],
            load_default_directories: false,
        };
        assert_eq!(config.search_directories(), vec![PathBuf::from("/opt/vb")]);

        let defaults = AppConfig::default().search_directories();
        assert!(defaults.contains(&PathBuf::from(constants::plugin::LOCAL_DIR)));
    }

    #[test]
    fn test_app_registers_builtins() {
        let app = App::new(isolated()).unwrap();
        assert_eq!(app.plugins().plugin_count(), 3);
        assert!(app.registry().contains("SolidColorModel"));
        assert!(app.graph().is_empty());
    }

    #[test]
    fn test_open_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(isolated()).unwrap();
        let graph = app.graph_mut();
        let source = graph.add_node("SolidColorModel").unwrap();
        let edges = graph.add_node("SobelEdgeModel").unwrap();
        graph.add_connection(Connection::new(source, 0, edges, 0)).unwrap();
        assert!(app.files().has_unsaved_changes());

        let path = app.save_as(&dir.path().join("edges.vbjson")).unwrap();

        let mut reopened = App::new(isolated()).unwrap();
        reopened.open(&path).unwrap();
        assert_eq!(reopened.graph().connections().len(), 1);
        let summary = reopened.graph_summary();
        assert_eq!(summary.len(), 2);
        assert!(summary[1].contains("image 64x64x1"));
    }
}
