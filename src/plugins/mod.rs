//! Plugin system for dynamic node loading

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use libloading::{Library, Symbol};
use log::{debug, error, info, warn};
use visionbox_plugin_sdk::{
    NodeFactory, NodeModel, Plugin, PluginError, PluginHandle, PluginInfo, API_VERSION_SYMBOL,
    CREATE_PLUGIN_SYMBOL, PLUGIN_API_VERSION,
};

use crate::constants;
use crate::nodes::factory::instantiate;

/// Node types contributed by one loaded plugin
#[derive(Clone)]
pub struct PluginNodeTypes {
    pub info: PluginInfo,
    pub factories: Vec<NodeFactory>,
    /// Library the factories live in; `None` for built-in plugins
    pub library: Option<Arc<Library>>,
}

/// Loaded plugin wrapper
struct LoadedPlugin {
    info: PluginInfo,
    path: Option<PathBuf>,
    factories: Vec<NodeFactory>,
    plugin: Box<dyn Plugin>,
    // Declared after `plugin` so the plugin object is dropped first.
    library: Option<Arc<Library>>,
}

#[derive(Default)]
struct Inner {
    plugins: Vec<LoadedPlugin>,
    directories: Vec<PathBuf>,
    last_error: Option<String>,
}

/// Plugin manager for loading and managing node plugins
#[derive(Default)]
pub struct PluginManager {
    inner: Mutex<Inner>,
}

impl PluginManager {
    /// Create a new plugin manager with no search directories
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager searching the given directories
    pub fn with_directories(directories: Vec<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                directories,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a plugin directory to search
    pub fn add_plugin_directory<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref().to_path_buf();
        let mut inner = self.lock();
        if !inner.directories.contains(&path) {
            inner.directories.push(path);
        }
    }

    pub fn plugin_directories(&self) -> Vec<PathBuf> {
        self.lock().directories.clone()
    }

    /// Message describing the most recent failed load
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Info about all loaded plugins, in load order
    pub fn loaded_plugins(&self) -> Vec<PluginInfo> {
        self.lock().plugins.iter().map(|p| p.info.clone()).collect()
    }

    pub fn plugin(&self, id: &str) -> Option<PluginInfo> {
        self.lock()
            .plugins
            .iter()
            .find(|p| p.info.id == id)
            .map(|p| p.info.clone())
    }

    pub fn plugin_count(&self) -> usize {
        self.lock().plugins.len()
    }

    /// Instantiates one model of every node type of every loaded plugin
    pub fn registered_node_models(&self) -> Vec<Box<dyn NodeModel>> {
        self.lock()
            .plugins
            .iter()
            .flat_map(|p| p.factories.iter().filter_map(instantiate))
            .collect()
    }

    /// Factories of every loaded plugin, in load order
    pub fn node_types(&self) -> Vec<PluginNodeTypes> {
        self.lock()
            .plugins
            .iter()
            .map(|p| PluginNodeTypes {
                info: p.info.clone(),
                factories: p.factories.clone(),
                library: p.library.clone(),
            })
            .collect()
    }

    /// Check if a file is a plugin library
    pub fn is_plugin_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| constants::plugin::LIBRARY_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }

    /// Registers a statically linked plugin
    pub fn register_plugin(&self, plugin: Box<dyn Plugin>) -> Result<PluginInfo, PluginError> {
        let mut inner = self.lock();
        let result = Self::admit(&mut inner, plugin, None, None);
        Self::record(&mut inner, result)
    }

    /// Load a specific plugin from path
    pub fn load_plugin<P: AsRef<Path>>(&self, path: P) -> Result<PluginInfo, PluginError> {
        let path = path.as_ref();
        let mut inner = self.lock();
        let result = Self::open(&inner, path).and_then(|(plugin, library)| {
            Self::admit(&mut inner, plugin, Some(path.to_path_buf()), Some(Arc::new(library)))
        });
        Self::record(&mut inner, result)
    }

    /// Loads every plugin library directly inside `dir`, in file name order.
    /// Returns the number of plugins loaded.
    pub fn load_plugins_from_directory<P: AsRef<Path>>(&self, dir: P) -> usize {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping plugin directory {}: {}", dir.display(), e);
                return 0;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && Self::is_plugin_file(path))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match self.load_plugin(&path) {
                Ok(info) => {
                    info!("Loaded plugin {} v{} from {}", info.name, info.version, path.display());
                    loaded += 1;
                }
                Err(e) => warn!("Failed to load plugin {}: {}", path.display(), e),
            }
        }
        loaded
    }

    /// Scan every configured directory. Returns the number of plugins loaded.
    pub fn discover_and_load_plugins(&self) -> usize {
        self.plugin_directories()
            .iter()
            .map(|dir| self.load_plugins_from_directory(dir))
            .sum()
    }

    /// Cleans up every plugin in reverse load order and releases the libraries
    pub fn unload_all_plugins(&self) {
        let plugins = std::mem::take(&mut self.lock().plugins);

        for mut loaded in plugins.into_iter().rev() {
            let id = loaded.info.id.clone();
            let plugin = &mut loaded.plugin;
            match panic::catch_unwind(AssertUnwindSafe(|| plugin.cleanup())) {
                Ok(Ok(())) => debug!("Unloaded plugin {}", id),
                Ok(Err(e)) => error!("Plugin {} cleanup failed: {}", id, e),
                Err(_) => error!("Plugin {} panicked during cleanup", id),
            }
        }
    }

    /// Opens a library and takes its plugin object
    fn open(inner: &Inner, path: &Path) -> Result<(Box<dyn Plugin>, Library), PluginError> {
        let display = path.display().to_string();
        if !Self::is_plugin_file(path) {
            return Err(PluginError::InvalidFileType(display));
        }
        if inner.plugins.iter().any(|p| p.path.as_deref() == Some(path)) {
            return Err(PluginError::AlreadyLoaded(display));
        }
        if !path.exists() {
            return Err(PluginError::NotFound(display));
        }

        // Loading runs the library's initializers
        let library = unsafe { Library::new(path) }.map_err(|e| PluginError::LoadError(e.to_string()))?;

        let version = unsafe {
            let symbol: Symbol<unsafe extern "C" fn() -> u32> = library
                .get(API_VERSION_SYMBOL)
                .map_err(|e| PluginError::InterfaceMismatch(format!("missing version symbol: {}", e)))?;
            symbol()
        };
        if version != PLUGIN_API_VERSION {
            return Err(PluginError::InterfaceMismatch(format!(
                "plugin interface version {} is not supported (expected {})",
                version, PLUGIN_API_VERSION
            )));
        }

        let handle = unsafe {
            let symbol: Symbol<unsafe extern "C" fn() -> PluginHandle> = library
                .get(CREATE_PLUGIN_SYMBOL)
                .map_err(|e| PluginError::InterfaceMismatch(format!("missing constructor symbol: {}", e)))?;
            symbol()
        };
        if handle.is_null() {
            return Err(PluginError::InterfaceMismatch("constructor returned no plugin".to_string()));
        }

        // The version check above guarantees the handle layout
        let plugin = unsafe { handle.into_plugin() };
        Ok((plugin, library))
    }

    /// Validates, initializes and records a plugin object. Panics raised by
    /// the plugin's hooks are reported as initialization failures.
    fn admit(
        inner: &mut Inner,
        mut plugin: Box<dyn Plugin>,
        path: Option<PathBuf>,
        library: Option<Arc<Library>>,
    ) -> Result<PluginInfo, PluginError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| Self::prepare(inner, plugin.as_mut())))
            .unwrap_or_else(|_| Err(PluginError::InitError("plugin panicked during initialize".to_string())));

        let (info, factories) = match outcome {
            Ok(prepared) => prepared,
            Err(e) => {
                drop(plugin);
                drop(library);
                return Err(e);
            }
        };

        debug!("Plugin {} provides {} node types", info.id, factories.len());
        inner.plugins.push(LoadedPlugin {
            info: info.clone(),
            path,
            factories,
            plugin,
            library,
        });
        Ok(info)
    }

    fn prepare(inner: &Inner, plugin: &mut dyn Plugin) -> Result<(PluginInfo, Vec<NodeFactory>), PluginError> {
        let info = plugin.info();
        Self::validate(inner, &info, &*plugin)?;
        plugin.initialize().map_err(|e| match e {
            PluginError::InitError(message) => PluginError::InitError(message),
            other => PluginError::InitError(other.to_string()),
        })?;
        Ok((info, plugin.node_factories()))
    }

    fn validate(inner: &Inner, info: &PluginInfo, plugin: &dyn Plugin) -> Result<(), PluginError> {
        if info.id.trim().is_empty() {
            return Err(PluginError::Validation("plugin id is empty".to_string()));
        }
        if info.name.trim().is_empty() {
            return Err(PluginError::Validation(format!("plugin '{}' has no name", info.id)));
        }
        if inner.plugins.iter().any(|p| p.info.id == info.id) {
            return Err(PluginError::DuplicateId(info.id.clone()));
        }
        if !plugin.is_configured() {
            return Err(PluginError::NotConfigured(info.id.clone()));
        }
        for dependency in &info.dependencies {
            if !inner.plugins.iter().any(|p| &p.info.id == dependency) {
                return Err(PluginError::MissingDependency {
                    plugin: info.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    fn record(inner: &mut Inner, result: Result<PluginInfo, PluginError>) -> Result<PluginInfo, PluginError> {
        match &result {
            Ok(info) => {
                inner.last_error = None;
                debug!("Registered plugin {} ({})", info.id, info.name);
            }
            Err(e) => inner.last_error = Some(e.to_string()),
        }
        result
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        self.unload_all_plugins();
    }
}
