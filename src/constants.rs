//! Application-wide constants and default values

/// Plugin discovery constants
pub mod plugin {
    /// Shared-library extensions recognized as plugins
    pub const LIBRARY_EXTENSIONS: [&str; 3] = ["so", "dylib", "dll"];

    /// Environment variable holding extra plugin directories
    pub const PATH_ENV_VAR: &str = "VISIONBOX_PLUGIN_PATH";

    /// Plugin directory below the user's home directory
    pub const HOME_SUBDIR: &str = ".visionbox/plugins";

    /// Plugin directory relative to the working directory
    pub const LOCAL_DIR: &str = "./plugins";
}

/// Graph file constants
pub mod file {
    /// Extension of saved graphs
    pub const GRAPH_EXTENSION: &str = "vbjson";

    /// Format version written to saved graphs
    pub const FORMAT_VERSION: &str = "1.0";

    /// Creator string written to saved graphs
    pub const CREATOR: &str = concat!("VisionBox ", env!("CARGO_PKG_VERSION"));
}

/// Node model constants
pub mod node {
    use std::time::Duration;

    /// Recompute delay applied to sources that are cheap to edit but
    /// expensive to propagate
    pub const SOURCE_DEBOUNCE: Duration = Duration::from_millis(50);

    /// Largest accepted blur kernel
    pub const MAX_KERNEL_SIZE: i64 = 100;
}
