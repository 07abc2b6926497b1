//! VisionBox command line front end

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};
use visionbox::{App, AppConfig};

/// Evaluate VisionBox image-processing graphs
#[derive(Debug, Parser)]
#[command(name = "visionbox")]
#[command(version, about)]
struct Cli {
    /// Graph file (.vbjson) to load and evaluate
    graph: Option<PathBuf>,

    /// Additional plugin directory; may be repeated
    #[arg(long = "plugin-dir", value_name = "DIR")]
    plugin_dirs: Vec<PathBuf>,

    /// Print loaded plugins and their node types, then exit
    #[arg(long)]
    list_plugins: bool,

    /// Skip ~/.visionbox/plugins, ./plugins and VISIONBOX_PLUGIN_PATH
    #[arg(long, env = "VISIONBOX_NO_DEFAULT_PLUGINS")]
    no_default_plugins: bool,

    /// Re-save the loaded graph to this path
    #[arg(long, value_name = "PATH", requires = "graph")]
    save: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(message) = run(cli) {
        error!("{}", message);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    let config = AppConfig {
        plugin_directories: cli.plugin_dirs,
        load_default_directories: !cli.no_default_plugins,
    };
    let mut app = App::new(config).map_err(|e| format!("failed to register built-in plugins: {}", e))?;

    if let Some(last) = app.plugins().last_error() {
        info!("Last plugin error: {}", last);
    }

    if cli.list_plugins {
        list_plugins(&app);
        return Ok(());
    }

    let Some(path) = cli.graph else {
        info!(
            "{} node types available; pass a graph file to evaluate it",
            app.registry().len()
        );
        return Ok(());
    };

    app.open(&path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
    app.settle();
    for line in app.graph_summary() {
        println!("{}", line);
    }

    if let Some(target) = cli.save {
        let written = app
            .save_as(&target)
            .map_err(|e| format!("failed to save {}: {}", target.display(), e))?;
        info!("Saved {}", written.display());
    }
    Ok(())
}

fn list_plugins(app: &App) {
    let registry = app.registry();
    for plugin in app.plugins().loaded_plugins() {
        println!("{} {} ({})", plugin.id, plugin.version, plugin.name);
        if !plugin.description.is_empty() {
            println!("    {}", plugin.description);
        }
        for type_name in registry.type_names() {
            if let Some(entry) = registry.entry(type_name).filter(|e| e.plugin_id == plugin.id) {
                println!("    - {} [{}] {}", type_name, entry.category, entry.factory.caption);
            }
        }
    }
}
