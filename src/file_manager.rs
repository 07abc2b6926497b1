//! File management for node graphs
//!
//! Handles the `.vbjson` document format, saving, loading and file state.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::file::{CREATOR, FORMAT_VERSION, GRAPH_EXTENSION};
use crate::nodes::{Connection, GraphError, GraphModel, NodeId, PortId, Position};

/// Metadata for save files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// RFC 3339 timestamp
    pub created: String,
    /// RFC 3339 timestamp
    pub modified: String,
    pub creator: String,
}

/// Node type name plus the model's saved parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalData {
    #[serde(rename = "model-name")]
    pub model_name: String,
    #[serde(flatten)]
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    #[serde(rename = "internal-data")]
    pub internal: InternalData,
}

impl NodeRecord {
    pub fn new(id: NodeId, position: Position, model_name: &str, parameters: Map<String, Value>) -> Self {
        Self {
            id,
            position,
            internal: InternalData {
                model_name: model_name.to_string(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub out_node_id: NodeId,
    pub out_port_index: PortId,
    pub in_node_id: NodeId,
    pub in_port_index: PortId,
}

impl From<&Connection> for ConnectionRecord {
    fn from(connection: &Connection) -> Self {
        Self {
            out_node_id: connection.from_node,
            out_port_index: connection.from_port,
            in_node_id: connection.to_node,
            in_port_index: connection.to_port,
        }
    }
}

impl From<ConnectionRecord> for Connection {
    fn from(record: ConnectionRecord) -> Self {
        Connection::new(
            record.out_node_id,
            record.out_port_index,
            record.in_node_id,
            record.in_port_index,
        )
    }
}

/// Serialized form of a graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SaveMetadata>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

impl GraphDocument {
    pub fn from_json(json: &str) -> Result<Self, FileError> {
        let document: GraphDocument = serde_json::from_str(json)?;
        if let Some(version) = &document.version {
            if version.split('.').next() != FORMAT_VERSION.split('.').next() {
                warn!("Graph file version {} may not be compatible with {}", version, FORMAT_VERSION);
            }
        }
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, FileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Errors raised while saving or loading graph files
#[derive(Debug, Error)]
pub enum FileError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid graph file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot restore graph: {0}")]
    Graph(#[from] GraphError),
    #[error("the graph has not been saved to a file yet")]
    NoPath,
}

/// Manages file operations for a graph
#[derive(Debug, Default)]
pub struct FileManager {
    /// Current file path (None if unsaved/new file)
    current_file_path: Option<PathBuf>,
    /// Whether the graph has been modified since last save
    is_modified: bool,
    /// Creation time of the current file
    created: Option<String>,
}

impl FileManager {
    /// Create a new file manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current file path
    pub fn current_file_path(&self) -> Option<&Path> {
        self.current_file_path.as_deref()
    }

    /// Check if there are unsaved changes
    pub fn has_unsaved_changes(&self) -> bool {
        self.is_modified
    }

    /// Mark the graph as modified
    pub fn mark_modified(&mut self) {
        self.is_modified = true;
    }

    /// Get display name for the current file
    pub fn display_name(&self) -> String {
        let name = self
            .current_file_path
            .as_ref()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or("Untitled");
        if self.is_modified {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }

    /// Forget the current file
    pub fn new_file(&mut self) {
        self.current_file_path = None;
        self.is_modified = false;
        self.created = None;
    }

    /// Adds the graph extension when `path` has none
    pub fn with_graph_extension(path: &Path) -> PathBuf {
        if path.extension().is_some() {
            path.to_path_buf()
        } else {
            path.with_extension(GRAPH_EXTENSION)
        }
    }

    /// Save the graph to a file and make it the current file
    pub fn save_to_file(&mut self, path: &Path, graph: &GraphModel) -> Result<PathBuf, FileError> {
        let path = Self::with_graph_extension(path);
        let now = chrono::Utc::now().to_rfc3339();
        let created = match (&self.current_file_path, &self.created) {
            (Some(current), Some(created)) if *current == path => created.clone(),
            _ => now.clone(),
        };

        let mut document = graph.to_document();
        document.version = Some(FORMAT_VERSION.to_string());
        document.metadata = Some(SaveMetadata {
            created: created.clone(),
            modified: now,
            creator: CREATOR.to_string(),
        });

        std::fs::write(&path, document.to_json()?)?;
        info!("Saved graph to {}", path.display());

        self.current_file_path = Some(path.clone());
        self.created = Some(created);
        self.is_modified = false;
        Ok(path)
    }

    /// Save to the current file
    pub fn save(&mut self, graph: &GraphModel) -> Result<PathBuf, FileError> {
        let path = self.current_file_path.clone().ok_or(FileError::NoPath)?;
        self.save_to_file(&path, graph)
    }

    /// Load a graph file into `graph`, replacing its contents
    pub fn load_from_file(&mut self, path: &Path, graph: &mut GraphModel) -> Result<(), FileError> {
        let content = std::fs::read_to_string(path)?;
        let document = GraphDocument::from_json(&content)?;
        graph.load_document(&document)?;
        info!("Loaded graph from {}", path.display());

        self.current_file_path = Some(path.to_path_buf());
        self.created = document.metadata.map(|m| m.created);
        self.is_modified = false;
        Ok(())
    }
}
