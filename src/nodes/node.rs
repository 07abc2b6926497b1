//! Node instances and the propagation contract shared by every node model

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use libloading::Library;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeModel, ParameterError, ParameterSet, ParameterValue,
    PortDefinition,
};

use super::port::{PortDirection, PortId};

/// Unique identifier for a node
pub type NodeId = usize;

/// Canvas position of a node. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Outcome of the most recent computation
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    /// Never computed
    Uninitialized,
    /// Outputs hold the result of the last computation
    Valid,
    /// A required input or setting is missing; outputs are empty
    MissingInput(String),
    /// The last computation failed; outputs are empty
    Failed(String),
}

impl NodeState {
    pub fn is_valid(&self) -> bool {
        matches!(self, NodeState::Valid)
    }
}

/// Errors raised by operations on a single node
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("node has no {direction} port {index}")]
    PortOutOfRange { direction: PortDirection, index: PortId },
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("node type '{0}' keeps no state to reset")]
    NotStateful(String),
}

/// Result of a parameter edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParameterUpdate {
    /// The stored value differs from the previous one
    pub changed: bool,
    /// The node's port lists changed as a consequence
    pub ports_changed: bool,
}

/// A node model placed in a graph.
///
/// Owns the model, the artifacts stored on each input port and the cached
/// artifact of each output port.
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    model: Box<dyn NodeModel>,
    input_ports: Vec<PortDefinition>,
    output_ports: Vec<PortDefinition>,
    inputs: Vec<NodeData>,
    outputs: Vec<NodeData>,
    state: NodeState,
    compute_count: u64,
    // Declared after `model` so the model is dropped before its library.
    _library: Option<Arc<Library>>,
}

impl Node {
    /// Creates a node around a model. `library` keeps the plugin library
    /// that provided the model loaded for as long as the node lives.
    pub fn new(id: NodeId, model: Box<dyn NodeModel>, library: Option<Arc<Library>>) -> Self {
        let input_ports = model.input_ports();
        let output_ports = model.output_ports();
        Self {
            id,
            position: Position::default(),
            inputs: vec![NodeData::None; input_ports.len()],
            outputs: vec![NodeData::None; output_ports.len()],
            input_ports,
            output_ports,
            model,
            state: NodeState::Uninitialized,
            compute_count: 0,
            _library: library,
        }
    }

    pub fn type_name(&self) -> &str {
        self.model.type_name()
    }

    pub fn caption(&self) -> &str {
        self.model.caption()
    }

    pub fn input_ports(&self) -> &[PortDefinition] {
        &self.input_ports
    }

    pub fn output_ports(&self) -> &[PortDefinition] {
        &self.output_ports
    }

    pub fn port_count(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::Input => self.input_ports.len(),
            PortDirection::Output => self.output_ports.len(),
        }
    }

    pub fn port_type(&self, direction: PortDirection, index: PortId) -> Option<&DataType> {
        let ports = match direction {
            PortDirection::Input => &self.input_ports,
            PortDirection::Output => &self.output_ports,
        };
        ports.get(index).map(|port| &port.data_type)
    }

    pub fn input_count(&self) -> usize {
        self.port_count(PortDirection::Input)
    }

    pub fn output_count(&self) -> usize {
        self.port_count(PortDirection::Output)
    }

    pub fn input_type(&self, index: PortId) -> Option<&DataType> {
        self.port_type(PortDirection::Input, index)
    }

    pub fn output_type(&self, index: PortId) -> Option<&DataType> {
        self.port_type(PortDirection::Output, index)
    }

    pub fn parameters(&self) -> &ParameterSet {
        self.model.parameters()
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Number of recomputations since creation
    pub fn compute_count(&self) -> u64 {
        self.compute_count
    }

    pub fn is_stateful(&self) -> bool {
        self.model.is_stateful()
    }

    pub fn debounce(&self) -> Option<Duration> {
        self.model.debounce()
    }

    pub fn inputs(&self) -> &[NodeData] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeData] {
        &self.outputs
    }

    /// Most recent artifact on an output port; `None` when empty or out of range
    pub fn output(&self, port: PortId) -> NodeData {
        self.outputs.get(port).cloned().unwrap_or_default()
    }

    /// Stores an input artifact without recomputing
    pub fn store_input(&mut self, port: PortId, data: NodeData) -> Result<(), NodeError> {
        let slot = self.inputs.get_mut(port).ok_or(NodeError::PortOutOfRange {
            direction: PortDirection::Input,
            index: port,
        })?;
        *slot = data;
        Ok(())
    }

    /// Stores an input artifact and recomputes every output
    pub fn set_input(&mut self, port: PortId, data: NodeData) -> Result<(), NodeError> {
        self.store_input(port, data)?;
        self.recompute();
        Ok(())
    }

    /// True when `inputs` refer to exactly the artifacts already stored
    pub fn inputs_match(&self, inputs: &[NodeData]) -> bool {
        self.inputs.len() == inputs.len()
            && self.inputs.iter().zip(inputs).all(|(a, b)| a.same_as(b))
    }

    /// Edits a parameter without recomputing. Port lists are refreshed so
    /// callers can drop connections to ports that disappeared.
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<ParameterUpdate, NodeError> {
        let changed = self.model.parameters_mut().set(name, value)?;
        let ports_changed = self.sync_ports();
        Ok(ParameterUpdate { changed, ports_changed })
    }

    /// User-editable parameters as a JSON object
    pub fn save(&self) -> Map<String, Value> {
        self.model.parameters().to_json()
    }

    /// Restores parameters and recomputes once
    pub fn load(&mut self, object: &Map<String, Value>) -> Result<(), NodeError> {
        self.model.parameters_mut().load_json(object)?;
        self.sync_ports();
        self.recompute();
        Ok(())
    }

    /// Discards accumulated state and recomputes
    pub fn reset(&mut self) -> Result<(), NodeError> {
        if !self.model.is_stateful() {
            return Err(NodeError::NotStateful(self.type_name().to_string()));
        }
        self.model.reset();
        self.recompute();
        Ok(())
    }

    /// Recomputes every output from the stored inputs.
    ///
    /// Any failure leaves all outputs empty so downstream nodes clear too.
    pub fn recompute(&mut self) {
        self.compute_count += 1;

        if let Some(reason) = self.check_inputs() {
            debug!("Node {} ({}): {}", self.id, self.type_name(), reason);
            self.clear_outputs();
            self.state = NodeState::MissingInput(reason);
            return;
        }

        if let Err(e) = self.model.parameters().validate() {
            self.fail(ComputeError::from(e));
            return;
        }

        let inputs = self.inputs.clone();
        let model = &mut self.model;
        let result = panic::catch_unwind(AssertUnwindSafe(|| model.compute(&inputs)));

        match result {
            Ok(Ok(outputs)) if outputs.len() == self.outputs.len() => {
                self.outputs = outputs;
                self.state = NodeState::Valid;
            }
            Ok(Ok(outputs)) => {
                let expected = self.outputs.len();
                self.fail(ComputeError::Algorithm(format!(
                    "produced {} outputs, expected {}",
                    outputs.len(),
                    expected
                )));
            }
            Ok(Err(e)) => self.fail(e),
            Err(_) => self.fail(ComputeError::Algorithm("node model panicked".to_string())),
        }
    }

    fn check_inputs(&self) -> Option<String> {
        for (port, data) in self.input_ports.iter().zip(&self.inputs) {
            match data.data_type() {
                None if !port.optional => return Some(format!("input '{}' is empty", port.name)),
                Some(actual) if !matches!(port.data_type, DataType::Custom(_)) && actual != port.data_type => {
                    return Some(format!(
                        "input '{}' expects {} but received {}",
                        port.name, port.data_type, actual
                    ));
                }
                _ => {}
            }
        }
        None
    }

    fn fail(&mut self, error: ComputeError) {
        self.clear_outputs();
        match error {
            ComputeError::MissingInput(_) => {
                debug!("Node {} ({}): {}", self.id, self.type_name(), error);
                self.state = NodeState::MissingInput(error.to_string());
            }
            _ => {
                warn!("Node {} ({}) failed: {}", self.id, self.type_name(), error);
                self.state = NodeState::Failed(error.to_string());
            }
        }
    }

    fn clear_outputs(&mut self) {
        self.outputs.iter_mut().for_each(|o| *o = NodeData::None);
    }

    fn sync_ports(&mut self) -> bool {
        let input_ports = self.model.input_ports();
        let output_ports = self.model.output_ports();
        let changed = input_ports != self.input_ports || output_ports != self.output_ports;

        if changed {
            self.inputs.resize(input_ports.len(), NodeData::None);
            self.outputs.resize(output_ports.len(), NodeData::None);
            self.input_ports = input_ports;
            self.output_ports = output_ports;
        }
        changed
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_name", &self.type_name())
            .field("position", &self.position)
            .field("state", &self.state)
            .field("compute_count", &self.compute_count)
            .finish()
    }
}
