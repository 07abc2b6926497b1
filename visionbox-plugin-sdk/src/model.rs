//! The node model trait implemented by every node type.
//!
//! A node model only knows how to turn a slice of inputs into a vector of
//! outputs under its current parameters. Storing inputs, caching outputs,
//! failure handling and notification live in the host's shared node base.

use std::time::Duration;

use thiserror::Error;

use crate::data::{DataType, NodeData};
use crate::parameters::{ParameterError, ParameterSet};

/// Port definition for node creation
#[derive(Debug, Clone, PartialEq)]
pub struct PortDefinition {
    pub name: String,
    pub data_type: DataType,
    pub optional: bool,
}

impl PortDefinition {
    /// Create a required port
    pub fn required(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            optional: false,
        }
    }

    /// Create an optional port
    pub fn optional(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            optional: true,
        }
    }
}

/// Failure of a single computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("required input '{0}' is missing")]
    MissingInput(String),
    #[error(transparent)]
    ParameterOutOfRange(#[from] ParameterError),
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
    #[error("{0}")]
    Algorithm(String),
    #[error("i/o error: {0}")]
    Io(String),
}

impl ComputeError {
    /// Out-of-range error for limits that depend on the input rather than
    /// on the declared parameter range
    pub fn out_of_range(name: &str, value: impl ToString, min: impl ToString, max: impl ToString) -> Self {
        ComputeError::ParameterOutOfRange(ParameterError::OutOfRange {
            name: name.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        })
    }
}

impl From<std::io::Error> for ComputeError {
    fn from(e: std::io::Error) -> Self {
        ComputeError::Io(e.to_string())
    }
}

impl From<image::ImageError> for ComputeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => ComputeError::Io(io.to_string()),
            other => ComputeError::Algorithm(other.to_string()),
        }
    }
}

/// A computational node type.
///
/// `compute` receives one entry per input port (in port order). Required
/// inputs are guaranteed non-empty and every parameter is within its range
/// when `compute` is called. It must return exactly one value per output
/// port.
pub trait NodeModel: Send {
    /// Type name used by the registry and in graph files, e.g. `"BlurModel"`
    fn type_name(&self) -> &str;

    /// Human readable caption
    fn caption(&self) -> &str;

    /// Input ports. May depend on the current parameters.
    fn input_ports(&self) -> Vec<PortDefinition>;

    /// Output ports
    fn output_ports(&self) -> Vec<PortDefinition>;

    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Run the wrapped algorithm
    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError>;

    /// Whether output depends on previous runs as well as current inputs
    fn is_stateful(&self) -> bool {
        false
    }

    /// Discard state accumulated across runs
    fn reset(&mut self) {}

    /// Delay applied to recomputation after parameter edits
    fn debounce(&self) -> Option<Duration> {
        None
    }
}

/// Constructor for a node model
pub type NodeCreator = fn() -> Box<dyn NodeModel>;
