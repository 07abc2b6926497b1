//! Port identifiers and directions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a port within its node's input or output list
pub type PortId = usize;

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// Checks if this is an input direction
    pub fn is_input(&self) -> bool {
        matches!(self, PortDirection::Input)
    }

    /// Checks if this is an output direction
    pub fn is_output(&self) -> bool {
        matches!(self, PortDirection::Output)
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}
