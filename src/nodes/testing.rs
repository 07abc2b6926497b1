//! Small node models used by unit tests

use visionbox_plugin_sdk::{
    ComputeError, DataType, NodeData, NodeFactory, NodeModel, ParameterSet, Plugin, PluginInfo,
    PortDefinition,
};

use super::factory::NodeRegistry;
use crate::plugins::PluginManager;

/// Forwards its single image input
#[derive(Debug)]
pub struct PassThroughModel {
    parameters: ParameterSet,
}

impl Default for PassThroughModel {
    fn default() -> Self {
        Self {
            parameters: ParameterSet::new(Vec::new()),
        }
    }
}

impl NodeModel for PassThroughModel {
    fn type_name(&self) -> &str {
        "PassThroughModel"
    }

    fn caption(&self) -> &str {
        "Pass Through"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::required("Image", DataType::Image)]
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        Ok(vec![inputs[0].clone()])
    }
}

/// Two image inputs, forwards the first
#[derive(Debug, Default)]
pub struct JoinModel {
    inner: PassThroughModel,
}

impl NodeModel for JoinModel {
    fn type_name(&self) -> &str {
        "JoinModel"
    }

    fn caption(&self) -> &str {
        "Join"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition::required("A", DataType::Image),
            PortDefinition::required("B", DataType::Image),
        ]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        self.inner.output_ports()
    }

    fn parameters(&self) -> &ParameterSet {
        self.inner.parameters()
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        self.inner.parameters_mut()
    }

    fn compute(&mut self, inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        Ok(vec![inputs[0].clone()])
    }
}

/// Panics on every computation
#[derive(Debug, Default)]
pub struct PanickingModel {
    inner: PassThroughModel,
}

impl NodeModel for PanickingModel {
    fn type_name(&self) -> &str {
        "PanickingModel"
    }

    fn caption(&self) -> &str {
        "Panicking"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        self.inner.input_ports()
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        self.inner.output_ports()
    }

    fn parameters(&self) -> &ParameterSet {
        self.inner.parameters()
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        self.inner.parameters_mut()
    }

    fn compute(&mut self, _inputs: &[NodeData]) -> Result<Vec<NodeData>, ComputeError> {
        panic!("model bug");
    }
}

struct TestingPlugin;

impl Plugin for TestingPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new("visionbox.testing", "Testing", "0.0.0").with_categories(&["Testing"])
    }

    fn node_factories(&self) -> Vec<NodeFactory> {
        vec![
            NodeFactory::new("PassThroughModel", "Pass Through", || Box::new(PassThroughModel::default())),
            NodeFactory::new("JoinModel", "Join", || Box::new(JoinModel::default())),
            NodeFactory::new("PanickingModel", "Panicking", || Box::new(PanickingModel::default())),
        ]
    }
}

/// Registry with the built-in node types plus the test models above
pub fn test_registry() -> NodeRegistry {
    let manager = PluginManager::new();
    super::register_builtin_plugins(&manager).expect("built-in plugins register");
    manager
        .register_plugin(Box::new(TestingPlugin))
        .expect("testing plugin registers");
    NodeRegistry::from_plugins(&manager)
}
