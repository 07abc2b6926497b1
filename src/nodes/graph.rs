//! Graph model: owns nodes and connections and drives propagation

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use visionbox_plugin_sdk::{DataType, NodeData, ParameterError, ParameterValue};

use super::execution_engine::{ExecutionEngine, ExecutionStats};
use super::factory::NodeRegistry;
use super::node::{Node, NodeError, NodeId, NodeState, Position};
use super::port::{PortDirection, PortId};
use crate::file_manager::{ConnectionRecord, GraphDocument, NodeRecord};

/// Represents a connection between two ports on different nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_port: PortId,
    pub to_node: NodeId,
    pub to_port: PortId,
}

impl Connection {
    /// Creates a new connection
    pub fn new(from_node: NodeId, from_port: PortId, to_node: NodeId, to_port: PortId) -> Self {
        Self {
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Whether either end of the connection is `node_id`
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

/// Notifications emitted by graph mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    NodeCreated(NodeId),
    NodeDeleted(NodeId),
    ConnectionCreated(Connection),
    ConnectionDeleted(Connection),
    /// The node recomputed; its outputs may have changed
    NodeUpdated(NodeId),
}

/// Structural and lookup errors. A failed operation leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),
    #[error("constructor for node type '{0}' failed")]
    NodeCreationFailed(String),
    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),
    #[error("node {node} has no {direction} port {port}")]
    PortOutOfRange {
        node: NodeId,
        direction: PortDirection,
        port: PortId,
    },
    #[error("cannot connect node {0} to itself")]
    SelfConnection(NodeId),
    #[error("cannot connect {from} output to {to} input")]
    TypeMismatch { from: DataType, to: DataType },
    #[error("input port {port} of node {node} is already connected")]
    PortOccupied { node: NodeId, port: PortId },
    #[error("connection would create a cycle")]
    WouldCreateCycle,
    #[error("connection {0:?} does not exist")]
    ConnectionNotFound(Connection),
    #[error("node id {0} is already in use")]
    DuplicateNodeId(NodeId),
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error("node type '{0}' keeps no state to reset")]
    NotStateful(String),
}

impl GraphError {
    fn from_node(node: NodeId, error: NodeError) -> Self {
        match error {
            NodeError::PortOutOfRange { direction, index } => GraphError::PortOutOfRange {
                node,
                direction,
                port: index,
            },
            NodeError::Parameter(e) => GraphError::Parameter(e),
            NodeError::NotStateful(type_name) => GraphError::NotStateful(type_name),
        }
    }
}

/// A graph of node instances created through a registry
pub struct GraphModel {
    registry: NodeRegistry,
    nodes: BTreeMap<NodeId, Node>,
    connections: Vec<Connection>,
    next_node_id: NodeId,
    engine: ExecutionEngine,
    events: Vec<GraphEvent>,
    /// Debounced recomputations: node -> deadline
    pending: BTreeMap<NodeId, Instant>,
}

impl GraphModel {
    /// Creates a new empty graph
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            registry,
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            next_node_id: 0,
            engine: ExecutionEngine::new(),
            events: Vec::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> ExecutionStats {
        self.engine.stats()
    }

    /// Drains queued events
    pub fn take_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Artifact on a node's output port
    pub fn output(&self, node_id: NodeId, port: PortId) -> Result<NodeData, GraphError> {
        let node = self.get(node_id)?;
        if port >= node.port_count(PortDirection::Output) {
            return Err(GraphError::PortOutOfRange {
                node: node_id,
                direction: PortDirection::Output,
                port,
            });
        }
        Ok(node.output(port))
    }

    pub fn node_state(&self, node_id: NodeId) -> Result<&NodeState, GraphError> {
        Ok(self.get(node_id)?.state())
    }

    /// Adds a node of the given type at the origin
    pub fn add_node(&mut self, type_name: &str) -> Result<NodeId, GraphError> {
        self.add_node_at(type_name, Position::default())
    }

    /// Adds a node of the given type and returns its ID
    pub fn add_node_at(&mut self, type_name: &str, position: Position) -> Result<NodeId, GraphError> {
        let id = self.next_node_id;
        self.insert_node(id, type_name, position)?;
        self.recompute_from(&[id]);
        Ok(id)
    }

    /// Adds a node with a specific id, used when restoring saved graphs
    pub(crate) fn insert_node(&mut self, id: NodeId, type_name: &str, position: Position) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        if !self.registry.contains(type_name) {
            return Err(GraphError::UnknownNodeType(type_name.to_string()));
        }
        let mut node = self
            .registry
            .create_node(id, type_name)
            .ok_or_else(|| GraphError::NodeCreationFailed(type_name.to_string()))?;
        node.position = position;

        self.nodes.insert(id, node);
        if id >= self.next_node_id {
            self.next_node_id = id + 1;
        }
        self.events.push(GraphEvent::NodeCreated(id));
        debug!("Created node {} ({})", id, type_name);
        Ok(())
    }

    /// Removes a node and all its connections
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.get(node_id)?;

        let touching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.touches(node_id))
            .copied()
            .collect();
        let mut downstream = Vec::new();
        for connection in touching {
            self.connections.retain(|c| *c != connection);
            self.events.push(GraphEvent::ConnectionDeleted(connection));
            if connection.to_node != node_id {
                downstream.push(connection.to_node);
            }
        }

        self.nodes.remove(&node_id);
        self.pending.remove(&node_id);
        self.events.push(GraphEvent::NodeDeleted(node_id));
        info!("Deleted node {}", node_id);

        if !downstream.is_empty() {
            self.recompute_from(&downstream);
        }
        Ok(())
    }

    /// Checks whether a connection could be added, without adding it
    pub fn validate_connection(&self, connection: &Connection) -> Result<(), GraphError> {
        if connection.from_node == connection.to_node {
            return Err(GraphError::SelfConnection(connection.from_node));
        }

        let source = self.get(connection.from_node)?;
        let target = self.get(connection.to_node)?;

        let from_type = source
            .port_type(PortDirection::Output, connection.from_port)
            .ok_or(GraphError::PortOutOfRange {
                node: connection.from_node,
                direction: PortDirection::Output,
                port: connection.from_port,
            })?;
        let to_type = target
            .port_type(PortDirection::Input, connection.to_port)
            .ok_or(GraphError::PortOutOfRange {
                node: connection.to_node,
                direction: PortDirection::Input,
                port: connection.to_port,
            })?;

        if !from_type.can_connect_to(to_type) {
            return Err(GraphError::TypeMismatch {
                from: from_type.clone(),
                to: to_type.clone(),
            });
        }

        if self
            .connections
            .iter()
            .any(|c| c.to_node == connection.to_node && c.to_port == connection.to_port)
        {
            return Err(GraphError::PortOccupied {
                node: connection.to_node,
                port: connection.to_port,
            });
        }

        if ExecutionEngine::would_create_cycle(connection.from_node, connection.to_node, &self.connections) {
            return Err(GraphError::WouldCreateCycle);
        }
        Ok(())
    }

    /// Adds a connection and seeds the target with the source's output
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), GraphError> {
        self.validate_connection(&connection)?;

        self.connections.push(connection);
        self.events.push(GraphEvent::ConnectionCreated(connection));
        debug!("Connected {:?}", connection);

        self.recompute_from(&[connection.to_node]);
        Ok(())
    }

    /// Removes a connection; the target's input becomes empty
    pub fn delete_connection(&mut self, connection: &Connection) -> Result<(), GraphError> {
        let index = self
            .connections
            .iter()
            .position(|c| c == connection)
            .ok_or(GraphError::ConnectionNotFound(*connection))?;

        self.connections.remove(index);
        self.events.push(GraphEvent::ConnectionDeleted(*connection));
        debug!("Disconnected {:?}", connection);

        self.recompute_from(&[connection.to_node]);
        Ok(())
    }

    /// Edits a node parameter and propagates the change.
    ///
    /// If the edit changes the node's ports, connections to ports that no
    /// longer exist or whose type changed are deleted first. Nodes with a
    /// debounce interval are scheduled instead of recomputed; see
    /// [`GraphModel::process_pending`].
    pub fn set_parameter(&mut self, node_id: NodeId, name: &str, value: ParameterValue) -> Result<(), GraphError> {
        self.set_parameter_at(node_id, name, value, Instant::now())
    }

    /// [`GraphModel::set_parameter`] with an explicit clock reading
    pub fn set_parameter_at(
        &mut self,
        node_id: NodeId,
        name: &str,
        value: ParameterValue,
        now: Instant,
    ) -> Result<(), GraphError> {
        let node = self.get_mut(node_id)?;
        let update = node
            .set_parameter(name, value)
            .map_err(|e| GraphError::from_node(node_id, e))?;
        let debounce = node.debounce();

        if update.ports_changed {
            self.drop_stale_connections(node_id);
        }

        match debounce {
            Some(interval) if !update.ports_changed => {
                self.pending.insert(node_id, now + interval);
                debug!("Node {} recompute deferred by {:?}", node_id, interval);
            }
            _ => self.recompute_from(&[node_id]),
        }
        Ok(())
    }

    /// Runs debounced recomputations whose deadline has passed. Returns the
    /// number of nodes that were due.
    pub fn process_pending(&mut self, now: Instant) -> usize {
        let due: Vec<NodeId> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &due {
            self.pending.remove(id);
        }
        if !due.is_empty() {
            self.recompute_from(&due);
        }
        due.len()
    }

    /// Time until the next debounced recomputation is due
    pub fn next_pending_deadline(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .min()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Runs every pending recomputation regardless of deadline
    pub fn flush_pending(&mut self) -> usize {
        let due: Vec<NodeId> = std::mem::take(&mut self.pending).into_keys().collect();
        if !due.is_empty() {
            self.recompute_from(&due);
        }
        due.len()
    }

    /// Discards accumulated state of a stateful node and propagates
    pub fn reset_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.get(node_id)?;
        if !node.is_stateful() {
            return Err(GraphError::NotStateful(node.type_name().to_string()));
        }
        self.get_mut(node_id)?
            .reset()
            .map_err(|e| GraphError::from_node(node_id, e))?;
        self.events.push(GraphEvent::NodeUpdated(node_id));
        let downstream: Vec<NodeId> = self
            .connections
            .iter()
            .filter(|c| c.from_node == node_id)
            .map(|c| c.to_node)
            .collect();
        if !downstream.is_empty() {
            self.recompute_from(&downstream);
        }
        Ok(())
    }

    /// Recomputes every node, sources first
    pub fn recompute_all(&mut self) {
        let roots = self.node_ids();
        self.recompute_from(&roots);
    }

    /// Removes every node and connection
    pub fn clear(&mut self) {
        for connection in std::mem::take(&mut self.connections) {
            self.events.push(GraphEvent::ConnectionDeleted(connection));
        }
        for id in std::mem::take(&mut self.nodes).into_keys() {
            self.events.push(GraphEvent::NodeDeleted(id));
        }
        self.pending.clear();
        self.next_node_id = 0;
    }

    /// Restores saved parameters on a node and propagates
    pub fn load_node_parameters(
        &mut self,
        node_id: NodeId,
        parameters: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), GraphError> {
        let node = self.get_mut(node_id)?;
        node.load(parameters).map_err(|e| GraphError::from_node(node_id, e))?;
        self.events.push(GraphEvent::NodeUpdated(node_id));

        let downstream: Vec<NodeId> = self
            .connections
            .iter()
            .filter(|c| c.from_node == node_id)
            .map(|c| c.to_node)
            .collect();
        if !downstream.is_empty() {
            self.recompute_from(&downstream);
        }
        Ok(())
    }

    /// Snapshot of every node and connection for saving
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            version: None,
            metadata: None,
            nodes: self
                .nodes
                .values()
                .map(|node| NodeRecord::new(node.id, node.position, node.type_name(), node.save()))
                .collect(),
            connections: self.connections.iter().map(ConnectionRecord::from).collect(),
        }
    }

    /// Replaces the graph with the contents of `document`.
    ///
    /// Nodes keep their recorded ids and are computed once with their saved
    /// parameters; connections are then added in recorded order. On error
    /// the graph is left empty.
    pub fn load_document(&mut self, document: &GraphDocument) -> Result<(), GraphError> {
        self.clear();
        let result = self.restore(document);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn restore(&mut self, document: &GraphDocument) -> Result<(), GraphError> {
        for record in &document.nodes {
            self.insert_node(record.id, &record.internal.model_name, record.position)?;
            self.load_node_parameters(record.id, &record.internal.parameters)?;
        }
        for record in &document.connections {
            self.add_connection(Connection::from(*record))?;
        }
        info!(
            "Loaded graph with {} nodes and {} connections",
            self.nodes.len(),
            self.connections.len()
        );
        Ok(())
    }

    fn drop_stale_connections(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get(&node_id) else {
            return;
        };

        let stale: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.touches(node_id))
            .filter(|c| {
                let (source_type, target_type) = if c.to_node == node_id {
                    (
                        self.nodes.get(&c.from_node).and_then(|n| n.port_type(PortDirection::Output, c.from_port)),
                        node.port_type(PortDirection::Input, c.to_port),
                    )
                } else {
                    (
                        node.port_type(PortDirection::Output, c.from_port),
                        self.nodes.get(&c.to_node).and_then(|n| n.port_type(PortDirection::Input, c.to_port)),
                    )
                };
                !matches!((source_type, target_type), (Some(s), Some(t)) if s.can_connect_to(t))
            })
            .copied()
            .collect();

        let mut downstream = Vec::new();
        for connection in stale {
            info!("Removing connection {:?}: port no longer available", connection);
            self.connections.retain(|c| *c != connection);
            self.events.push(GraphEvent::ConnectionDeleted(connection));
            if connection.to_node != node_id {
                downstream.push(connection.to_node);
            }
        }
        if !downstream.is_empty() {
            self.recompute_from(&downstream);
        }
    }

    fn recompute_from(&mut self, roots: &[NodeId]) {
        let updated = self.engine.propagate(roots, &mut self.nodes, &self.connections);
        self.events.extend(updated.into_iter().map(GraphEvent::NodeUpdated));
    }

    fn get(&self, node_id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))
    }

    fn get_mut(&mut self, node_id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::test_registry;
    use crate::plugins::PluginNodeTypes;
    use image::{DynamicImage, RgbImage};
    use visionbox_plugin_sdk::{NodeFactory, PluginInfo};

    fn graph() -> GraphModel {
        GraphModel::new(test_registry())
    }

    /// SolidColor -> PassThrough -> PassThrough
    fn chain(graph: &mut GraphModel) -> (NodeId, NodeId, NodeId) {
        let a = graph.add_node("SolidColorModel").unwrap();
        let b = graph.add_node("PassThroughModel").unwrap();
        let c = graph.add_node("PassThroughModel").unwrap();
        graph.add_connection(Connection::new(a, 0, b, 0)).unwrap();
        graph.add_connection(Connection::new(b, 0, c, 0)).unwrap();
        (a, b, c)
    }

    #[test]
    fn test_add_node_unknown_type() {
        let mut graph = graph();
        assert_eq!(
            graph.add_node("NoSuchModel"),
            Err(GraphError::UnknownNodeType("NoSuchModel".to_string()))
        );
        assert!(graph.is_empty());
    }

    fn unconstructible() -> Box<dyn visionbox_plugin_sdk::NodeModel> {
        panic!("constructor failed")
    }

    #[test]
    fn test_failing_constructor_leaves_graph_unchanged() {
        let mut registry = test_registry();
        registry.register_plugin(PluginNodeTypes {
            info: PluginInfo::new("test.broken", "Broken", "1.0"),
            factories: vec![NodeFactory::new("BrokenModel", "Broken", unconstructible)],
            library: None,
        });
        let mut graph = GraphModel::new(registry);
        let existing = graph.add_node("SolidColorModel").unwrap();
        graph.take_events();

        assert_eq!(
            graph.add_node("BrokenModel"),
            Err(GraphError::NodeCreationFailed("BrokenModel".to_string()))
        );
        assert_eq!(graph.node_ids(), vec![existing]);
        assert!(graph.take_events().is_empty());

        let next = graph.add_node("PassThroughModel").unwrap();
        assert_eq!(next, existing + 1);
    }

    #[test]
    fn test_add_connection_seeds_propagation() {
        let mut graph = graph();
        let (a, b, c) = chain(&mut graph);

        let source = graph.output(a, 0).unwrap();
        assert!(source.is_some());
        assert!(graph.output(b, 0).unwrap().same_as(&source));
        assert!(graph.output(c, 0).unwrap().same_as(&source));
    }

    #[test]
    fn test_occupied_input_rejected_without_change() {
        let mut graph = graph();
        let (a, b, _) = chain(&mut graph);
        let other = graph.add_node("SolidColorModel").unwrap();
        let before = graph.connections().to_vec();

        assert_eq!(
            graph.add_connection(Connection::new(other, 0, b, 0)),
            Err(GraphError::PortOccupied { node: b, port: 0 })
        );
        assert_eq!(graph.connections(), before.as_slice());
        assert!(graph.connections().contains(&Connection::new(a, 0, b, 0)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut graph = graph();
        let corners = graph.add_node("CornerDetectorModel").unwrap();
        let pass = graph.add_node("PassThroughModel").unwrap();

        let result = graph.add_connection(Connection::new(corners, 1, pass, 0));
        assert_eq!(
            result,
            Err(GraphError::TypeMismatch {
                from: DataType::Keypoints,
                to: DataType::Image
            })
        );
        assert!(graph.connections().is_empty());
    }

    #[test]
    fn test_cycle_and_self_connection_rejected() {
        let mut graph = graph();
        let (_, b, c) = chain(&mut graph);
        assert_eq!(graph.add_connection(Connection::new(b, 0, b, 0)), Err(GraphError::SelfConnection(b)));

        let blend = graph.add_node("PassThroughModel").unwrap();
        graph.add_connection(Connection::new(c, 0, blend, 0)).unwrap();
        assert_eq!(
            graph.add_connection(Connection::new(blend, 0, b, 0)),
            Err(GraphError::PortOccupied { node: b, port: 0 })
        );

        let join = graph.add_node("JoinModel").unwrap();
        graph.add_connection(Connection::new(blend, 0, join, 0)).unwrap();
        assert_eq!(
            graph.add_connection(Connection::new(join, 0, join, 1)),
            Err(GraphError::SelfConnection(join))
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = graph();
        let first = graph.add_node("JoinModel").unwrap();
        let second = graph.add_node("PassThroughModel").unwrap();
        graph.add_connection(Connection::new(first, 0, second, 0)).unwrap();

        assert_eq!(
            graph.add_connection(Connection::new(second, 0, first, 0)),
            Err(GraphError::WouldCreateCycle)
        );
    }

    #[test]
    fn test_delete_node_removes_connections_first() {
        let mut graph = graph();
        let (a, b, c) = chain(&mut graph);
        graph.take_events();

        graph.delete_node(b).unwrap();

        assert!(graph.node(b).is_none());
        assert!(graph.connections().iter().all(|conn| !conn.touches(b)));
        assert!(graph.connections().is_empty());

        let events = graph.take_events();
        let deleted_at = events.iter().position(|e| *e == GraphEvent::NodeDeleted(b)).unwrap();
        let connection_events: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, GraphEvent::ConnectionDeleted(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(connection_events.len(), 2);
        assert!(connection_events.iter().all(|&i| i < deleted_at));

        // c lost its input
        assert!(graph.output(c, 0).unwrap().is_none());
        assert!(graph.output(a, 0).unwrap().is_some());
    }

    #[test]
    fn test_cascading_failure() {
        let mut graph = graph();
        let source = graph.add_node("PassThroughModel").unwrap();
        let (a, b, c) = chain(&mut graph);
        graph.delete_connection(&Connection::new(a, 0, b, 0)).unwrap();
        graph.add_connection(Connection::new(source, 0, b, 0)).unwrap();
        // `source` has no input so the whole chain below it is empty
        assert!(graph.output(b, 0).unwrap().is_none());
        assert!(graph.output(c, 0).unwrap().is_none());

        // Feed it, then take the feed away again
        graph.add_connection(Connection::new(a, 0, source, 0)).unwrap();
        assert!(graph.output(c, 0).unwrap().is_some());

        graph.delete_connection(&Connection::new(a, 0, source, 0)).unwrap();
        assert!(graph.output(source, 0).unwrap().is_none());
        assert!(graph.output(b, 0).unwrap().is_none());
        assert!(graph.output(c, 0).unwrap().is_none());
        assert!(matches!(graph.node_state(c).unwrap(), NodeState::MissingInput(_)));
    }

    #[test]
    fn test_failure_cascades_from_parameter() {
        let mut graph = graph();
        let source = graph.add_node("SolidColorModel").unwrap();
        let blur = graph.add_node("BlurModel").unwrap();
        let tail = graph.add_node("PassThroughModel").unwrap();
        graph.add_connection(Connection::new(source, 0, blur, 0)).unwrap();
        graph.add_connection(Connection::new(blur, 0, tail, 0)).unwrap();
        assert!(graph.output(tail, 0).unwrap().is_some());

        graph.set_parameter(blur, "kernel_size", ParameterValue::Int(0)).unwrap();
        assert!(matches!(graph.node_state(blur).unwrap(), NodeState::Failed(_)));
        assert!(graph.output(tail, 0).unwrap().is_none());

        graph.set_parameter(blur, "kernel_size", ParameterValue::Int(3)).unwrap();
        assert!(graph.output(tail, 0).unwrap().is_some());
    }

    #[test]
    fn test_diamond_recomputes_join_once() {
        let mut graph = graph();
        let source = graph.add_node("SolidColorModel").unwrap();
        let left = graph.add_node("PassThroughModel").unwrap();
        let right = graph.add_node("PassThroughModel").unwrap();
        let join = graph.add_node("JoinModel").unwrap();
        graph.add_connection(Connection::new(source, 0, left, 0)).unwrap();
        graph.add_connection(Connection::new(source, 0, right, 0)).unwrap();
        graph.add_connection(Connection::new(left, 0, join, 0)).unwrap();
        graph.add_connection(Connection::new(right, 0, join, 1)).unwrap();
        graph.flush_pending();

        let before = graph.node(join).unwrap().compute_count();
        graph.set_parameter(source, "red", ParameterValue::Int(200)).unwrap();
        graph.flush_pending();

        assert_eq!(graph.node(join).unwrap().compute_count(), before + 1);
        assert!(graph.output(join, 0).unwrap().is_some());
    }

    #[test]
    fn test_toggling_mask_port_drops_its_connection() {
        let mut graph = graph();
        let source = graph.add_node("SolidColorModel").unwrap();
        let mask = graph.add_node("SolidColorModel").unwrap();
        let blur = graph.add_node("BlurModel").unwrap();
        graph.add_connection(Connection::new(source, 0, blur, 0)).unwrap();

        // No mask port yet
        assert!(matches!(
            graph.add_connection(Connection::new(mask, 0, blur, 1)),
            Err(GraphError::PortOutOfRange { .. })
        ));

        graph.set_parameter(blur, "use_mask", ParameterValue::Bool(true)).unwrap();
        graph.add_connection(Connection::new(mask, 0, blur, 1)).unwrap();
        assert_eq!(graph.connections().len(), 2);

        graph.take_events();
        graph.set_parameter(blur, "use_mask", ParameterValue::Bool(false)).unwrap();
        assert_eq!(graph.connections(), &[Connection::new(source, 0, blur, 0)]);
        assert!(graph
            .take_events()
            .contains(&GraphEvent::ConnectionDeleted(Connection::new(mask, 0, blur, 1))));
        assert!(graph.output(blur, 0).unwrap().is_some());
    }

    #[test]
    fn test_debounced_parameter_waits_for_deadline() {
        let mut graph = graph();
        let source = graph.add_node("SolidColorModel").unwrap();
        let start = Instant::now();
        let count = graph.node(source).unwrap().compute_count();

        graph.set_parameter_at(source, "red", ParameterValue::Int(10), start).unwrap();
        graph
            .set_parameter_at(source, "red", ParameterValue::Int(20), start + Duration::from_millis(30))
            .unwrap();
        assert_eq!(graph.node(source).unwrap().compute_count(), count);

        // The second edit restarted the window
        assert_eq!(graph.process_pending(start + Duration::from_millis(60)), 0);
        assert_eq!(graph.process_pending(start + Duration::from_millis(80)), 1);
        assert_eq!(graph.node(source).unwrap().compute_count(), count + 1);
        assert_eq!(graph.next_pending_deadline(start), None);
    }

    #[test]
    fn test_reset_node() {
        let mut graph = graph();
        let pass = graph.add_node("PassThroughModel").unwrap();
        assert!(matches!(graph.reset_node(pass), Err(GraphError::NotStateful(_))));

        let average = graph.add_node("RunningAverageModel").unwrap();
        assert!(graph.reset_node(average).is_ok());
    }

    #[test]
    fn test_set_parameter_errors() {
        let mut graph = graph();
        let blur = graph.add_node("BlurModel").unwrap();
        assert!(matches!(
            graph.set_parameter(blur, "nope", ParameterValue::Int(1)),
            Err(GraphError::Parameter(ParameterError::Unknown(_)))
        ));
        assert_eq!(
            graph.set_parameter(99, "kernel_size", ParameterValue::Int(1)),
            Err(GraphError::NodeNotFound(99))
        );
    }

    #[test]
    fn test_output_port_out_of_range() {
        let mut graph = graph();
        let blur = graph.add_node("BlurModel").unwrap();
        assert!(matches!(graph.output(blur, 4), Err(GraphError::PortOutOfRange { .. })));
    }

    #[test]
    fn test_document_round_trip() {
        let mut graph = graph();
        let source = graph.add_node_at("SolidColorModel", Position::new(10.0, 20.0)).unwrap();
        let blur = graph.add_node("BlurModel").unwrap();
        graph.set_parameter(blur, "kernel_size", ParameterValue::Int(7)).unwrap();
        graph.add_connection(Connection::new(source, 0, blur, 0)).unwrap();
        let document = graph.to_document();

        let mut restored = GraphModel::new(test_registry());
        restored.load_document(&document).unwrap();

        assert_eq!(restored.node_ids(), vec![source, blur]);
        assert_eq!(restored.connections(), graph.connections());
        assert_eq!(restored.node(source).unwrap().position, Position::new(10.0, 20.0));
        assert_eq!(restored.node(blur).unwrap().parameters(), graph.node(blur).unwrap().parameters());
        assert!(restored.output(blur, 0).unwrap().is_some());
        assert_eq!(restored.to_document(), document);

        // The next fresh id continues after the restored ones
        assert_eq!(restored.add_node("BlurModel").unwrap(), blur + 1);
    }

    #[test]
    fn test_load_document_unknown_type_leaves_graph_empty() {
        let mut graph = graph();
        graph.add_node("BlurModel").unwrap();
        let mut document = graph.to_document();
        document.nodes[0].internal.model_name = "WarpModel".to_string();

        assert_eq!(
            graph.load_document(&document),
            Err(GraphError::UnknownNodeType("WarpModel".to_string()))
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_blur_of_black_image_is_black() {
        let mut graph = graph();
        let blur = graph.add_node("BlurModel").unwrap();
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        graph.nodes.get_mut(&blur).unwrap().set_input(0, NodeData::image(image)).unwrap();

        let output = graph.output(blur, 0).unwrap();
        let output = output.as_image().unwrap();
        assert_eq!((output.width(), output.height()), (100, 100));
        assert_eq!(output.color().channel_count(), 3);
        assert!(output.as_bytes().iter().all(|&v| v == 0));
    }
}
