//! Node graph execution engine
//!
//! Propagation runs as a single pass per mutation:
//! - the mutated nodes and everything reachable downstream are marked dirty
//! - dirty nodes are visited in topological order
//! - each node gathers its inputs from upstream outputs and recomputes at
//!   most once per pass
//! - a node whose gathered inputs are identical to its stored inputs is
//!   skipped, unless it is one of the pass roots

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::{debug, error};
use visionbox_plugin_sdk::NodeData;

use super::graph::Connection;
use super::node::{Node, NodeId, NodeState};

/// Counters describing propagation work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Propagation passes run
    pub passes: u64,
    /// Node recomputations performed by passes
    pub recomputed: u64,
    /// Dirty nodes skipped because their inputs were unchanged
    pub skipped: u64,
}

/// Execution engine for node graphs
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    stats: ExecutionStats,
}

impl ExecutionEngine {
    /// Create a new execution engine
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ExecutionStats {
        self.stats
    }

    /// Get the execution order using topological sort
    pub fn execution_order(nodes: &BTreeMap<NodeId, Node>, connections: &[Connection]) -> Result<Vec<NodeId>, String> {
        let mut in_degree: BTreeMap<NodeId, usize> = nodes.keys().map(|&id| (id, 0)).collect();
        let mut adj_list: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for connection in connections {
            adj_list.entry(connection.from_node).or_default().push(connection.to_node);
            if let Some(degree) = in_degree.get_mut(&connection.to_node) {
                *degree += 1;
            }
        }

        // Kahn's algorithm for topological sort
        let mut queue: VecDeque<NodeId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut result = Vec::with_capacity(nodes.len());

        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            if let Some(neighbors) = adj_list.get(&node_id) {
                for neighbor in neighbors {
                    if let Some(degree) = in_degree.get_mut(neighbor) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*neighbor);
                        }
                    }
                }
            }
        }

        if result.len() != nodes.len() {
            return Err("Cycle detected in node graph".to_string());
        }
        Ok(result)
    }

    /// The roots plus every node reachable downstream from them
    pub fn downstream_closure(roots: &[NodeId], connections: &[Connection]) -> BTreeSet<NodeId> {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<NodeId> = roots.to_vec();

        while let Some(node_id) = stack.pop() {
            if visited.insert(node_id) {
                stack.extend(
                    connections
                        .iter()
                        .filter(|c| c.from_node == node_id)
                        .map(|c| c.to_node),
                );
            }
        }
        visited
    }

    /// Whether adding `from -> to` would close a cycle
    pub fn would_create_cycle(from: NodeId, to: NodeId, connections: &[Connection]) -> bool {
        from == to || Self::downstream_closure(&[to], connections).contains(&from)
    }

    /// Collect inputs for a node from connected upstream nodes
    fn collect_node_inputs(node_id: NodeId, nodes: &BTreeMap<NodeId, Node>, connections: &[Connection]) -> Vec<NodeData> {
        let input_count = nodes.get(&node_id).map(|n| n.inputs().len()).unwrap_or(0);
        let mut inputs = vec![NodeData::None; input_count];

        for connection in connections.iter().filter(|c| c.to_node == node_id) {
            if connection.to_port >= input_count {
                continue;
            }
            if let Some(source) = nodes.get(&connection.from_node) {
                inputs[connection.to_port] = source.output(connection.from_port);
            }
        }
        inputs
    }

    /// Run one propagation pass rooted at `roots`. Returns the nodes that
    /// were recomputed, in the order they ran.
    pub fn propagate(
        &mut self,
        roots: &[NodeId],
        nodes: &mut BTreeMap<NodeId, Node>,
        connections: &[Connection],
    ) -> Vec<NodeId> {
        self.stats.passes += 1;
        let dirty = Self::downstream_closure(roots, connections);

        let order = match Self::execution_order(nodes, connections) {
            Ok(order) => order,
            Err(e) => {
                error!("Propagation aborted: {}", e);
                return Vec::new();
            }
        };

        let mut updated = Vec::new();
        for node_id in order.into_iter().filter(|id| dirty.contains(id)) {
            let inputs = Self::collect_node_inputs(node_id, nodes, connections);
            let Some(node) = nodes.get_mut(&node_id) else {
                continue;
            };

            let forced = roots.contains(&node_id) || *node.state() == NodeState::Uninitialized;
            if !forced && node.inputs_match(&inputs) {
                self.stats.skipped += 1;
                continue;
            }

            for (port, data) in inputs.into_iter().enumerate() {
                // Length comes from the node itself, so every port exists
                let _ = node.store_input(port, data);
            }
            node.recompute();
            self.stats.recomputed += 1;
            updated.push(node_id);
        }

        debug!("Propagation from {:?} recomputed {:?}", roots, updated);
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::PassThroughModel;

    fn graph_of(ids: &[NodeId]) -> BTreeMap<NodeId, Node> {
        ids.iter()
            .map(|&id| (id, Node::new(id, Box::new(PassThroughModel::default()), None)))
            .collect()
    }

    #[test]
    fn test_execution_order_respects_connections() {
        let nodes = graph_of(&[0, 1, 2]);
        let connections = vec![Connection::new(2, 0, 1, 0), Connection::new(1, 0, 0, 0)];
        let order = ExecutionEngine::execution_order(&nodes, &connections).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_cycle_detection() {
        let nodes = graph_of(&[0, 1]);
        let connections = vec![Connection::new(0, 0, 1, 0), Connection::new(1, 0, 0, 0)];
        assert!(ExecutionEngine::execution_order(&nodes, &connections).is_err());

        let acyclic = vec![Connection::new(0, 0, 1, 0)];
        assert!(ExecutionEngine::would_create_cycle(1, 0, &acyclic));
        assert!(ExecutionEngine::would_create_cycle(1, 1, &acyclic));
        assert!(!ExecutionEngine::would_create_cycle(0, 1, &[]));
    }

    #[test]
    fn test_downstream_closure() {
        let connections = vec![
            Connection::new(0, 0, 1, 0),
            Connection::new(1, 0, 2, 0),
            Connection::new(3, 0, 4, 0),
        ];
        let closure = ExecutionEngine::downstream_closure(&[1], &connections);
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_unchanged_inputs_are_skipped() {
        let mut nodes = graph_of(&[0, 1]);
        let connections = vec![Connection::new(0, 0, 1, 0)];
        let mut engine = ExecutionEngine::new();

        // First pass initializes both nodes
        engine.propagate(&[0], &mut nodes, &connections);
        assert_eq!(nodes[&1].compute_count(), 1);

        // Node 0 still outputs nothing, so node 1's inputs are unchanged
        let updated = engine.propagate(&[0], &mut nodes, &connections);
        assert_eq!(updated, vec![0]);
        assert_eq!(nodes[&1].compute_count(), 1);
        assert_eq!(engine.stats().skipped, 1);
    }
}
