//! Field dependency graph construction and traversal
//!
//! Nodes are field names; an edge `A -> B` means B's calculation references A.
//! The graph is rebuilt from scratch for every record set.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use twbgraph_core::{FieldRecord, GraphConfig};

use crate::references::field_references;

/// Node identifier (field name)
pub type NodeId = String;

/// Directed edge from a dependency to the field that uses it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Build options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Keep only the first of repeated (dependency, dependent) pairs
    pub dedupe_edges: bool,
}

impl From<&GraphConfig> for GraphOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            dedupe_edges: config.dedupe_edges,
        }
    }
}

/// Dependency graph with forward and reverse adjacency
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    /// All nodes, in insertion order
    nodes: IndexSet<NodeId>,

    /// All edges, in scan order
    edges: Vec<GraphEdge>,

    /// node -> nodes its calculation references
    #[serde(skip)]
    parents: HashMap<NodeId, Vec<NodeId>>,

    /// node -> nodes whose calculations reference it
    #[serde(skip)]
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph from a combined record set
    ///
    /// Every non-empty field name becomes a node first. Then each calculated
    /// record is scanned for bracketed references; unknown references become
    /// new nodes and each reference adds one edge to the record's field.
    pub fn build(records: &[FieldRecord], options: GraphOptions) -> Self {
        let mut graph = Self::default();

        for record in records {
            if !record.field_name.is_empty() {
                graph.add_node(&record.field_name);
            }
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();

        for record in records {
            let Some(calculation) = record.calculation() else {
                continue;
            };

            for dependency in field_references(calculation) {
                graph.add_node(dependency);
                graph.add_node(&record.field_name);

                if options.dedupe_edges
                    && !seen.insert((dependency.to_string(), record.field_name.clone()))
                {
                    continue;
                }

                graph.add_edge(dependency, &record.field_name);
            }
        }

        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "built dependency graph"
        );

        graph
    }

    fn add_node(&mut self, name: &str) {
        if !self.nodes.contains(name) {
            self.nodes.insert(name.to_string());
        }
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.push(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
        });
        self.parents
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
        self.children
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }

    /// All edges in scan order
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    /// Immediate dependencies (fields referenced by this node's calculation)
    pub fn dependencies(&self, node: &str) -> Vec<&NodeId> {
        self.parents
            .get(node)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Immediate dependents (fields whose calculation references this node)
    pub fn dependents(&self, node: &str) -> Vec<&NodeId> {
        self.children
            .get(node)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Every field affected, directly or transitively, by a change to `node`
    pub fn downstream(&self, node: &str) -> Vec<NodeId> {
        Self::reachable(&self.children, node)
    }

    /// Every field `node` depends on, directly or transitively
    pub fn upstream(&self, node: &str) -> Vec<NodeId> {
        Self::reachable(&self.parents, node)
    }

    /// Whether `target` is downstream of `source`
    pub fn has_path(&self, source: &str, target: &str) -> bool {
        self.downstream(source).iter().any(|n| n == target)
    }

    /// BFS over one adjacency direction, in discovery order
    fn reachable(adjacency: &HashMap<NodeId, Vec<NodeId>>, start: &str) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        if let Some(next) = adjacency.get(start) {
            queue.extend(next.iter().cloned());
        }

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            result.push(current.clone());

            if let Some(next) = adjacency.get(&current) {
                for node in next {
                    if !visited.contains(node) {
                        queue.push_back(node.clone());
                    }
                }
            }
        }

        result
    }

    /// Nodes ordered so every dependency precedes its dependents
    ///
    /// Returns `None` when the graph has a cycle (self-loops included).
    pub fn topological_order(&self) -> Option<Vec<NodeId>> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();

        for edge in &self.edges {
            *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| in_degree.get(n).copied() == Some(0))
            .collect();
        let mut result = Vec::with_capacity(self.nodes.len());

        // Kahn's algorithm
        while let Some(node) = queue.pop_front() {
            result.push(node.to_string());

            if let Some(children) = self.children.get(node) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(child.as_str());
                        }
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            Some(result)
        } else {
            None
        }
    }
}
