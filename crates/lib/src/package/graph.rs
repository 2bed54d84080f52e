//! Resolved dependency graph.

use std::collections::{BTreeMap, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::{EdgeKind, PackageId};

/// Edge weight: the dependency name as declared by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEdge {
  pub name: String,
  pub kind: EdgeKind,
}

/// Directed graph of resolved packages; edges point from consumer to dependency.
#[derive(Debug, Default)]
pub struct PackageGraph {
  graph: DiGraph<PackageId, ResolvedEdge>,
  nodes: HashMap<PackageId, NodeIndex>,
}

impl PackageGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a package node; adding an existing id is a no-op.
  pub fn add_package(&mut self, id: &PackageId) -> NodeIndex {
    if let Some(&idx) = self.nodes.get(id) {
      return idx;
    }
    let idx = self.graph.add_node(id.clone());
    self.nodes.insert(id.clone(), idx);
    idx
  }

  pub fn add_edge(&mut self, consumer: &PackageId, dependency: &PackageId, name: &str, kind: EdgeKind) {
    let from = self.add_package(consumer);
    let to = self.add_package(dependency);
    self.graph.add_edge(
      from,
      to,
      ResolvedEdge {
        name: name.to_string(),
        kind,
      },
    );
  }

  /// Resolved dependencies of `id`, keyed by declared name.
  pub fn edges(&self, id: &PackageId) -> BTreeMap<String, PackageId> {
    let Some(&idx) = self.nodes.get(id) else {
      return BTreeMap::new();
    };

    self
      .graph
      .edges_directed(idx, Direction::Outgoing)
      .map(|edge| (edge.weight().name.clone(), self.graph[edge.target()].clone()))
      .collect()
  }

  /// Packages depending on `id`.
  pub fn dependents(&self, id: &PackageId) -> Vec<PackageId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };

    let mut dependents: Vec<PackageId> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|n| self.graph[n].clone())
      .collect();
    dependents.sort();
    dependents.dedup();
    dependents
  }

  pub fn package_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn edges_are_keyed_by_name() {
    let root = PackageId::new("app", "1.0.0");
    let foo = PackageId::new("foo", "1.2.0");
    let react = PackageId::new("react", "16.0.0");

    let mut graph = PackageGraph::new();
    graph.add_package(&root);
    graph.add_edge(&root, &foo, "foo", EdgeKind::Regular);
    graph.add_edge(&foo, &react, "react", EdgeKind::Peer);
    graph.add_edge(&root, &react, "react", EdgeKind::Regular);

    assert_eq!(graph.package_count(), 3);
    assert_eq!(graph.edge_count(), 3);

    let edges = graph.edges(&root);
    assert_eq!(edges.keys().collect::<Vec<_>>(), vec!["foo", "react"]);
    assert_eq!(edges["foo"], foo);
    assert_eq!(graph.dependents(&react), vec![root, foo]);
  }

  #[test]
  fn unknown_package_has_no_edges() {
    let graph = PackageGraph::new();
    assert!(graph.edges(&PackageId::new("x", "1.0.0")).is_empty());
  }
}
