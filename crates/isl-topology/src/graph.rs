//! Graph view of the ISL set.
//!
//! Edges are weighted by the one-way latency at the positions the graph was built from,
//! so a graph is a snapshot: rebuild it after propagating.

use crate::{IslPair, LinkType, Result, TopologyError};
use orbital_mechanics::{distance_km, latency_ms, Positioned};
use petgraph::algo::{astar, connected_components};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IslEdge {
    pub link_type: LinkType,
    pub latency_ms: f64,
}

pub struct IslGraph {
    graph: DiGraph<usize, IslEdge>,
    node_index: Vec<NodeIndex>,
}

impl IslGraph {
    /// Build a snapshot from the static pair set and current satellite positions.
    pub fn build<P: Positioned>(pairs: &[IslPair], positions: &[P]) -> Self {
        let mut graph = DiGraph::with_capacity(positions.len(), pairs.len() * 2);
        let node_index: Vec<NodeIndex> = (0..positions.len()).map(|i| graph.add_node(i)).collect();

        for pair in pairs {
            let (Some(a), Some(b)) = (positions.get(pair.sat_a), positions.get(pair.sat_b)) else {
                warn!("Skipping ISL {}: satellite missing from snapshot", pair.key());
                continue;
            };
            let edge = IslEdge {
                link_type: pair.link_type,
                latency_ms: latency_ms(distance_km(a, b)),
            };

            // bidirectional
            graph.add_edge(node_index[pair.sat_a], node_index[pair.sat_b], edge);
            graph.add_edge(node_index[pair.sat_b], node_index[pair.sat_a], edge);
        }

        Self { graph, node_index }
    }

    fn node(&self, sat: usize) -> Result<NodeIndex> {
        self.node_index
            .get(sat)
            .copied()
            .ok_or(TopologyError::SatelliteNotFound(sat))
    }

    /// Lowest-latency path; returns total latency (ms) and the satellite sequence.
    pub fn find_path(&self, from: usize, to: usize) -> Result<(f64, Vec<usize>)> {
        let start = self.node(from)?;
        let goal = self.node(to)?;

        astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| e.weight().latency_ms,
            |_| 0.0,
        )
        .map(|(cost, nodes)| (cost, nodes.iter().map(|idx| self.graph[*idx]).collect()))
        .ok_or(TopologyError::NoPath(from, to))
    }

    pub fn neighbors(&self, sat: usize) -> Result<Vec<usize>> {
        let node = self.node(sat)?;
        let mut out: Vec<usize> = self
            .graph
            .edges(node)
            .map(|e| self.graph[e.target()])
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    pub fn stats(&self) -> GraphStats {
        let degrees: Vec<usize> = self
            .node_index
            .iter()
            .map(|&n| self.graph.edges(n).count())
            .collect();

        GraphStats {
            satellites: self.graph.node_count(),
            links: self.graph.edge_count() / 2, // Bidirectional
            components: connected_components(&self.graph),
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphStats {
    pub satellites: usize,
    pub links: usize,
    pub components: usize,
    pub min_degree: usize,
    pub max_degree: usize,
}
