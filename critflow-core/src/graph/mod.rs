// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory dependency graph for one tenant.
//!
//! The graph is assembled per request from store rows and discarded when the
//! request completes. Adjacency lists are kept in both directions so the
//! scheduling passes get O(1) predecessor and successor lookups.

pub mod analysis;
pub mod cpm;
pub mod cycles;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{DependencyEdge, DependencyType, WorkItem};

/// A work item materialised as a graph node, annotated by the CPM passes.
///
/// Day offsets are whole days from the project origin (t = 0). The calendar
/// fields are the same offsets anchored at the request's "now" and are
/// convenience outputs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub status: String,
    pub duration_days: i64,

    #[serde(default)]
    pub earliest_start_day: i64,
    #[serde(default)]
    pub earliest_finish_day: i64,
    #[serde(default)]
    pub latest_start_day: i64,
    #[serde(default)]
    pub latest_finish_day: i64,

    pub earliest_start: Option<DateTime<Utc>>,
    pub earliest_finish: Option<DateTime<Utc>>,
    pub latest_start: Option<DateTime<Utc>>,
    pub latest_finish: Option<DateTime<Utc>>,

    #[serde(default)]
    pub slack_days: i64,
    #[serde(default)]
    pub is_critical: bool,
}

impl GraphNode {
    fn from_work_item(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            item_type: item.item_type.clone(),
            status: item.status.clone(),
            duration_days: item.duration_days(),
            earliest_start_day: 0,
            earliest_finish_day: 0,
            latest_start_day: 0,
            latest_finish_day: 0,
            earliest_start: None,
            earliest_finish: None,
            latest_start: None,
            latest_finish: None,
            slack_days: 0,
            is_critical: false,
        }
    }
}

/// A stored edge projected into the graph, annotated by the CPM passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: Uuid,
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
    #[serde(default)]
    pub is_critical: bool,
}

/// One tenant's dependency graph.
pub struct DependencyGraph {
    pub(crate) nodes: HashMap<Uuid, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
    /// node id -> indices into `edges` where the node is the source
    pub(crate) outgoing: HashMap<Uuid, Vec<usize>>,
    /// node id -> indices into `edges` where the node is the target
    pub(crate) incoming: HashMap<Uuid, Vec<usize>>,
}

impl DependencyGraph {
    /// Assemble a graph from store rows.
    ///
    /// When the caller filtered work items by an id set, the edge query may
    /// return edges touching items outside that set. Such dangling edges are
    /// dropped here so the scheduling passes' endpoint lookups stay total.
    pub fn assemble(work_items: &[WorkItem], edges: &[DependencyEdge]) -> Self {
        let nodes: HashMap<Uuid, GraphNode> = work_items
            .iter()
            .map(|item| (item.id, GraphNode::from_work_item(item)))
            .collect();

        let mut kept = Vec::with_capacity(edges.len());
        let mut outgoing: HashMap<Uuid, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<Uuid, Vec<usize>> = HashMap::new();

        for edge in edges {
            if !nodes.contains_key(&edge.from_id) || !nodes.contains_key(&edge.to_id) {
                continue;
            }
            let index = kept.len();
            kept.push(GraphEdge {
                id: edge.id,
                from_id: edge.from_id,
                to_id: edge.to_id,
                dependency_type: edge.dependency_type,
                lag_days: edge.lag_days,
                is_critical: false,
            });
            outgoing.entry(edge.from_id).or_default().push(index);
            incoming.entry(edge.to_id).or_default().push(index);
        }

        Self {
            nodes,
            edges: kept,
            outgoing,
            incoming,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &Uuid) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Node ids in sorted order. Traversals seed from this so results are
    /// deterministic across runs despite hash-map iteration order.
    pub fn sorted_node_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn incoming_edges(&self, id: &Uuid) -> impl Iterator<Item = &GraphEdge> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(|&index| &self.edges[index])
    }

    pub fn outgoing_edges(&self, id: &Uuid) -> impl Iterator<Item = &GraphEdge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&index| &self.edges[index])
    }

    /// Successor ids in sorted order, for deterministic traversal.
    pub fn successor_ids(&self, id: &Uuid) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.outgoing_edges(id).map(|edge| edge.to_id).collect();
        ids.sort();
        ids
    }

    pub fn indegree(&self, id: &Uuid) -> usize {
        self.incoming.get(id).map_or(0, Vec::len)
    }

    pub fn outdegree(&self, id: &Uuid) -> usize {
        self.outgoing.get(id).map_or(0, Vec::len)
    }

    /// Consume the graph into serialisable node and edge lists, nodes sorted
    /// by id for stable output.
    pub fn into_parts(self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        let mut nodes: Vec<GraphNode> = self.nodes.into_values().collect();
        nodes.sort_by_key(|node| node.id);
        (nodes, self.edges)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn work_item(id: Uuid, title: &str, duration: i64) -> WorkItem {
        WorkItem {
            id,
            tenant_id: Uuid::nil(),
            item_type: "task".to_string(),
            title: title.to_string(),
            status: "open".to_string(),
            estimated_duration_days: Some(duration),
        }
    }

    pub fn edge(from_id: Uuid, to_id: Uuid, lag_days: i64) -> DependencyEdge {
        let now = Utc::now();
        DependencyEdge {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            from_id,
            to_id,
            dependency_type: DependencyType::FinishToStart,
            lag_days,
            created_at: now,
            created_by: Uuid::nil(),
            updated_at: now,
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{edge, work_item};
    use super::*;

    #[test]
    fn test_assemble_builds_adjacency() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let items = vec![work_item(a, "a", 2), work_item(b, "b", 3)];
        let edges = vec![edge(a, b, 0)];

        let graph = DependencyGraph::assemble(&items, &edges);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.outdegree(&a), 1);
        assert_eq!(graph.indegree(&b), 1);
        assert_eq!(graph.successor_ids(&a), vec![b]);
    }

    #[test]
    fn test_assemble_drops_dangling_edges() {
        let a = Uuid::new_v4();
        let outside = Uuid::new_v4();
        let items = vec![work_item(a, "a", 2)];
        let edges = vec![edge(a, outside, 0), edge(outside, a, 0)];

        let graph = DependencyGraph::assemble(&items, &edges);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.outdegree(&a), 0);
        assert_eq!(graph.indegree(&a), 0);
    }

    #[test]
    fn test_assemble_applies_duration_defaults() {
        let a = Uuid::new_v4();
        let mut item = work_item(a, "a", 0);
        item.estimated_duration_days = None;
        item.item_type = "initiative".to_string();

        let graph = DependencyGraph::assemble(&[item], &[]);

        assert_eq!(graph.node(&a).unwrap().duration_days, 30);
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::assemble(&[], &[]);
        assert!(graph.is_empty());
        assert_eq!(graph.sorted_node_ids(), Vec::<Uuid>::new());
    }
}
