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

//! Critical Path Method over an acyclic dependency graph.
//!
//! Forward pass assigns earliest start/finish, backward pass assigns latest
//! start/finish, slack falls out as `LS - ES`. All times are whole days from
//! a project origin at t = 0; calendar timestamps are derived at the end by
//! anchoring the offsets at the caller's "now".
//!
//! Two behaviours are kept for compatibility with the system this engine
//! replaces:
//! - every edge is scheduled finish-to-start with its lag, regardless of the
//!   stored dependency type;
//! - each sink is anchored at its own early finish (`LF = EF`), not at the
//!   global completion, so every sink reports zero slack.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::{CritflowError, DependencyGraph, Result};

/// Project-level outputs of a scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpmSummary {
    /// Zero-slack node ids, ordered by earliest start then id.
    pub critical_path: Vec<Uuid>,
    /// Maximum earliest finish over all nodes; 0 for an empty graph.
    pub total_duration_days: i64,
}

/// Run the forward and backward passes, annotating every node and edge in
/// place. The graph must be acyclic; callers enforce that invariant at
/// mutation time and may verify it with `detect_cycles` first.
pub fn compute_schedule(graph: &mut DependencyGraph, now: DateTime<Utc>) -> Result<CpmSummary> {
    if graph.is_empty() {
        return Ok(CpmSummary {
            critical_path: Vec::new(),
            total_duration_days: 0,
        });
    }

    let order = topological_order(graph)?;

    // Forward pass. ES(n) = max over predecessors of EF(p) + lag, or 0 for a
    // source node. Negative lags may pull a non-source node before its
    // predecessor's finish; only sources are pinned at 0.
    for id in &order {
        let earliest_start = graph
            .incoming_edges(id)
            .map(|edge| {
                let pred = &graph.nodes[&edge.from_id];
                pred.earliest_finish_day + edge.lag_days
            })
            .max()
            .unwrap_or(0);

        let node = graph.nodes.get_mut(id).expect("node in topological order");
        node.earliest_start_day = earliest_start;
        node.earliest_finish_day = earliest_start + node.duration_days;
    }

    let total_duration_days = graph
        .nodes()
        .map(|node| node.earliest_finish_day)
        .fold(0, i64::max);

    // Backward pass in reverse topological order. Sinks anchor at their own
    // early finish; everything else takes the tightest successor constraint.
    for id in order.iter().rev() {
        let latest_finish = graph
            .outgoing_edges(id)
            .map(|edge| {
                let succ = &graph.nodes[&edge.to_id];
                succ.latest_start_day - edge.lag_days
            })
            .min();

        let node = graph.nodes.get_mut(id).expect("node in topological order");
        node.latest_finish_day = latest_finish.unwrap_or(node.earliest_finish_day);
        node.latest_start_day = node.latest_finish_day - node.duration_days;
        node.slack_days = node.latest_start_day - node.earliest_start_day;
        node.is_critical = node.slack_days == 0;

        node.earliest_start = Some(now + Duration::days(node.earliest_start_day));
        node.earliest_finish = Some(now + Duration::days(node.earliest_finish_day));
        node.latest_start = Some(now + Duration::days(node.latest_start_day));
        node.latest_finish = Some(now + Duration::days(node.latest_finish_day));
    }

    // An edge is critical iff both endpoints are.
    for index in 0..graph.edges.len() {
        let (from_id, to_id) = (graph.edges[index].from_id, graph.edges[index].to_id);
        graph.edges[index].is_critical =
            graph.nodes[&from_id].is_critical && graph.nodes[&to_id].is_critical;
    }

    let mut critical_path: Vec<Uuid> = graph
        .nodes()
        .filter(|node| node.is_critical)
        .map(|node| node.id)
        .collect();
    critical_path.sort_by_key(|id| (graph.nodes[id].earliest_start_day, *id));

    Ok(CpmSummary {
        critical_path,
        total_duration_days,
    })
}

/// Kahn's algorithm with sorted seeding for deterministic order.
fn topological_order(graph: &DependencyGraph) -> Result<Vec<Uuid>> {
    let mut indegree: HashMap<Uuid, usize> = graph
        .sorted_node_ids()
        .into_iter()
        .map(|id| (id, graph.indegree(&id)))
        .collect();

    let mut queue: VecDeque<Uuid> = graph
        .sorted_node_ids()
        .into_iter()
        .filter(|id| indegree[id] == 0)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(id) = queue.pop_front() {
        order.push(id);
        for succ in graph.successor_ids(&id) {
            let degree = indegree.get_mut(&succ).expect("successor is a node");
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(succ);
            }
        }
    }

    if order.len() != graph.node_count() {
        // The store-side invariant should make this unreachable.
        return Err(CritflowError::Internal(
            "dependency graph contains a cycle; scheduling aborted".to_string(),
        ));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{edge, work_item};

    fn schedule(
        items: Vec<crate::WorkItem>,
        edges: Vec<crate::DependencyEdge>,
    ) -> (DependencyGraph, CpmSummary) {
        let mut graph = DependencyGraph::assemble(&items, &edges);
        let summary = compute_schedule(&mut graph, Utc::now()).unwrap();
        (graph, summary)
    }

    #[test]
    fn test_linear_chain_no_lag() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            work_item(a, "a", 2),
            work_item(b, "b", 3),
            work_item(c, "c", 5),
        ];
        let edges = vec![edge(a, b, 0), edge(b, c, 0)];

        let (graph, summary) = schedule(items, edges);

        assert_eq!(summary.total_duration_days, 10);
        let mut expected = vec![a, b, c];
        expected.sort_by_key(|id| graph.node(id).unwrap().earliest_start_day);
        assert_eq!(summary.critical_path, expected);
        for id in [a, b, c] {
            assert_eq!(graph.node(&id).unwrap().slack_days, 0);
            assert!(graph.node(&id).unwrap().is_critical);
        }
        assert!(graph.edges().iter().all(|edge| edge.is_critical));
    }

    #[test]
    fn test_diamond_with_lag() {
        let (a, b, c, d) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let items = vec![
            work_item(a, "a", 4),
            work_item(b, "b", 2),
            work_item(c, "c", 3),
            work_item(d, "d", 1),
        ];
        let edges = vec![edge(a, b, 0), edge(a, c, 1), edge(b, d, 0), edge(c, d, 0)];

        let (graph, summary) = schedule(items, edges);

        assert_eq!(summary.total_duration_days, 9);
        assert_eq!(graph.node(&b).unwrap().earliest_finish_day, 6);
        assert_eq!(graph.node(&c).unwrap().earliest_finish_day, 8);
        assert_eq!(graph.node(&b).unwrap().slack_days, 2);
        assert!(!graph.node(&b).unwrap().is_critical);

        for id in [a, c, d] {
            assert!(graph.node(&id).unwrap().is_critical, "{} not critical", id);
        }
        let criticals: Vec<Uuid> = summary.critical_path;
        assert_eq!(criticals.len(), 3);
        assert!(!criticals.contains(&b));

        // The B-side edges carry the slack.
        for edge in graph.edges() {
            let on_b = edge.from_id == b || edge.to_id == b;
            assert_eq!(edge.is_critical, !on_b);
        }
    }

    #[test]
    fn test_empty_graph() {
        let (_, summary) = schedule(vec![], vec![]);
        assert_eq!(summary.total_duration_days, 0);
        assert!(summary.critical_path.is_empty());
    }

    #[test]
    fn test_disconnected_components() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            work_item(a, "a", 2),
            work_item(b, "b", 3),
            work_item(c, "lonely", 7),
        ];
        let edges = vec![edge(a, b, 0)];

        let (graph, summary) = schedule(items, edges);

        // T is the max across components.
        assert_eq!(summary.total_duration_days, 7);
        assert_eq!(graph.node(&c).unwrap().earliest_start_day, 0);
        // Sink anchoring gives every component's sink zero slack.
        assert!(graph.node(&b).unwrap().is_critical);
        assert!(graph.node(&c).unwrap().is_critical);
    }

    #[test]
    fn test_multiple_sinks_each_anchor_at_own_finish() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            work_item(a, "a", 2),
            work_item(b, "short sink", 1),
            work_item(c, "long sink", 10),
        ];
        let edges = vec![edge(a, b, 0), edge(a, c, 0)];

        let (graph, summary) = schedule(items, edges);

        assert_eq!(summary.total_duration_days, 12);
        // Both sinks report zero slack even though only C constrains T.
        assert_eq!(graph.node(&b).unwrap().latest_finish_day, 3);
        assert_eq!(graph.node(&b).unwrap().slack_days, 0);
        assert_eq!(graph.node(&c).unwrap().slack_days, 0);
    }

    #[test]
    fn test_negative_lag() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let items = vec![work_item(a, "a", 5), work_item(b, "b", 2)];
        let edges = vec![edge(a, b, -2)];

        let (graph, summary) = schedule(items, edges);

        // B may start two days before A finishes.
        assert_eq!(graph.node(&b).unwrap().earliest_start_day, 3);
        assert_eq!(summary.total_duration_days, 5);
    }

    #[test]
    fn test_source_nodes_start_at_zero() {
        let a = Uuid::new_v4();
        let (graph, _) = schedule(vec![work_item(a, "a", 4)], vec![]);
        assert_eq!(graph.node(&a).unwrap().earliest_start_day, 0);
        assert_eq!(graph.node(&a).unwrap().earliest_finish_day, 4);
    }

    #[test]
    fn test_cpm_soundness_invariants() {
        let (a, b, c, d) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let items = vec![
            work_item(a, "a", 4),
            work_item(b, "b", 2),
            work_item(c, "c", 3),
            work_item(d, "d", 1),
        ];
        let edges = vec![edge(a, b, 0), edge(a, c, 1), edge(b, d, 0), edge(c, d, 2)];

        let (graph, _) = schedule(items, edges);

        for node in graph.nodes() {
            assert_eq!(
                node.earliest_finish_day,
                node.earliest_start_day + node.duration_days
            );
            assert_eq!(
                node.latest_finish_day,
                node.latest_start_day + node.duration_days
            );
            assert!(node.earliest_start_day <= node.latest_start_day);
            assert!(node.slack_days >= 0);
        }
        for edge in graph.edges() {
            let from = graph.node(&edge.from_id).unwrap();
            let to = graph.node(&edge.to_id).unwrap();
            assert!(from.earliest_finish_day + edge.lag_days <= to.earliest_start_day);
        }
    }

    #[test]
    fn test_calendar_fields_anchor_at_now() {
        let a = Uuid::new_v4();
        let mut graph = DependencyGraph::assemble(&[work_item(a, "a", 4)], &[]);
        let now = Utc::now();
        compute_schedule(&mut graph, now).unwrap();

        let node = graph.node(&a).unwrap();
        assert_eq!(node.earliest_start, Some(now));
        assert_eq!(node.earliest_finish, Some(now + Duration::days(4)));
    }

    #[test]
    fn test_deterministic_output() {
        let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        let items: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| work_item(*id, &format!("n{}", i), (i as i64 % 3) + 1))
            .collect();
        let edges = vec![
            edge(ids[0], ids[1], 0),
            edge(ids[0], ids[2], 1),
            edge(ids[1], ids[3], 0),
            edge(ids[2], ids[3], 0),
            edge(ids[3], ids[4], 0),
        ];

        let (_, first) = schedule(items.clone(), edges.clone());
        let (_, second) = schedule(items, edges);
        assert_eq!(first.critical_path, second.critical_path);
        assert_eq!(first.total_duration_days, second.total_duration_days);
    }
}
