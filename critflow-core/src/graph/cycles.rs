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

//! Cycle detection over the in-memory graph.
//!
//! Three-colour depth-first search with an explicit stack: a back edge to a
//! node still on the stack closes a cycle, recorded as the path slice from
//! that node to the top plus the node again. The search keeps going after a
//! hit so every component is examined and all cycles are reported.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::DependencyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Unvisited,
    OnStack,
    Done,
}

/// Result of scanning a graph for cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleAnalysis {
    pub has_cycles: bool,
    /// Each cycle as a closed chain: the first node appears again at the end.
    pub cycles: Vec<Vec<Uuid>>,
    /// Union of all nodes appearing in any cycle, sorted.
    pub affected_nodes: Vec<Uuid>,
    pub suggestions: Vec<String>,
}

/// Scan the whole graph and report every cycle.
pub fn detect_cycles(graph: &DependencyGraph) -> CycleAnalysis {
    let mut colour: HashMap<Uuid, Colour> = graph
        .sorted_node_ids()
        .into_iter()
        .map(|id| (id, Colour::Unvisited))
        .collect();

    let mut cycles: Vec<Vec<Uuid>> = Vec::new();
    let mut path: Vec<Uuid> = Vec::new();

    for start in graph.sorted_node_ids() {
        if colour[&start] != Colour::Unvisited {
            continue;
        }

        // Frame: (node, successors, next successor index)
        let mut stack: Vec<(Uuid, Vec<Uuid>, usize)> =
            vec![(start, graph.successor_ids(&start), 0)];
        colour.insert(start, Colour::OnStack);
        path.push(start);

        while !stack.is_empty() {
            let (node, next) = {
                let frame = stack.last_mut().expect("stack is non-empty");
                if frame.2 < frame.1.len() {
                    let next = frame.1[frame.2];
                    frame.2 += 1;
                    (frame.0, Some(next))
                } else {
                    (frame.0, None)
                }
            };

            match next {
                Some(next) => match colour[&next] {
                    Colour::Unvisited => {
                        colour.insert(next, Colour::OnStack);
                        path.push(next);
                        stack.push((next, graph.successor_ids(&next), 0));
                    }
                    Colour::OnStack => {
                        // Back edge: slice the current path from the first
                        // occurrence of the target and close the loop.
                        let from = path
                            .iter()
                            .position(|id| *id == next)
                            .expect("on-stack node is on the path");
                        let mut cycle: Vec<Uuid> = path[from..].to_vec();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                    Colour::Done => {}
                },
                None => {
                    colour.insert(node, Colour::Done);
                    path.pop();
                    stack.pop();
                }
            }
        }
    }

    let affected: BTreeSet<Uuid> = cycles.iter().flatten().copied().collect();
    let suggestions = cycles.iter().map(|cycle| suggestion(graph, cycle)).collect();

    CycleAnalysis {
        has_cycles: !cycles.is_empty(),
        affected_nodes: affected.into_iter().collect(),
        cycles,
        suggestions,
    }
}

fn suggestion(graph: &DependencyGraph, cycle: &[Uuid]) -> String {
    let chain = cycle
        .iter()
        .map(|id| {
            graph
                .node(id)
                .map(|node| node.title.clone())
                .unwrap_or_else(|| id.to_string())
        })
        .collect::<Vec<_>>()
        .join(" -> ");
    format!(
        "Remove or reverse one dependency in the chain {} to restore a valid schedule",
        chain
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{edge, work_item};

    #[test]
    fn test_acyclic_graph_reports_clean() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            work_item(a, "a", 1),
            work_item(b, "b", 1),
            work_item(c, "c", 1),
        ];
        let graph = DependencyGraph::assemble(&items, &[edge(a, b, 0), edge(b, c, 0)]);

        let analysis = detect_cycles(&graph);
        assert!(!analysis.has_cycles);
        assert!(analysis.cycles.is_empty());
        assert!(analysis.affected_nodes.is_empty());
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn test_triangle_cycle_is_closed_chain() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let items = vec![
            work_item(a, "a", 1),
            work_item(b, "b", 1),
            work_item(c, "c", 1),
        ];
        let graph =
            DependencyGraph::assemble(&items, &[edge(a, b, 0), edge(b, c, 0), edge(c, a, 0)]);

        let analysis = detect_cycles(&graph);
        assert!(analysis.has_cycles);
        assert_eq!(analysis.cycles.len(), 1);

        let cycle = &analysis.cycles[0];
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);

        let mut affected = vec![a, b, c];
        affected.sort();
        assert_eq!(analysis.affected_nodes, affected);
        assert_eq!(analysis.suggestions.len(), 1);
        assert!(analysis.suggestions[0].contains(" -> "));
    }

    #[test]
    fn test_detects_cycles_in_every_component() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let items: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| work_item(*id, &format!("n{}", i), 1))
            .collect();
        // Component one: 0 <-> 1. Component two: 2 -> 3 -> 4 -> 2.
        let edges = vec![
            edge(ids[0], ids[1], 0),
            edge(ids[1], ids[0], 0),
            edge(ids[2], ids[3], 0),
            edge(ids[3], ids[4], 0),
            edge(ids[4], ids[2], 0),
        ];
        let graph = DependencyGraph::assemble(&items, &edges);

        let analysis = detect_cycles(&graph);
        assert_eq!(analysis.cycles.len(), 2);
        assert_eq!(analysis.affected_nodes.len(), 5);
    }

    #[test]
    fn test_self_loop() {
        let a = Uuid::new_v4();
        let graph = DependencyGraph::assemble(&[work_item(a, "a", 1)], &[edge(a, a, 0)]);

        let analysis = detect_cycles(&graph);
        assert!(analysis.has_cycles);
        assert_eq!(analysis.cycles[0], vec![a, a]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let (a, b, c, d) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        let items = vec![
            work_item(a, "a", 1),
            work_item(b, "b", 1),
            work_item(c, "c", 1),
            work_item(d, "d", 1),
        ];
        let edges = vec![edge(a, b, 0), edge(a, c, 0), edge(b, d, 0), edge(c, d, 0)];
        let graph = DependencyGraph::assemble(&items, &edges);

        assert!(!detect_cycles(&graph).has_cycles);
    }
}
