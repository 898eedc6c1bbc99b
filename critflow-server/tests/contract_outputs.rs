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

//! Wire-contract checks: the JSON shapes consumers depend on must not drift.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use critflow_core::{
    compute_schedule, detect_cycles, DependencyEdge, DependencyEvent, DependencyGraph,
    DependencyType, WorkItem,
};

fn work_item(id: Uuid, title: &str, duration: i64) -> WorkItem {
    WorkItem {
        id,
        tenant_id: Uuid::nil(),
        item_type: "task".to_string(),
        title: title.to_string(),
        status: "open".to_string(),
        estimated_duration_days: Some(duration),
    }
}

fn edge(from_id: Uuid, to_id: Uuid) -> DependencyEdge {
    let now = Utc::now();
    DependencyEdge {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        from_id,
        to_id,
        dependency_type: DependencyType::FinishToStart,
        lag_days: 0,
        created_at: now,
        created_by: Uuid::nil(),
        updated_at: now,
        metadata: json!({}),
    }
}

#[test]
fn dependency_edge_wire_shape() {
    let value = serde_json::to_value(edge(Uuid::new_v4(), Uuid::new_v4())).unwrap();

    for field in [
        "id",
        "tenant_id",
        "from_id",
        "to_id",
        "dependency_type",
        "lag_days",
        "created_at",
        "created_by",
        "updated_at",
        "metadata",
    ] {
        assert!(value.get(field).is_some(), "missing field {}", field);
    }
    assert_eq!(value["dependency_type"], json!("finish_to_start"));
}

#[test]
fn graph_node_wire_shape_after_scheduling() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let items = vec![work_item(a, "design", 2), work_item(b, "build", 3)];
    let edges = vec![edge(a, b)];

    let mut graph = DependencyGraph::assemble(&items, &edges);
    compute_schedule(&mut graph, Utc::now()).unwrap();
    let (nodes, graph_edges) = graph.into_parts();

    let node = serde_json::to_value(&nodes[0]).unwrap();
    for field in [
        "id",
        "title",
        "type",
        "status",
        "duration_days",
        "earliest_start",
        "earliest_finish",
        "latest_start",
        "latest_finish",
        "slack_days",
        "is_critical",
    ] {
        assert!(node.get(field).is_some(), "missing field {}", field);
    }
    assert!(node["earliest_start"].is_string(), "calendar field not set");

    let edge = serde_json::to_value(&graph_edges[0]).unwrap();
    assert_eq!(edge["is_critical"], json!(true));
}

#[test]
fn mutation_event_wire_shape() {
    let edge = edge(Uuid::new_v4(), Uuid::new_v4());
    let event = DependencyEvent::created(&edge, edge.created_by, Utc::now());
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["kind"], json!("created"));
    for field in ["dependency_id", "tenant_id", "user_id", "payload", "timestamp"] {
        assert!(value.get(field).is_some(), "missing field {}", field);
    }
}

#[test]
fn cycle_analysis_wire_shape() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let items = vec![work_item(a, "a", 1), work_item(b, "b", 1)];
    let edges = vec![edge(a, b), edge(b, a)];

    let graph = DependencyGraph::assemble(&items, &edges);
    let analysis = detect_cycles(&graph);
    let value = serde_json::to_value(&analysis).unwrap();

    assert_eq!(value["has_cycles"], json!(true));
    assert!(value["cycles"].is_array());
    assert!(value["affected_nodes"].is_array());
    assert!(value["suggestions"].is_array());
}
