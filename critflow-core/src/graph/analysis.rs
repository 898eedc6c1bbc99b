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

//! Schedule analysis: bottleneck identification and plan risk.
//!
//! Runs over a graph that the CPM passes have already annotated; criticality
//! flags must be set before calling in here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DependencyGraph, STATUS_BLOCKED};

/// Fan-in/fan-out above this marks a coordination hotspot.
const DEGREE_THRESHOLD: usize = 3;
/// Items longer than this are considered long-running.
const LONG_DURATION_DAYS: i64 = 30;

pub const RISK_HIGH_DEPENDENCY: &str = "High dependency count";
pub const RISK_BLOCKS_MANY: &str = "Blocks many items";
pub const RISK_BLOCKED: &str = "Currently blocked";
pub const RISK_LONG_DURATION: &str = "Long duration";

/// A critical node whose shape or state makes it likely to slip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub work_item_id: Uuid,
    pub title: String,
    /// Days the project slips if this item slips fully: its own duration,
    /// since a critical node has no slack to absorb it.
    pub delay_impact_days: i64,
    pub risk_factors: Vec<String>,
    pub mitigation_suggestions: Vec<String>,
}

/// Aggregate plan risk derived from node counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRisk {
    pub risk_score: f64,
    pub completion_probability: f64,
    pub critical_count: usize,
    pub blocked_count: usize,
    pub long_running_count: usize,
}

/// Identify bottlenecks: critical nodes with at least one aggravating
/// factor, sorted by delay impact descending.
pub fn find_bottlenecks(graph: &DependencyGraph) -> Vec<Bottleneck> {
    let mut bottlenecks: Vec<Bottleneck> = Vec::new();

    for id in graph.sorted_node_ids() {
        let node = graph.node(&id).expect("listed node exists");
        if !node.is_critical {
            continue;
        }

        let mut factors: Vec<&'static str> = Vec::new();
        if graph.indegree(&id) > DEGREE_THRESHOLD {
            factors.push(RISK_HIGH_DEPENDENCY);
        }
        if graph.outdegree(&id) > DEGREE_THRESHOLD {
            factors.push(RISK_BLOCKS_MANY);
        }
        if node.status == STATUS_BLOCKED {
            factors.push(RISK_BLOCKED);
        }
        if node.duration_days > LONG_DURATION_DAYS {
            factors.push(RISK_LONG_DURATION);
        }

        if factors.is_empty() {
            continue;
        }

        bottlenecks.push(Bottleneck {
            work_item_id: id,
            title: node.title.clone(),
            delay_impact_days: node.duration_days,
            mitigation_suggestions: factors.iter().map(|f| mitigation(f)).collect(),
            risk_factors: factors.into_iter().map(String::from).collect(),
        });
    }

    bottlenecks.sort_by(|a, b| {
        b.delay_impact_days
            .cmp(&a.delay_impact_days)
            .then(a.work_item_id.cmp(&b.work_item_id))
    });
    bottlenecks
}

fn mitigation(risk_factor: &str) -> String {
    match risk_factor {
        RISK_HIGH_DEPENDENCY => {
            "Review incoming dependencies and drop any that are not strictly required".to_string()
        }
        RISK_BLOCKS_MANY => {
            "Split this work item so dependent work can start earlier".to_string()
        }
        RISK_BLOCKED => "Resolve the blocker; this item has no schedule slack".to_string(),
        RISK_LONG_DURATION => "Break this work item into smaller increments".to_string(),
        other => format!("Investigate: {}", other),
    }
}

/// Risk score over the whole graph.
///
/// `min(1, (0.3 * critical + 0.5 * blocked + 0.2 * long) / N)`, with an
/// empty graph scoring 0. Completion probability is the floor-clamped
/// complement.
pub fn risk_score(graph: &DependencyGraph) -> ScheduleRisk {
    let total = graph.node_count();
    let critical_count = graph.nodes().filter(|node| node.is_critical).count();
    let blocked_count = graph
        .nodes()
        .filter(|node| node.status == STATUS_BLOCKED)
        .count();
    let long_running_count = graph
        .nodes()
        .filter(|node| node.duration_days > LONG_DURATION_DAYS)
        .count();

    let risk_score = if total == 0 {
        0.0
    } else {
        let weighted = 0.3 * critical_count as f64
            + 0.5 * blocked_count as f64
            + 0.2 * long_running_count as f64;
        (weighted / total as f64).min(1.0)
    };

    ScheduleRisk {
        risk_score,
        completion_probability: (1.0 - risk_score).max(0.1),
        critical_count,
        blocked_count,
        long_running_count,
    }
}
