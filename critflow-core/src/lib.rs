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

//! Critflow Core
//!
//! Fundamental data structures and graph algorithms for the dependency
//! graph engine: work items, dependency edges, mutation events, and the
//! in-memory graph with its critical-path, cycle-detection and schedule
//! analysis passes. Everything in this crate is pure; all I/O lives in
//! `critflow-storage` and `critflow-server`.

pub mod dependency;
pub mod error;
pub mod event;
pub mod graph;
pub mod work_item;

pub use dependency::{DependencyEdge, DependencyPatch, DependencyType};
pub use error::{CritflowError, Result};
pub use event::{
    DependencyEvent, DependencyEventKind, RecalcRequest, EXCHANGE_DEPENDENCIES, EXCHANGE_SYSTEM,
    ROUTING_KEY_RECALCULATE,
};
pub use graph::analysis::{find_bottlenecks, risk_score, Bottleneck, ScheduleRisk};
pub use graph::cpm::{compute_schedule, CpmSummary};
pub use graph::cycles::{detect_cycles, CycleAnalysis};
pub use graph::{DependencyGraph, GraphEdge, GraphNode};
pub use work_item::{default_duration_days, WorkItem, STATUS_BLOCKED};
