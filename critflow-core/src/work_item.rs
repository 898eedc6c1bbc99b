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

//! Work items are external entities: Critflow reads them, never writes them.
//! Their lifecycle (creation, status transitions, estimation) belongs to the
//! upstream work-tracking system.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status value with scheduling semantics: a blocked item on the critical
/// path is flagged as a bottleneck. All other status values are opaque.
pub const STATUS_BLOCKED: &str = "blocked";

/// A work item as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Categorical type: objective, strategy, initiative, task, subtask.
    /// Unknown values are tolerated and scheduled with the fallback duration.
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub status: String,
    /// Estimate in whole days. Absent estimates fall back to the per-type
    /// default from [`default_duration_days`].
    pub estimated_duration_days: Option<i64>,
}

impl WorkItem {
    /// Effective duration used by the scheduling passes.
    pub fn duration_days(&self) -> i64 {
        self.estimated_duration_days
            .unwrap_or_else(|| default_duration_days(&self.item_type))
    }
}

/// Default duration in days for a work item type without an estimate.
pub fn default_duration_days(item_type: &str) -> i64 {
    match item_type {
        "objective" => 90,
        "strategy" => 60,
        "initiative" => 30,
        "task" => 7,
        "subtask" => 3,
        _ => 7,
    }
}
