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

//! Mutation and recalculation events published on the bus.
//!
//! Every successful edge mutation emits exactly one `dependency.{kind}`
//! event on the `dependencies` exchange and one recalc request on the
//! `system` exchange. Delivery is at-most-once; consumers of the recalc
//! signal must be idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::DependencyEdge;

/// Exchange carrying `dependency.{created,updated,deleted}` events.
pub const EXCHANGE_DEPENDENCIES: &str = "dependencies";
/// Exchange carrying system-level signals.
pub const EXCHANGE_SYSTEM: &str = "system";
/// Routing key asking downstream consumers to recompute the critical path.
pub const ROUTING_KEY_RECALCULATE: &str = "critical_path.recalculate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyEventKind {
    Created,
    Updated,
    Deleted,
}

impl DependencyEventKind {
    pub fn routing_key(&self) -> &'static str {
        match self {
            DependencyEventKind::Created => "dependency.created",
            DependencyEventKind::Updated => "dependency.updated",
            DependencyEventKind::Deleted => "dependency.deleted",
        }
    }
}

/// A mutation event describing one accepted edge change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyEvent {
    pub kind: DependencyEventKind,
    pub dependency_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl DependencyEvent {
    pub fn created(edge: &DependencyEdge, user_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: DependencyEventKind::Created,
            dependency_id: edge.id,
            tenant_id: edge.tenant_id,
            user_id,
            payload: serde_json::json!({ "dependency": edge }),
            timestamp,
        }
    }

    /// Update events carry before/after snapshots plus the applied patch so
    /// consumers can diff without a store round-trip.
    pub fn updated(
        before: &DependencyEdge,
        after: &DependencyEdge,
        patch: serde_json::Value,
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: DependencyEventKind::Updated,
            dependency_id: after.id,
            tenant_id: after.tenant_id,
            user_id,
            payload: serde_json::json!({
                "before": before,
                "after": after,
                "patch": patch,
            }),
            timestamp,
        }
    }

    pub fn deleted(before: &DependencyEdge, user_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: DependencyEventKind::Deleted,
            dependency_id: before.id,
            tenant_id: before.tenant_id,
            user_id,
            payload: serde_json::json!({ "dependency": before }),
            timestamp,
        }
    }

    pub fn routing_key(&self) -> &'static str {
        self.kind.routing_key()
    }
}

/// Recalculation request for a tenant, published after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalcRequest {
    pub tenant_id: Uuid,
    pub requested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DependencyType;

    fn edge() -> DependencyEdge {
        let now = Utc::now();
        DependencyEdge {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            from_id: Uuid::new_v4(),
            to_id: Uuid::new_v4(),
            dependency_type: DependencyType::FinishToStart,
            lag_days: 0,
            created_at: now,
            created_by: Uuid::new_v4(),
            updated_at: now,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_routing_keys() {
        assert_eq!(DependencyEventKind::Created.routing_key(), "dependency.created");
        assert_eq!(DependencyEventKind::Updated.routing_key(), "dependency.updated");
        assert_eq!(DependencyEventKind::Deleted.routing_key(), "dependency.deleted");
    }

    #[test]
    fn test_created_event_carries_snapshot() {
        let edge = edge();
        let user = Uuid::new_v4();
        let event = DependencyEvent::created(&edge, user, Utc::now());

        assert_eq!(event.kind, DependencyEventKind::Created);
        assert_eq!(event.dependency_id, edge.id);
        assert_eq!(event.tenant_id, edge.tenant_id);
        assert_eq!(event.payload["dependency"]["id"], serde_json::json!(edge.id));
    }

    #[test]
    fn test_updated_event_carries_before_and_after() {
        let before = edge();
        let mut after = before.clone();
        after.lag_days = 5;

        let event = DependencyEvent::updated(
            &before,
            &after,
            serde_json::json!({ "lag_days": 5 }),
            Uuid::new_v4(),
            Utc::now(),
        );

        assert_eq!(event.payload["before"]["lag_days"], serde_json::json!(0));
        assert_eq!(event.payload["after"]["lag_days"], serde_json::json!(5));
        assert_eq!(event.payload["patch"]["lag_days"], serde_json::json!(5));
    }
}
