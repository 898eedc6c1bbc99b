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

//! Dependency edges: the one entity Critflow owns. A tenant's edge set is
//! kept acyclic at all times; `(tenant_id, from_id, to_id)` is unique and
//! self-loops are rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Scheduling relationship between the two endpoints of an edge.
///
/// All four variants are stored and returned, but the scheduling passes
/// currently treat every edge as finish-to-start with its lag. See the
/// engine docs before relying on SS/FF/SF timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "finish_to_start",
            DependencyType::StartToStart => "start_to_start",
            DependencyType::FinishToFinish => "finish_to_finish",
            DependencyType::StartToFinish => "start_to_finish",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = crate::CritflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finish_to_start" => Ok(DependencyType::FinishToStart),
            "start_to_start" => Ok(DependencyType::StartToStart),
            "finish_to_finish" => Ok(DependencyType::FinishToFinish),
            "start_to_finish" => Ok(DependencyType::StartToFinish),
            other => Err(crate::CritflowError::InvalidRequest(format!(
                "unknown dependency type: {}",
                other
            ))),
        }
    }
}

/// A stored dependency edge with its audit fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyEdge {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Partial update for an edge. Endpoints are immutable; changing them is a
/// delete plus a create so the cycle probe always runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_type: Option<DependencyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lag_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl DependencyPatch {
    /// An empty patch is a no-op: no write, no events.
    pub fn is_empty(&self) -> bool {
        self.dependency_type.is_none() && self.lag_days.is_none() && self.metadata.is_none()
    }

    /// Apply the present fields to an edge, returning the updated copy.
    pub fn apply(&self, edge: &DependencyEdge, now: DateTime<Utc>) -> DependencyEdge {
        let mut updated = edge.clone();
        if let Some(dep_type) = self.dependency_type {
            updated.dependency_type = dep_type;
        }
        if let Some(lag) = self.lag_days {
            updated.lag_days = lag;
        }
        if let Some(ref metadata) = self.metadata {
            updated.metadata = metadata.clone();
        }
        updated.updated_at = now;
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_type_round_trip() {
        for s in [
            "finish_to_start",
            "start_to_start",
            "finish_to_finish",
            "start_to_finish",
        ] {
            let parsed: DependencyType = s.parse().unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn test_dependency_type_rejects_unknown() {
        assert!("blocks".parse::<DependencyType>().is_err());
        assert!("".parse::<DependencyType>().is_err());
    }

    #[test]
    fn test_dependency_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&DependencyType::StartToFinish).unwrap();
        assert_eq!(json, "\"start_to_finish\"");
    }

    #[test]
    fn test_empty_patch() {
        assert!(DependencyPatch::default().is_empty());
        let patch = DependencyPatch {
            lag_days: Some(2),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_apply_touches_only_present_fields() {
        let now = Utc::now();
        let edge = DependencyEdge {
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
        };

        let later = now + chrono::Duration::seconds(5);
        let patch = DependencyPatch {
            lag_days: Some(3),
            ..Default::default()
        };
        let updated = patch.apply(&edge, later);

        assert_eq!(updated.lag_days, 3);
        assert_eq!(updated.dependency_type, DependencyType::FinishToStart);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.created_at, edge.created_at);
    }
}
