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

//! Domain error types. Errors are raised at the point of detection and
//! travel unmodified to the HTTP boundary, where they are classified by
//! their stable surface code.

use thiserror::Error;
use uuid::Uuid;

/// Result type for Critflow domain operations
pub type Result<T> = std::result::Result<T, CritflowError>;

/// Errors produced by the dependency graph engine
#[derive(Debug, Error)]
pub enum CritflowError {
    /// Required field absent from a request
    #[error("Missing required fields: {0}")]
    MissingRequiredFields(String),

    /// Field present but rejected
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Referenced work item(s) not found in the tenant
    #[error("Work items not found: {}", join_ids(.0))]
    WorkItemsNotFound(Vec<Uuid>),

    /// Addressed edge does not exist in the tenant
    #[error("Dependency not found: {0}")]
    DependencyNotFound(Uuid),

    /// Uniqueness invariant would be violated
    #[error("Dependency already exists from {from_id} to {to_id}")]
    DuplicateDependency { from_id: Uuid, to_id: Uuid },

    /// DAG invariant would be violated; the chain is one offending path
    #[error("Dependency would create a cycle: {}", format_chain(.chain))]
    CycleDetected { chain: Vec<Uuid> },

    /// Store failure, surfaced as 500
    #[error("Storage error: {0}")]
    Storage(String),

    /// All other failures
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CritflowError {
    /// Stable surface code, identical across implementations.
    pub fn code(&self) -> &'static str {
        match self {
            CritflowError::MissingRequiredFields(_) => "MISSING_REQUIRED_FIELDS",
            CritflowError::InvalidRequest(_) => "INVALID_REQUEST",
            CritflowError::WorkItemsNotFound(_) => "WORK_ITEMS_NOT_FOUND",
            CritflowError::DependencyNotFound(_) => "DEPENDENCY_NOT_FOUND",
            CritflowError::DuplicateDependency { .. } => "DUPLICATE_DEPENDENCY",
            CritflowError::CycleDetected { .. } => "CYCLE_DETECTED",
            CritflowError::Storage(_) => "INTERNAL_ERROR",
            CritflowError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a cycle chain as `a -> b -> a`.
pub fn format_chain(chain: &[Uuid]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
