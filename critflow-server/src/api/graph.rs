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

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use critflow_core::{
    compute_schedule, CritflowError, DependencyGraph, GraphEdge, GraphNode,
};
use critflow_storage::{edges, work_items};

use crate::api::{ApiError, ApiResponse, AppState};
use crate::auth::AuthPrincipal;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GraphParams {
    /// Comma-separated work item ids restricting the node set.
    pub work_item_ids: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub critical_path: Vec<Uuid>,
    pub total_duration_days: i64,
}

/// Materialise the tenant's graph, optionally filtered by a node-id set.
pub(crate) async fn build_graph(
    state: &AppState,
    tenant_id: Uuid,
    filter: Option<&[Uuid]>,
) -> Result<DependencyGraph, ApiError> {
    let items = work_items::fetch_for_tenant(&state.pool, tenant_id, filter)
        .await
        .map_err(CritflowError::from)?;
    let edge_rows = edges::fetch_for_graph(&state.pool, tenant_id, filter)
        .await
        .map_err(CritflowError::from)?;

    Ok(DependencyGraph::assemble(&items, &edge_rows))
}

pub(crate) fn parse_id_filter(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            Uuid::parse_str(part).map_err(|_| {
                ApiError(CritflowError::InvalidRequest(format!(
                    "'{}' is not a valid work item id",
                    part
                )))
            })
        })
        .collect()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/graph
/// The tenant's dependency graph with CPM annotations.
pub async fn get_graph(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Query(params): Query<GraphParams>,
) -> Result<Json<ApiResponse<GraphResponse>>, ApiError> {
    let filter = params
        .work_item_ids
        .as_deref()
        .map(parse_id_filter)
        .transpose()?;

    debug!(
        tenant_id = %principal.tenant_id,
        filtered = filter.is_some(),
        "building dependency graph"
    );

    let mut graph = build_graph(&state, principal.tenant_id, filter.as_deref()).await?;
    let summary = compute_schedule(&mut graph, Utc::now())?;
    let (nodes, edges) = graph.into_parts();

    Ok(Json(ApiResponse::ok(GraphResponse {
        nodes,
        edges,
        critical_path: summary.critical_path,
        total_duration_days: summary.total_duration_days,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_filter() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_id_filter(&format!("{}, {}", a, b)).unwrap();
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn test_parse_id_filter_rejects_garbage() {
        assert!(parse_id_filter("not-a-uuid").is_err());
    }

    #[test]
    fn test_parse_id_filter_skips_empty_parts() {
        let a = Uuid::new_v4();
        let parsed = parse_id_filter(&format!("{},,", a)).unwrap();
        assert_eq!(parsed, vec![a]);
    }
}
