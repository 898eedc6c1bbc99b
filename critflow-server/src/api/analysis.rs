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

use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use critflow_core::{
    compute_schedule, detect_cycles, find_bottlenecks, risk_score, Bottleneck, CycleAnalysis,
};

use crate::api::graph::build_graph;
use crate::api::{ApiError, ApiResponse, AppState};
use crate::auth::AuthPrincipal;

#[derive(Debug, Serialize)]
pub struct CriticalPathResponse {
    pub critical_path: Vec<Uuid>,
    pub total_duration_days: i64,
    pub estimated_completion: DateTime<Utc>,
    pub bottlenecks: Vec<Bottleneck>,
    pub risk_score: f64,
    pub completion_probability: f64,
}

/// GET /api/critical-path
/// Whole-graph critical path with bottlenecks and plan risk. Recomputed on
/// every call; nothing is cached or persisted.
pub async fn get_critical_path(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<Json<ApiResponse<CriticalPathResponse>>, ApiError> {
    debug!(tenant_id = %principal.tenant_id, "critical path requested");

    let now = Utc::now();
    let mut graph = build_graph(&state, principal.tenant_id, None).await?;
    let summary = compute_schedule(&mut graph, now)?;
    let bottlenecks = find_bottlenecks(&graph);
    let risk = risk_score(&graph);

    Ok(Json(ApiResponse::ok(CriticalPathResponse {
        critical_path: summary.critical_path,
        estimated_completion: now + Duration::days(summary.total_duration_days),
        total_duration_days: summary.total_duration_days,
        bottlenecks,
        risk_score: risk.risk_score,
        completion_probability: risk.completion_probability,
    })))
}

/// GET /api/cycles
/// Full-graph cycle scan. The mutation path keeps the store acyclic, so a
/// hit here points at writes that bypassed the service.
pub async fn get_cycles(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> Result<Json<ApiResponse<CycleAnalysis>>, ApiError> {
    debug!(tenant_id = %principal.tenant_id, "cycle scan requested");

    let graph = build_graph(&state, principal.tenant_id, None).await?;
    let analysis = detect_cycles(&graph);

    if analysis.has_cycles {
        tracing::warn!(
            tenant_id = %principal.tenant_id,
            cycles = analysis.cycles.len(),
            "stored graph contains cycles"
        );
    }

    Ok(Json(ApiResponse::ok(analysis)))
}
