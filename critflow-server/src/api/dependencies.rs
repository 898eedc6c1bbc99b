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
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use critflow_core::{CritflowError, DependencyEdge, DependencyPatch, DependencyType};

use crate::api::{ApiError, ApiResponse, AppState};
use crate::auth::AuthPrincipal;
use crate::lifecycle::CreateDependency;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateDependencyRequest {
    pub from_id: Option<Uuid>,
    pub to_id: Option<Uuid>,
    pub dependency_type: Option<String>,
    pub lag_days: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDependencyRequest {
    pub dependency_type: Option<String>,
    pub lag_days: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

fn parse_edge_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError(CritflowError::InvalidRequest(format!(
            "'{}' is not a valid dependency id",
            raw
        )))
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// POST /api/dependencies
pub async fn create_dependency(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateDependencyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DependencyEdge>>), ApiError> {
    let mut missing = Vec::new();
    if body.from_id.is_none() {
        missing.push("from_id");
    }
    if body.to_id.is_none() {
        missing.push("to_id");
    }
    if body.dependency_type.is_none() {
        missing.push("dependency_type");
    }
    let (Some(from_id), Some(to_id), Some(raw_type)) =
        (body.from_id, body.to_id, body.dependency_type.as_deref())
    else {
        return Err(ApiError(CritflowError::MissingRequiredFields(
            missing.join(", "),
        )));
    };

    let dependency_type: DependencyType = raw_type.parse()?;

    debug!(
        tenant_id = %principal.tenant_id,
        "create dependency request"
    );

    let edge = state
        .service
        .create(
            &principal,
            CreateDependency {
                from_id,
                to_id,
                dependency_type,
                lag_days: body.lag_days.unwrap_or(0),
                metadata: body.metadata,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(edge))))
}

/// GET /api/dependencies
pub async fn list_dependencies(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<DependencyEdge>>>, ApiError> {
    if params.limit <= 0 || params.limit > 1000 {
        return Err(ApiError(CritflowError::InvalidRequest(
            "limit must be between 1 and 1000".to_string(),
        )));
    }

    let edges = state
        .service
        .list(&principal, params.limit, params.offset.max(0))
        .await?;
    Ok(Json(ApiResponse::ok(edges)))
}

/// GET /api/dependencies/:id
pub async fn get_dependency(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DependencyEdge>>, ApiError> {
    let edge_id = parse_edge_id(&id)?;
    let edge = state.service.get(&principal, edge_id).await?;
    Ok(Json(ApiResponse::ok(edge)))
}

/// PUT /api/dependencies/:id
pub async fn update_dependency(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDependencyRequest>,
) -> Result<Json<ApiResponse<DependencyEdge>>, ApiError> {
    let edge_id = parse_edge_id(&id)?;

    let dependency_type = body
        .dependency_type
        .as_deref()
        .map(str::parse::<DependencyType>)
        .transpose()?;

    let patch = DependencyPatch {
        dependency_type,
        lag_days: body.lag_days,
        metadata: body.metadata,
    };

    let edge = state.service.update(&principal, edge_id, patch).await?;
    Ok(Json(ApiResponse::ok(edge)))
}

/// DELETE /api/dependencies/:id
pub async fn delete_dependency(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let edge_id = parse_edge_id(&id)?;
    state.service.delete(&principal, edge_id).await?;
    Ok(Json(ApiResponse::message("Dependency deleted")))
}
