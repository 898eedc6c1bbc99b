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

//! HTTP surface: a thin mapping of requests onto the core operations.
//! Domain errors travel here unmodified and are classified by their stable
//! surface code.

pub mod analysis;
pub mod dependencies;
pub mod graph;
pub mod health;

pub use analysis::{get_critical_path, get_cycles};
pub use dependencies::{
    create_dependency, delete_dependency, get_dependency, list_dependencies, update_dependency,
};
pub use graph::get_graph;
pub use health::{health_check, health_check_detailed};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use critflow_core::CritflowError;

use crate::lifecycle::DependencyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub service: Arc<DependencyService>,
}

/// Uniform response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Domain error adapted to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CritflowError);

impl From<CritflowError> for ApiError {
    fn from(err: CritflowError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            CritflowError::MissingRequiredFields(_)
            | CritflowError::InvalidRequest(_)
            | CritflowError::WorkItemsNotFound(_) => StatusCode::BAD_REQUEST,
            CritflowError::DependencyNotFound(_) => StatusCode::NOT_FOUND,
            CritflowError::DuplicateDependency { .. } | CritflowError::CycleDetected { .. } => {
                StatusCode::CONFLICT
            }
            CritflowError::Storage(_) | CritflowError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self.0);
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.code().to_string()),
            message: Some(self.0.to_string()),
            timestamp: Utc::now(),
        };

        (status, Json(body)).into_response()
    }
}
