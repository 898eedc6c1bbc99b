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

//! Edge lifecycle: create, update and delete with the DAG invariants
//! enforced inside one store transaction.
//!
//! Every mutation takes the tenant's advisory lock first, so concurrent
//! mutations within a tenant serialise and the cycle probe always sees the
//! committed edge set. Events go out only after commit; a failed step rolls
//! the transaction back and emits nothing.

use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use critflow_core::{
    CritflowError, DependencyEdge, DependencyEvent, DependencyPatch, DependencyType, Result,
};
use critflow_storage::{edges, work_items};

use crate::auth::AuthPrincipal;
use crate::events::{publish_dependency_event, publish_recalc, EventBus};

/// Validated input for a new edge.
#[derive(Debug, Clone)]
pub struct CreateDependency {
    pub from_id: Uuid,
    pub to_id: Uuid,
    pub dependency_type: DependencyType,
    pub lag_days: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Orchestrates edge mutations against the store and the bus.
pub struct DependencyService {
    pool: PgPool,
    bus: Arc<dyn EventBus>,
}

impl DependencyService {
    pub fn new(pool: PgPool, bus: Arc<dyn EventBus>) -> Self {
        Self { pool, bus }
    }

    /// Create an edge. Inside one transaction: verify both endpoints exist
    /// in the tenant, probe for cycle creation, check uniqueness, insert.
    pub async fn create(
        &self,
        principal: &AuthPrincipal,
        request: CreateDependency,
    ) -> Result<DependencyEdge> {
        let tenant_id = principal.tenant_id;

        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        edges::lock_tenant(&mut tx, tenant_id).await?;

        let missing =
            work_items::find_missing(&mut tx, tenant_id, &[request.from_id, request.to_id])
                .await?;
        if !missing.is_empty() {
            return Err(CritflowError::WorkItemsNotFound(missing));
        }

        // An existing path to_id -> .. -> from_id means the new edge closes
        // a cycle; report the full loop.
        if let Some(path) =
            edges::find_path(&mut tx, tenant_id, request.to_id, request.from_id).await?
        {
            let mut chain = path;
            chain.push(request.to_id);
            return Err(CritflowError::CycleDetected { chain });
        }

        if edges::exists(&mut tx, tenant_id, request.from_id, request.to_id).await? {
            return Err(CritflowError::DuplicateDependency {
                from_id: request.from_id,
                to_id: request.to_id,
            });
        }

        let now = Utc::now();
        let edge = DependencyEdge {
            id: Uuid::new_v4(),
            tenant_id,
            from_id: request.from_id,
            to_id: request.to_id,
            dependency_type: request.dependency_type,
            lag_days: request.lag_days,
            created_at: now,
            created_by: principal.id,
            updated_at: now,
            metadata: request
                .metadata
                .unwrap_or_else(|| serde_json::json!({})),
        };

        edges::insert(&mut tx, &edge).await.map_err(|err| {
            if err.is_unique_violation() {
                CritflowError::DuplicateDependency {
                    from_id: edge.from_id,
                    to_id: edge.to_id,
                }
            } else {
                err.into()
            }
        })?;
        tx.commit().await.map_err(storage_err)?;

        publish_recalc(self.bus.as_ref(), tenant_id);
        publish_dependency_event(
            self.bus.as_ref(),
            &DependencyEvent::created(&edge, principal.id, Utc::now()),
        );

        info!(
            tenant_id = %tenant_id,
            dependency_id = %edge.id,
            from_id = %edge.from_id,
            to_id = %edge.to_id,
            "dependency created"
        );
        Ok(edge)
    }

    /// Read one edge.
    pub async fn get(&self, principal: &AuthPrincipal, edge_id: Uuid) -> Result<DependencyEdge> {
        edges::fetch(&self.pool, principal.tenant_id, edge_id)
            .await?
            .ok_or(CritflowError::DependencyNotFound(edge_id))
    }

    /// List the tenant's edges, newest first.
    pub async fn list(
        &self,
        principal: &AuthPrincipal,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DependencyEdge>> {
        Ok(edges::list(&self.pool, principal.tenant_id, limit, offset).await?)
    }

    /// Apply a patch to an edge. An empty patch is a no-op read: no write,
    /// no events.
    pub async fn update(
        &self,
        principal: &AuthPrincipal,
        edge_id: Uuid,
        patch: DependencyPatch,
    ) -> Result<DependencyEdge> {
        let tenant_id = principal.tenant_id;

        if patch.is_empty() {
            return self.get(principal, edge_id).await;
        }

        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        edges::lock_tenant(&mut tx, tenant_id).await?;

        let before = edges::fetch_in_tx(&mut tx, tenant_id, edge_id)
            .await?
            .ok_or(CritflowError::DependencyNotFound(edge_id))?;

        let after = patch.apply(&before, Utc::now());
        edges::update(&mut tx, &after).await?;
        tx.commit().await.map_err(storage_err)?;

        let patch_json = serde_json::to_value(&patch).unwrap_or_default();
        publish_recalc(self.bus.as_ref(), tenant_id);
        publish_dependency_event(
            self.bus.as_ref(),
            &DependencyEvent::updated(&before, &after, patch_json, principal.id, Utc::now()),
        );

        info!(
            tenant_id = %tenant_id,
            dependency_id = %edge_id,
            "dependency updated"
        );
        Ok(after)
    }

    /// Delete an edge, returning the prior snapshot.
    pub async fn delete(
        &self,
        principal: &AuthPrincipal,
        edge_id: Uuid,
    ) -> Result<DependencyEdge> {
        let tenant_id = principal.tenant_id;

        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        edges::lock_tenant(&mut tx, tenant_id).await?;

        let before = edges::fetch_in_tx(&mut tx, tenant_id, edge_id)
            .await?
            .ok_or(CritflowError::DependencyNotFound(edge_id))?;

        edges::delete(&mut tx, tenant_id, edge_id).await?;
        tx.commit().await.map_err(storage_err)?;

        publish_recalc(self.bus.as_ref(), tenant_id);
        publish_dependency_event(
            self.bus.as_ref(),
            &DependencyEvent::deleted(&before, principal.id, Utc::now()),
        );

        info!(
            tenant_id = %tenant_id,
            dependency_id = %edge_id,
            "dependency deleted"
        );
        Ok(before)
    }
}

fn storage_err(err: sqlx::Error) -> CritflowError {
    CritflowError::Storage(err.to_string())
}
