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

//! Read-only queries over the `work_items` table.

use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use critflow_core::WorkItem;

use crate::error::StorageResult;

#[derive(Debug, Clone, FromRow)]
struct WorkItemRow {
    id: Uuid,
    tenant_id: Uuid,
    item_type: String,
    title: String,
    status: String,
    estimated_duration_days: Option<i32>,
}

impl From<WorkItemRow> for WorkItem {
    fn from(row: WorkItemRow) -> Self {
        WorkItem {
            id: row.id,
            tenant_id: row.tenant_id,
            item_type: row.item_type,
            title: row.title,
            status: row.status,
            estimated_duration_days: row.estimated_duration_days.map(i64::from),
        }
    }
}

/// Fetch the tenant's work items, optionally restricted to an id set.
pub async fn fetch_for_tenant(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: Option<&[Uuid]>,
) -> StorageResult<Vec<WorkItem>> {
    let rows = match filter {
        None => {
            sqlx::query_as::<_, WorkItemRow>(
                r#"
                SELECT id, tenant_id, type AS item_type, title, status, estimated_duration_days
                FROM work_items
                WHERE tenant_id = $1
                ORDER BY id ASC
                "#,
            )
            .bind(tenant_id)
            .fetch_all(pool)
            .await?
        }
        Some(ids) => {
            sqlx::query_as::<_, WorkItemRow>(
                r#"
                SELECT id, tenant_id, type AS item_type, title, status, estimated_duration_days
                FROM work_items
                WHERE tenant_id = $1
                  AND id = ANY($2)
                ORDER BY id ASC
                "#,
            )
            .bind(tenant_id)
            .bind(ids)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(WorkItem::from).collect())
}

/// Return the subset of `ids` that does not exist in the tenant. Runs inside
/// the mutation transaction so the existence check and the write see the
/// same snapshot.
pub async fn find_missing(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    ids: &[Uuid],
) -> StorageResult<Vec<Uuid>> {
    let found: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id
        FROM work_items
        WHERE tenant_id = $1
          AND id = ANY($2)
        "#,
    )
    .bind(tenant_id)
    .bind(ids)
    .fetch_all(&mut **tx)
    .await?;

    let mut missing: Vec<Uuid> = ids
        .iter()
        .copied()
        .filter(|id| !found.iter().any(|(f,)| f == id))
        .collect();
    missing.dedup();
    Ok(missing)
}
