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

//! Queries and transaction helpers over the `dependency_edges` table,
//! including the stored-edge reachability probe used to veto cycle-creating
//! inserts.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use critflow_core::{DependencyEdge, DependencyType};

use crate::error::{StorageError, StorageResult};

/// Depth bound for the reachability probe. Chains deeper than this are
/// treated as unreachable rather than searched exhaustively.
pub const MAX_PROBE_DEPTH: usize = 20;

#[derive(Debug, Clone, FromRow)]
struct EdgeRow {
    id: Uuid,
    tenant_id: Uuid,
    from_id: Uuid,
    to_id: Uuid,
    dependency_type: String,
    lag_days: i32,
    created_at: DateTime<Utc>,
    created_by: Uuid,
    updated_at: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl TryFrom<EdgeRow> for DependencyEdge {
    type Error = StorageError;

    fn try_from(row: EdgeRow) -> Result<Self, Self::Error> {
        let dependency_type: DependencyType = row.dependency_type.parse().map_err(|_| {
            StorageError::Corrupt(format!(
                "edge {} has unknown dependency_type '{}'",
                row.id, row.dependency_type
            ))
        })?;
        Ok(DependencyEdge {
            id: row.id,
            tenant_id: row.tenant_id,
            from_id: row.from_id,
            to_id: row.to_id,
            dependency_type,
            lag_days: i64::from(row.lag_days),
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
            metadata: row.metadata,
        })
    }
}

const EDGE_COLUMNS: &str = "id, tenant_id, from_id, to_id, dependency_type, lag_days, \
                            created_at, created_by, updated_at, metadata";

/// Take the per-tenant advisory lock for the current transaction.
///
/// Serialises concurrent mutations within one tenant so two inserts cannot
/// jointly close a cycle that neither probe saw. Released automatically at
/// commit or rollback.
pub async fn lock_tenant(tx: &mut Transaction<'_, Postgres>, tenant_id: Uuid) -> StorageResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(tenant_lock_key(tenant_id))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Stable 64-bit lock key derived from the tenant id.
pub fn tenant_lock_key(tenant_id: Uuid) -> i64 {
    let bytes = tenant_id.as_bytes();
    let mut key = [0u8; 8];
    key.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(key)
}

/// Fetch one edge by id within the tenant.
pub async fn fetch(
    pool: &PgPool,
    tenant_id: Uuid,
    edge_id: Uuid,
) -> StorageResult<Option<DependencyEdge>> {
    let row = sqlx::query_as::<_, EdgeRow>(&format!(
        "SELECT {EDGE_COLUMNS} FROM dependency_edges WHERE tenant_id = $1 AND id = $2"
    ))
    .bind(tenant_id)
    .bind(edge_id)
    .fetch_optional(pool)
    .await?;

    row.map(DependencyEdge::try_from).transpose()
}

/// Same read, inside the mutation transaction.
pub async fn fetch_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    edge_id: Uuid,
) -> StorageResult<Option<DependencyEdge>> {
    let row = sqlx::query_as::<_, EdgeRow>(&format!(
        "SELECT {EDGE_COLUMNS} FROM dependency_edges WHERE tenant_id = $1 AND id = $2"
    ))
    .bind(tenant_id)
    .bind(edge_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(DependencyEdge::try_from).transpose()
}

/// List the tenant's edges, newest first, with paging.
pub async fn list(
    pool: &PgPool,
    tenant_id: Uuid,
    limit: i64,
    offset: i64,
) -> StorageResult<Vec<DependencyEdge>> {
    let rows = sqlx::query_as::<_, EdgeRow>(&format!(
        "SELECT {EDGE_COLUMNS} FROM dependency_edges \
         WHERE tenant_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(tenant_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DependencyEdge::try_from).collect()
}

/// Fetch edges for graph assembly. Without a filter: every edge in the
/// tenant. With a filter: every edge touching the set on either endpoint
/// (the graph builder drops the ones whose other endpoint is absent).
pub async fn fetch_for_graph(
    pool: &PgPool,
    tenant_id: Uuid,
    filter: Option<&[Uuid]>,
) -> StorageResult<Vec<DependencyEdge>> {
    let rows = match filter {
        None => {
            sqlx::query_as::<_, EdgeRow>(&format!(
                "SELECT {EDGE_COLUMNS} FROM dependency_edges \
                 WHERE tenant_id = $1 \
                 ORDER BY created_at ASC, id ASC"
            ))
            .bind(tenant_id)
            .fetch_all(pool)
            .await?
        }
        Some(ids) => {
            sqlx::query_as::<_, EdgeRow>(&format!(
                "SELECT {EDGE_COLUMNS} FROM dependency_edges \
                 WHERE tenant_id = $1 \
                   AND (from_id = ANY($2) OR to_id = ANY($2)) \
                 ORDER BY created_at ASC, id ASC"
            ))
            .bind(tenant_id)
            .bind(ids)
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(DependencyEdge::try_from).collect()
}

/// True when an edge with the same endpoints already exists in the tenant.
pub async fn exists(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    from_id: Uuid,
    to_id: Uuid,
) -> StorageResult<bool> {
    let exists: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM dependency_edges
            WHERE tenant_id = $1
              AND from_id = $2
              AND to_id = $3
        )
        "#,
    )
    .bind(tenant_id)
    .bind(from_id)
    .bind(to_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists.0)
}

/// Insert a fully-formed edge.
pub async fn insert(tx: &mut Transaction<'_, Postgres>, edge: &DependencyEdge) -> StorageResult<()> {
    sqlx::query(
        r#"
        INSERT INTO dependency_edges (
            id, tenant_id, from_id, to_id, dependency_type, lag_days,
            created_at, created_by, updated_at, metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(edge.id)
    .bind(edge.tenant_id)
    .bind(edge.from_id)
    .bind(edge.to_id)
    .bind(edge.dependency_type.as_str())
    .bind(edge.lag_days as i32)
    .bind(edge.created_at)
    .bind(edge.created_by)
    .bind(edge.updated_at)
    .bind(&edge.metadata)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Write back the mutable fields of an edge.
pub async fn update(tx: &mut Transaction<'_, Postgres>, edge: &DependencyEdge) -> StorageResult<()> {
    sqlx::query(
        r#"
        UPDATE dependency_edges
        SET dependency_type = $1,
            lag_days = $2,
            metadata = $3,
            updated_at = $4
        WHERE tenant_id = $5
          AND id = $6
        "#,
    )
    .bind(edge.dependency_type.as_str())
    .bind(edge.lag_days as i32)
    .bind(&edge.metadata)
    .bind(edge.updated_at)
    .bind(edge.tenant_id)
    .bind(edge.id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Delete an edge by id within the tenant. Returns whether a row went away.
pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    edge_id: Uuid,
) -> StorageResult<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM dependency_edges
        WHERE tenant_id = $1
          AND id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(edge_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Reachability probe over stored edges, breadth-first from `start`.
///
/// Returns the node chain `start .. target` when `target` is reachable
/// within [`MAX_PROBE_DEPTH`] hops, or `None`. Called with
/// `start = to_id, target = from_id` of a prospective edge: an existing
/// path back to `from_id` means the new edge would close a cycle.
pub async fn find_path(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    start: Uuid,
    target: Uuid,
) -> StorageResult<Option<Vec<Uuid>>> {
    // A self-loop needs no search.
    if start == target {
        return Ok(Some(vec![start]));
    }

    let mut parents: HashMap<Uuid, Uuid> = HashMap::new();
    let mut frontier: Vec<Uuid> = vec![start];

    for _ in 0..MAX_PROBE_DEPTH {
        if frontier.is_empty() {
            break;
        }

        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT from_id, to_id
            FROM dependency_edges
            WHERE tenant_id = $1
              AND from_id = ANY($2)
            ORDER BY from_id ASC, to_id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(&frontier)
        .fetch_all(&mut **tx)
        .await?;

        let mut next: Vec<Uuid> = Vec::new();
        for (from_id, to_id) in rows {
            if to_id == start || parents.contains_key(&to_id) {
                continue;
            }
            parents.insert(to_id, from_id);
            if to_id == target {
                return Ok(Some(rebuild_path(&parents, start, target)));
            }
            next.push(to_id);
        }
        frontier = next;
    }

    Ok(None)
}

fn rebuild_path(parents: &HashMap<Uuid, Uuid>, start: Uuid, target: Uuid) -> Vec<Uuid> {
    let mut path = vec![target];
    let mut cursor = target;
    while cursor != start {
        cursor = parents[&cursor];
        path.push(cursor);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_lock_key_is_stable() {
        let tenant = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        assert_eq!(tenant_lock_key(tenant), tenant_lock_key(tenant));
        assert_ne!(tenant_lock_key(tenant), tenant_lock_key(Uuid::new_v4()));
    }

    #[test]
    fn test_rebuild_path_orders_start_to_target() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut parents = HashMap::new();
        parents.insert(b, a);
        parents.insert(c, b);

        assert_eq!(rebuild_path(&parents, a, c), vec![a, b, c]);
    }

    #[test]
    fn test_edge_row_decode_rejects_unknown_type() {
        let row = EdgeRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            from_id: Uuid::new_v4(),
            to_id: Uuid::new_v4(),
            dependency_type: "happens_before".to_string(),
            lag_days: 0,
            created_at: Utc::now(),
            created_by: Uuid::new_v4(),
            updated_at: Utc::now(),
            metadata: serde_json::json!({}),
        };
        assert!(DependencyEdge::try_from(row).is_err());
    }
}
