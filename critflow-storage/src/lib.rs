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

//! Critflow Storage
//!
//! Postgres adapter: parameterised queries and transactions over the
//! `work_items` and `dependency_edges` tables. Every query carries the
//! tenant as an equality predicate; nothing in this crate can read across
//! tenants.

pub mod edges;
pub mod error;
pub mod work_items;

use once_cell::sync::Lazy;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub use error::{StorageError, StorageResult};

/// Pool sizing for a single service instance.
pub const MAX_CONNECTIONS: u32 = 20;
pub const IDLE_TIMEOUT_SECS: u64 = 30;
pub const ACQUIRE_TIMEOUT_SECS: u64 = 2;

pub static MIGRATOR: Lazy<Migrator> = Lazy::new(|| sqlx::migrate!("./migrations"));

/// Connect a bounded pool and run pending migrations.
pub async fn connect(database_url: &str) -> StorageResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .idle_timeout(Duration::from_secs(IDLE_TIMEOUT_SECS))
        .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
        .connect(database_url)
        .await?;

    MIGRATOR.run(&pool).await.map_err(sqlx::Error::from)?;

    tracing::info!(
        max_connections = MAX_CONNECTIONS,
        "connected to Postgres and ran migrations"
    );
    Ok(pool)
}
