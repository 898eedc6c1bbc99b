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

use thiserror::Error;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors raised by the store adapter
#[derive(Debug, Error)]
pub enum StorageError {
    /// Query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row failed to decode into its domain type
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// True when the underlying failure is a unique-constraint violation.
    /// The edge lifecycle maps this onto the duplicate-dependency error in
    /// case a write races past the explicit existence probe.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StorageError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

impl From<StorageError> for critflow_core::CritflowError {
    fn from(err: StorageError) -> Self {
        critflow_core::CritflowError::Storage(err.to_string())
    }
}
