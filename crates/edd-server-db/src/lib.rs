// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite storage for the EDD authorization engine.
//!
//! [`SqliteRecordStore`] renders each query plan into a single statement.
//! [`UserRepository`] and [`GrantRepository`] load the principals and grants
//! the engine decides over.

pub mod error;
pub mod pool;
pub mod schema;
pub mod sql;
pub mod store;
pub mod testing;
pub mod user;

pub use error::{DbError, Result};
pub use pool::{create_pool, create_pool_with, PoolOptions};
pub use store::SqliteRecordStore;
pub use user::{GrantRepository, UserRepository};
