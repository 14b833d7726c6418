// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization engine for EDD studies and the records they own.
//!
//! Decides, for a caller and a request against studies, lines, assays,
//! measurements or strains, which records the caller may see or change. The
//! decision is compiled into a storage-agnostic [`Predicate`] so a backing
//! store can evaluate it set-at-a-time.
//!
//! This crate provides:
//! - Identifier resolution (integer key, UUID, slug)
//! - Scoped grants and effective-level computation
//! - Type-wide capability evaluation
//! - Attribute and metadata filters
//! - Query assembly and the response policy for empty results
//!
//! # Example
//!
//! ```
//! use edd_server_authz::{Engine, Operation, Plan, Request, ResourceType, User, UserId};
//!
//! let user = User::new(UserId::new(7), "grace");
//! let request = Request::new(user.into(), ResourceType::Line, Operation::Read)
//!     .within_study("my-study");
//!
//! let plan = Engine::default().plan(&request).unwrap();
//! assert!(matches!(plan, Plan::Query(_)));
//! ```

pub mod capability;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grant;
pub mod identifier;
pub mod metadata;
pub mod policy;
pub mod predicate;
pub mod query;
pub mod scoped;
pub mod store;
pub mod types;
pub mod user;

pub use capability::{evaluate, Access, EngineOptions, Reach, StudyCreationPolicy};
pub use engine::Engine;
pub use error::{AuthzError, InputError, Result};
pub use filter::{ActiveStatus, FilterSet, SortOrder};
pub use grant::{effective_level, ScopedGrant};
pub use identifier::Identifier;
pub use metadata::{MetaFilter, MetaFilters, MetaOp, MetaPredicate, MetaValue};
pub use policy::{Outcome, Page};
pub use predicate::{Column, Literal, Predicate, ScopedAccess, TextMatch, TimeBound};
pub use query::{Plan, QueryPlan, Request, SearchType, Target};
pub use store::{Record, RecordStore};
pub use types::{
	Capability, GrantLevel, GroupId, Hop, Operation, ResourceType, StudyKey, TypePolicy, UserId,
};
pub use user::{Principal, User};
