// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access-control service for Filez.
//!
//! [`AccessControl`] wires the pure evaluator in `filez-server-auth` to the
//! stores in `filez-server-db`:
//! - Store-backed `authorize`, `explain` and `authorize_many`
//! - Access policy CRUD guarded by control of the target
//! - User groups with access-controlled membership changes
//! - Audit entries for decisions and mutations
//!
//! # Example
//!
//! ```ignore
//! let access = AccessControl::from_store(MemoryStore::new(), AccessSettings::default());
//! let caller = access.caller(bob.id, Some(app_id))?;
//! access.authorize(&caller, Action::FileGroupsListFiles, &file_group).await?;
//! ```

pub mod caller;
pub mod error;
pub mod groups;
pub mod policies;
pub mod service;
pub mod settings;
pub mod sink;

pub use caller::Caller;
pub use error::AccessError;
pub use service::AccessControl;
pub use settings::AccessSettings;
pub use sink::{AuditSink, AuditSinkError, MemoryAuditSink, TracingAuditSink};
