//! Identity resolution and access-control core for a multi-level
//! agent/distributor back office.
//!
//! Given an authenticated subject id, the core resolves who the caller is
//! (root operator, tenant, or delegate), computes the fully merged
//! permission set it holds per service, and derives the slice of the
//! hierarchy it may see or manage. Business features (bank records, KYC,
//! commissions, user management) consult [`service::AccessCore`] before
//! acting; persistence and transport live behind the traits in [`store`].

pub mod audit;
pub mod catalog;
pub mod config;
pub mod delegation;
pub mod engine;
pub mod error;
pub mod identity;
pub mod logging;
pub mod service;
pub mod store;
pub mod subject;

#[cfg(test)]
pub(crate) mod testutil;

pub use audit::{AuditEvent, AuditOutcome, AuditSink, NoopAuditSink, TracingAuditSink};
pub use catalog::{Capability, OverrideScope, PermissionPatch, PermissionSet, Role};
pub use config::{AccessPolicy, CoreConfig};
pub use delegation::{actor_context, effective_authority, ActorContext};
pub use engine::{Decision, DecisionReason, ScopeMode};
pub use error::{AccessError, AuthenticationError, AuthorizationDenied};
pub use identity::{
    DelegateRecord, Identity, IdentityKind, RootRecord, SponsorKind, SponsorRef, Status,
    TenantRecord,
};
pub use service::AccessCore;
pub use store::{CatalogReader, DirectoryReader, StoreError};
pub use subject::{RoleId, ServiceId, SubjectId};
