use std::future::Future;

use crate::catalog::{OverrideScope, PermissionPatch, PermissionSet, Role};
use crate::identity::{DelegateRecord, RootRecord, TenantRecord};
use crate::subject::{RoleId, ServiceId, SubjectId};

/// Read failure against an external store. The core never retries: transient
/// failures propagate to the caller, and retry policy belongs to the store
/// client, not here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Identity and hierarchy lookups. Every method is a potentially blocking
/// read against an external system; callers must treat them as suspend
/// points.
pub trait DirectoryReader: Send + Sync {
    fn find_root(
        &self,
        id: &SubjectId,
    ) -> impl Future<Output = Result<Option<RootRecord>, StoreError>> + Send;

    fn find_delegate(
        &self,
        id: &SubjectId,
    ) -> impl Future<Output = Result<Option<DelegateRecord>, StoreError>> + Send;

    fn find_tenant(
        &self,
        id: &SubjectId,
    ) -> impl Future<Output = Result<Option<TenantRecord>, StoreError>> + Send;

    fn find_children(
        &self,
        parent: &SubjectId,
    ) -> impl Future<Output = Result<Vec<SubjectId>, StoreError>> + Send;

    /// Full tenant listing. Backs the root operator's scope, which is
    /// definitional ("every non-admin tenant") rather than a traversal.
    fn list_tenants(&self) -> impl Future<Output = Result<Vec<TenantRecord>, StoreError>> + Send;
}

/// Role catalog and override lookups.
pub trait CatalogReader: Send + Sync {
    fn find_role(
        &self,
        role: &RoleId,
    ) -> impl Future<Output = Result<Option<Role>, StoreError>> + Send;

    fn role_defaults(
        &self,
        role: &RoleId,
        service: &ServiceId,
    ) -> impl Future<Output = Result<Option<PermissionSet>, StoreError>> + Send;

    fn find_override(
        &self,
        scope: &OverrideScope,
        service: &ServiceId,
    ) -> impl Future<Output = Result<Option<PermissionPatch>, StoreError>> + Send;
}
