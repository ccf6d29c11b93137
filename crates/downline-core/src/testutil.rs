//! Shared in-memory fixture for engine and facade tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::catalog::{OverrideScope, PermissionPatch, PermissionSet, Role};
use crate::identity::{DelegateRecord, RootRecord, SponsorKind, SponsorRef, Status, TenantRecord};
use crate::store::{CatalogReader, DirectoryReader, StoreError};
use crate::subject::{RoleId, ServiceId, SubjectId};

pub(crate) fn sid(n: u128) -> SubjectId {
    SubjectId::new(Uuid::from_u128(n))
}

#[derive(Default)]
pub(crate) struct Fixture {
    roots: HashMap<SubjectId, RootRecord>,
    tenants: HashMap<SubjectId, TenantRecord>,
    delegates: HashMap<SubjectId, DelegateRecord>,
    children: HashMap<SubjectId, Vec<SubjectId>>,
    roles: HashMap<RoleId, Role>,
    defaults: HashMap<(RoleId, ServiceId), PermissionSet>,
    overrides: HashMap<(OverrideScope, ServiceId), PermissionPatch>,
    pub catalog_reads: AtomicUsize,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, id: SubjectId) -> Self {
        self.roots.insert(
            id,
            RootRecord {
                id,
                status: Status::Active,
            },
        );
        self
    }

    pub fn with_tenant(self, id: SubjectId, role: &str, parent: Option<SubjectId>) -> Self {
        self.with_tenant_status(id, role, parent, Status::Active)
    }

    pub fn with_tenant_status(
        mut self,
        id: SubjectId,
        role: &str,
        parent: Option<SubjectId>,
        status: Status,
    ) -> Self {
        self.tenants.insert(
            id,
            TenantRecord {
                id,
                role: RoleId::from(role),
                parent,
                status,
            },
        );
        if let Some(parent) = parent {
            self.children.entry(parent).or_default().push(id);
        }
        self
    }

    pub fn with_delegate(
        mut self,
        id: SubjectId,
        department: &str,
        sponsor: SubjectId,
        kind: SponsorKind,
    ) -> Self {
        self.delegates.insert(
            id,
            DelegateRecord {
                id,
                department: RoleId::from(department),
                sponsor: SponsorRef { id: sponsor, kind },
                status: Status::Active,
            },
        );
        self
    }

    pub fn suspend(mut self, id: SubjectId) -> Self {
        if let Some(t) = self.tenants.get_mut(&id) {
            t.status = Status::Suspended;
        }
        if let Some(d) = self.delegates.get_mut(&id) {
            d.status = Status::Suspended;
        }
        if let Some(r) = self.roots.get_mut(&id) {
            r.status = Status::Suspended;
        }
        self
    }

    /// Raw child edge, bypassing the parent field. Used to model a corrupted
    /// hierarchy store (cycles, double parents, dangling children).
    pub fn with_edge(mut self, parent: SubjectId, child: SubjectId) -> Self {
        self.children.entry(parent).or_default().push(child);
        self
    }

    pub fn with_role(mut self, id: &str, level: u8) -> Self {
        self.roles.insert(
            RoleId::from(id),
            Role {
                id: RoleId::from(id),
                name: id.to_string(),
                level,
            },
        );
        self
    }

    pub fn with_defaults(mut self, role: &str, service: &str, set: PermissionSet) -> Self {
        self.defaults
            .insert((RoleId::from(role), ServiceId::from(service)), set);
        self
    }

    pub fn with_override(
        mut self,
        scope: OverrideScope,
        service: &str,
        patch: PermissionPatch,
    ) -> Self {
        self.overrides.insert((scope, ServiceId::from(service)), patch);
        self
    }
}

impl DirectoryReader for Fixture {
    async fn find_root(&self, id: &SubjectId) -> Result<Option<RootRecord>, StoreError> {
        Ok(self.roots.get(id).cloned())
    }

    async fn find_delegate(&self, id: &SubjectId) -> Result<Option<DelegateRecord>, StoreError> {
        Ok(self.delegates.get(id).cloned())
    }

    async fn find_tenant(&self, id: &SubjectId) -> Result<Option<TenantRecord>, StoreError> {
        Ok(self.tenants.get(id).cloned())
    }

    async fn find_children(&self, parent: &SubjectId) -> Result<Vec<SubjectId>, StoreError> {
        Ok(self.children.get(parent).cloned().unwrap_or_default())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantRecord>, StoreError> {
        Ok(self.tenants.values().cloned().collect())
    }
}

impl CatalogReader for Fixture {
    async fn find_role(&self, role: &RoleId) -> Result<Option<Role>, StoreError> {
        self.catalog_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.roles.get(role).cloned())
    }

    async fn role_defaults(
        &self,
        role: &RoleId,
        service: &ServiceId,
    ) -> Result<Option<PermissionSet>, StoreError> {
        self.catalog_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.defaults.get(&(role.clone(), service.clone())).copied())
    }

    async fn find_override(
        &self,
        scope: &OverrideScope,
        service: &ServiceId,
    ) -> Result<Option<PermissionPatch>, StoreError> {
        self.catalog_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .overrides
            .get(&(scope.clone(), service.clone()))
            .copied())
    }
}
