use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use downline_core::catalog::{OverrideScope, PermissionPatch, PermissionSet, Role};
use downline_core::identity::{DelegateRecord, RootRecord, Status, TenantRecord};
use downline_core::store::{CatalogReader, DirectoryReader, StoreError};
use downline_core::subject::{RoleId, ServiceId, SubjectId};

#[derive(Debug, Default)]
struct InnerState {
    roots: HashMap<SubjectId, RootRecord>,
    tenants: HashMap<SubjectId, TenantRecord>,
    delegates: HashMap<SubjectId, DelegateRecord>,
    children: HashMap<SubjectId, Vec<SubjectId>>,
    roles: HashMap<RoleId, Role>,
    defaults: HashMap<(RoleId, ServiceId), PermissionSet>,
    overrides: HashMap<(OverrideScope, ServiceId), PermissionPatch>,
}

/// In-memory directory, hierarchy and role catalog in one store. Serves
/// tests and single-process embeddings; clones share state.
///
/// Writes reject a tenant parenting itself; deeper hierarchy corruption
/// (multi-node cycles, duplicate parents from raw edge writes) is the scope
/// engine's runtime defense.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<InnerState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_root(&self, record: RootRecord) {
        let mut state = self.state.lock().unwrap();
        state.roots.insert(record.id, record);
    }

    pub fn insert_tenant(&self, record: TenantRecord) -> Result<(), StoreError> {
        if record.parent == Some(record.id) {
            return Err(StoreError::Internal(
                "tenant cannot be its own parent".to_string(),
            ));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = record.parent {
            state.children.entry(parent).or_default().push(record.id);
        }
        state.tenants.insert(record.id, record);
        Ok(())
    }

    pub fn insert_delegate(&self, record: DelegateRecord) {
        let mut state = self.state.lock().unwrap();
        state.delegates.insert(record.id, record);
    }

    pub fn insert_role(&self, role: Role) {
        let mut state = self.state.lock().unwrap();
        state.roles.insert(role.id.clone(), role);
    }

    pub fn set_role_defaults(&self, role: RoleId, service: ServiceId, set: PermissionSet) {
        let mut state = self.state.lock().unwrap();
        state.defaults.insert((role, service), set);
    }

    pub fn set_override(&self, scope: OverrideScope, service: ServiceId, patch: PermissionPatch) {
        let mut state = self.state.lock().unwrap();
        state.overrides.insert((scope, service), patch);
    }

    pub fn clear_override(&self, scope: &OverrideScope, service: &ServiceId) {
        let mut state = self.state.lock().unwrap();
        state.overrides.remove(&(scope.clone(), service.clone()));
    }

    /// Flips the status of whichever record holds this id. Returns false if
    /// the id is unknown to every store.
    pub fn set_status(&self, id: &SubjectId, status: Status) -> bool {
        let mut state = self.state.lock().unwrap();
        let mut touched = false;
        if let Some(r) = state.roots.get_mut(id) {
            r.status = status;
            touched = true;
        }
        if let Some(t) = state.tenants.get_mut(id) {
            t.status = status;
            touched = true;
        }
        if let Some(d) = state.delegates.get_mut(id) {
            d.status = status;
            touched = true;
        }
        touched
    }

    /// Raw child edge write, bypassing the tenant record's parent field.
    /// Rejects only the trivial self-edge; anything else is the caller's
    /// responsibility.
    pub fn link_child(&self, parent: SubjectId, child: SubjectId) -> Result<(), StoreError> {
        if parent == child {
            return Err(StoreError::Internal(
                "child cannot be its own parent".to_string(),
            ));
        }
        let mut state = self.state.lock().unwrap();
        state.children.entry(parent).or_default().push(child);
        Ok(())
    }
}

impl DirectoryReader for InMemoryDirectory {
    async fn find_root(&self, id: &SubjectId) -> Result<Option<RootRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.roots.get(id).cloned())
    }

    async fn find_delegate(&self, id: &SubjectId) -> Result<Option<DelegateRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.delegates.get(id).cloned())
    }

    async fn find_tenant(&self, id: &SubjectId) -> Result<Option<TenantRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.tenants.get(id).cloned())
    }

    async fn find_children(&self, parent: &SubjectId) -> Result<Vec<SubjectId>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.children.get(parent).cloned().unwrap_or_default())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantRecord>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.tenants.values().cloned().collect())
    }
}

impl CatalogReader for InMemoryDirectory {
    async fn find_role(&self, role: &RoleId) -> Result<Option<Role>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.roles.get(role).cloned())
    }

    async fn role_defaults(
        &self,
        role: &RoleId,
        service: &ServiceId,
    ) -> Result<Option<PermissionSet>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.defaults.get(&(role.clone(), service.clone())).copied())
    }

    async fn find_override(
        &self,
        scope: &OverrideScope,
        service: &ServiceId,
    ) -> Result<Option<PermissionPatch>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .overrides
            .get(&(scope.clone(), service.clone()))
            .copied())
    }
}
