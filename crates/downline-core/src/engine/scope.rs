use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::identity::{Identity, SponsorKind};
use crate::store::{DirectoryReader, StoreError};
use crate::subject::{RoleId, SubjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    SelfAndDescendants,
    DescendantsOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    /// The hierarchy store reported a node twice during one traversal. The
    /// tree is corrupted; the partial result is discarded, never returned.
    #[error("hierarchy cycle detected at node {0}")]
    CycleDetected(SubjectId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Computes the set of hierarchy ids an identity may see or manage.
///
/// Tenant scopes are a breadth-first walk over child edges; the root
/// operator's scope is definitional and a delegate borrows its sponsor's
/// scope unchanged. Every store read is a suspend point, so dropping the
/// returned future aborts the walk at the next node boundary; a result set
/// only ever exists for a traversal that ran to completion.
pub struct ScopeEngine<D> {
    directory: Arc<D>,
    admin_role: RoleId,
}

impl<D: DirectoryReader> ScopeEngine<D> {
    pub fn new(directory: Arc<D>, admin_role: RoleId) -> Self {
        Self {
            directory,
            admin_role,
        }
    }

    pub async fn accessible_scope(
        &self,
        identity: &Identity,
        mode: ScopeMode,
    ) -> Result<HashSet<SubjectId>, ScopeError> {
        match identity {
            Identity::Root { id } => self.root_scope(id).await,
            Identity::Tenant { id, .. } => self.descendants(id, mode).await,
            Identity::Delegate { sponsor, .. } => match sponsor.kind {
                SponsorKind::Root => self.root_scope(&sponsor.id).await,
                SponsorKind::Tenant => self.descendants(&sponsor.id, mode).await,
            },
        }
    }

    /// Root's scope is not a traversal: every active tenant whose role is
    /// not the top-level admin role, and never the root id itself. Both
    /// scope modes coincide here because root has no tenant record of its
    /// own.
    async fn root_scope(&self, root_id: &SubjectId) -> Result<HashSet<SubjectId>, ScopeError> {
        let tenants = self.directory.list_tenants().await?;
        Ok(tenants
            .into_iter()
            .filter(|t| t.id != *root_id && t.role != self.admin_role && t.status.is_active())
            .map(|t| t.id)
            .collect())
    }

    /// Iterative breadth-first walk with an explicit queue and visited set.
    /// A revisited id aborts the walk as a structural error rather than
    /// looping. Suspended tenants stay reachable (their subtrees are still
    /// walked) but are excluded from the returned set; a child edge pointing
    /// at a missing tenant record is logged and walked past.
    async fn descendants(
        &self,
        start: &SubjectId,
        mode: ScopeMode,
    ) -> Result<HashSet<SubjectId>, ScopeError> {
        let mut visited: HashSet<SubjectId> = HashSet::from([*start]);
        let mut queue: VecDeque<SubjectId> = VecDeque::from([*start]);
        let mut scope: HashSet<SubjectId> = HashSet::new();

        if mode == ScopeMode::SelfAndDescendants {
            scope.insert(*start);
        }

        while let Some(node) = queue.pop_front() {
            for child in self.directory.find_children(&node).await? {
                if !visited.insert(child) {
                    tracing::error!(
                        start = %start,
                        node = %child,
                        "hierarchy traversal revisited a node, aborting"
                    );
                    return Err(ScopeError::CycleDetected(child));
                }

                match self.directory.find_tenant(&child).await? {
                    Some(record) if record.status.is_active() => {
                        scope.insert(child);
                    }
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            parent = %node,
                            child = %child,
                            "child edge points at a missing tenant record"
                        );
                    }
                }

                queue.push_back(child);
            }
        }

        Ok(scope)
    }
}
