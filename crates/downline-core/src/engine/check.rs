use std::sync::Arc;

use crate::catalog::{Capability, OverrideScope, PermissionPatch, PermissionSet};
use crate::identity::{Identity, SponsorKind, SponsorRef};
use crate::store::{CatalogReader, DirectoryReader, StoreError};
use crate::subject::{RoleId, ServiceId, SubjectId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// A delegate's sponsor is missing from the directory. Corrupted state;
    /// the request must fail closed.
    #[error("sponsor {0} is not present in the directory")]
    SponsorUnresolved(SubjectId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a capability evaluated the way it did. Attached to every decision so
/// the audit trail explains itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    RootBypass,
    RoleDefault,
    OverrideGrant,
    OverrideRevoke,
    SponsorCeiling,
    AmountCeiling,
    DefaultDeny,
}

impl DecisionReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RootBypass => "root_bypass",
            Self::RoleDefault => "role_default",
            Self::OverrideGrant => "override_grant",
            Self::OverrideRevoke => "override_revoke",
            Self::SponsorCeiling => "sponsor_ceiling",
            Self::AmountCeiling => "amount_ceiling",
            Self::DefaultDeny => "default_deny",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn new(allowed: bool, reason: DecisionReason) -> Self {
        Self { allowed, reason }
    }
}

/// Fully merged permission state for one (identity, service) pair, computed
/// once per request and discarded with it. Keeps enough provenance to derive
/// a per-capability decision reason without re-reading any store.
#[derive(Debug, Clone)]
pub struct Effective {
    root: bool,
    permissions: PermissionSet,
    own: PermissionSet,
    had_defaults: bool,
    patched: PermissionPatch,
    sponsor: Option<PermissionSet>,
}

impl Effective {
    fn for_root() -> Self {
        Self {
            root: true,
            permissions: PermissionSet::full(),
            own: PermissionSet::full(),
            had_defaults: true,
            patched: PermissionPatch::default(),
            sponsor: None,
        }
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn decide(&self, capability: Capability) -> Decision {
        if self.root {
            return Decision::new(true, DecisionReason::RootBypass);
        }

        let allowed = self.permissions.allows(capability);
        let reason = if allowed {
            if self.patched.patches(capability) {
                DecisionReason::OverrideGrant
            } else {
                DecisionReason::RoleDefault
            }
        } else if self.own.allows(capability)
            && self.sponsor.as_ref().is_some_and(|s| !s.allows(capability))
        {
            DecisionReason::SponsorCeiling
        } else if self.patched.patches(capability) {
            DecisionReason::OverrideRevoke
        } else if !self.had_defaults {
            DecisionReason::DefaultDeny
        } else {
            DecisionReason::RoleDefault
        };

        Decision::new(allowed, reason)
    }

    /// Every requested capability must hold independently; there is no
    /// implicit OR. An empty request is vacuously allowed.
    pub fn decide_all(&self, capabilities: &[Capability]) -> Decision {
        let mut last = Decision::new(
            true,
            if self.root {
                DecisionReason::RootBypass
            } else {
                DecisionReason::RoleDefault
            },
        );
        for capability in capabilities {
            let decision = self.decide(*capability);
            if !decision.allowed {
                return decision;
            }
            last = decision;
        }
        last
    }
}

/// Computes the effective permission set for an identity on one service:
/// role defaults, then override patches, then (for delegates) the sponsor
/// intersection that makes escalation beyond the sponsor impossible.
pub struct PermissionEngine<D, C> {
    directory: Arc<D>,
    catalog: Arc<C>,
}

impl<D: DirectoryReader, C: CatalogReader> PermissionEngine<D, C> {
    pub fn new(directory: Arc<D>, catalog: Arc<C>) -> Self {
        Self { directory, catalog }
    }

    pub async fn effective(
        &self,
        identity: &Identity,
        service: &ServiceId,
    ) -> Result<Effective, CheckError> {
        match identity {
            // Root holds the full universe; no role or override storage is
            // consulted at all.
            Identity::Root { .. } => Ok(Effective::for_root()),
            Identity::Tenant { id, role } => {
                let (own, had_defaults, patched) = self.merged(id, role, service).await?;
                Ok(Effective {
                    root: false,
                    permissions: own,
                    own,
                    had_defaults,
                    patched,
                    sponsor: None,
                })
            }
            Identity::Delegate {
                id,
                department,
                sponsor,
            } => {
                let (own, had_defaults, patched) = self.merged(id, department, service).await?;
                let ceiling = self.sponsor_effective(sponsor, service).await?;
                Ok(Effective {
                    root: false,
                    permissions: own.intersect(&ceiling),
                    own,
                    had_defaults,
                    patched,
                    sponsor: Some(ceiling),
                })
            }
        }
    }

    pub async fn decide(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capability: Capability,
    ) -> Result<Decision, CheckError> {
        Ok(self.effective(identity, service).await?.decide(capability))
    }

    pub async fn decide_all(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capabilities: &[Capability],
    ) -> Result<Decision, CheckError> {
        Ok(self
            .effective(identity, service)
            .await?
            .decide_all(capabilities))
    }

    /// Role defaults (all-deny if the service has no row), overlaid with the
    /// role-scoped patch, overlaid with the subject-scoped patch. Field-wise:
    /// the subject patch beats the role patch beats the defaults.
    async fn merged(
        &self,
        subject: &SubjectId,
        role: &RoleId,
        service: &ServiceId,
    ) -> Result<(PermissionSet, bool, PermissionPatch), CheckError> {
        let defaults = self.catalog.role_defaults(role, service).await?;
        let had_defaults = defaults.is_some();
        let mut set = defaults.unwrap_or_default();

        let role_patch = self
            .catalog
            .find_override(&OverrideScope::Role(role.clone()), service)
            .await?
            .unwrap_or_default();
        let subject_patch = self
            .catalog
            .find_override(&OverrideScope::Subject(*subject), service)
            .await?
            .unwrap_or_default();

        let patched = subject_patch.overlay(&role_patch);
        patched.apply(&mut set);

        Ok((set, had_defaults, patched))
    }

    /// The sponsor's own effective permission for the same service. A root
    /// sponsor imposes no ceiling. A sponsor missing from the directory is
    /// corrupted state; a suspended sponsor contributes nothing (fail
    /// closed).
    async fn sponsor_effective(
        &self,
        sponsor: &SponsorRef,
        service: &ServiceId,
    ) -> Result<PermissionSet, CheckError> {
        match sponsor.kind {
            SponsorKind::Root => Ok(PermissionSet::full()),
            SponsorKind::Tenant => {
                let record = self
                    .directory
                    .find_tenant(&sponsor.id)
                    .await?
                    .ok_or(CheckError::SponsorUnresolved(sponsor.id))?;
                if !record.status.is_active() {
                    return Ok(PermissionSet::none());
                }
                let (set, _, _) = self.merged(&record.id, &record.role, service).await?;
                Ok(set)
            }
        }
    }
}
