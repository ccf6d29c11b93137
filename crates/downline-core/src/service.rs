use std::collections::HashSet;
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::Capability;
use crate::config::AccessPolicy;
use crate::delegation::{actor_context, effective_authority, ActorContext};
use crate::engine::{
    CheckError, Decision, IdentityResolver, PermissionEngine, ResolveError, ScopeEngine,
    ScopeError, ScopeMode,
};
use crate::error::{AccessError, AuthenticationError, AuthorizationDenied};
use crate::identity::{Identity, IdentityKind, SponsorKind};
use crate::store::{CatalogReader, DirectoryReader};
use crate::subject::{ServiceId, SubjectId};

/// The access-control facade every business feature consults before acting.
///
/// Holds no mutable state: identities, permission sets and scope sets are
/// computed per call against freshly-read store data and discarded with the
/// request. An [`Identity`] can only be obtained through
/// [`resolve_identity`](Self::resolve_identity), so resolution always
/// precedes permission and scope computation.
///
/// Structural-integrity failures (duplicate ids across stores, hierarchy
/// cycles, unresolvable sponsors) are logged loudly and audited, then
/// surface as opaque fail-closed denials: they never cross this boundary as
/// distinct error types.
pub struct AccessCore<D, C, A> {
    directory: Arc<D>,
    catalog: Arc<C>,
    resolver: IdentityResolver<D>,
    permissions: PermissionEngine<D, C>,
    scopes: ScopeEngine<D>,
    audit: A,
}

impl<D: DirectoryReader, C: CatalogReader, A: AuditSink> AccessCore<D, C, A> {
    pub fn new(directory: Arc<D>, catalog: Arc<C>, audit: A, policy: AccessPolicy) -> Self {
        Self {
            resolver: IdentityResolver::new(Arc::clone(&directory)),
            permissions: PermissionEngine::new(Arc::clone(&directory), Arc::clone(&catalog)),
            scopes: ScopeEngine::new(Arc::clone(&directory), policy.admin_role),
            directory,
            catalog,
            audit,
        }
    }

    pub async fn resolve_identity(
        &self,
        subject: &SubjectId,
        hint: Option<IdentityKind>,
    ) -> Result<Identity, AccessError> {
        match self.resolver.resolve(subject, hint).await {
            Ok(identity) => Ok(identity),
            Err(ResolveError::UnknownSubject(id)) => {
                self.audit.emit(AuditEvent::new(
                    id,
                    "resolve_identity",
                    "subject",
                    id.to_string(),
                    AuditOutcome::Denied,
                    "unknown_subject",
                ));
                Err(AuthenticationError::UnknownSubject(id).into())
            }
            Err(ResolveError::Suspended(id)) => {
                self.audit.emit(AuditEvent::new(
                    id,
                    "resolve_identity",
                    "subject",
                    id.to_string(),
                    AuditOutcome::Denied,
                    "suspended",
                ));
                Err(AuthenticationError::Suspended(id).into())
            }
            Err(ResolveError::DuplicateSubject { id, kinds }) => {
                tracing::error!(
                    subject = %id,
                    kinds = ?kinds,
                    "subject resolves in multiple identity stores, failing closed"
                );
                self.audit.emit(AuditEvent::new(
                    id,
                    "resolve_identity",
                    "subject",
                    id.to_string(),
                    AuditOutcome::Failure,
                    "duplicate_subject",
                ));
                Err(AuthenticationError::Failed.into())
            }
            Err(ResolveError::Store(e)) => Err(AccessError::Store(e)),
        }
    }

    /// Allow/deny for one capability on one service, with the reason the
    /// audit trail records. Denial here is a result, not an error; use
    /// [`require`](Self::require) for the typed-failure form.
    pub async fn authorize(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capability: Capability,
    ) -> Result<Decision, AccessError> {
        let decision = self
            .permissions
            .decide(identity, service, capability)
            .await
            .map_err(|e| self.check_failed(identity, service, e))?;
        self.audit_decision(identity, service, &[capability], decision);
        Ok(decision)
    }

    /// Every requested capability must hold independently.
    pub async fn authorize_all(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capabilities: &[Capability],
    ) -> Result<Decision, AccessError> {
        let decision = self
            .permissions
            .decide_all(identity, service, capabilities)
            .await
            .map_err(|e| self.check_failed(identity, service, e))?;
        self.audit_decision(identity, service, capabilities, decision);
        Ok(decision)
    }

    /// Capability check plus the amount ceiling of the effective permission
    /// set.
    pub async fn authorize_amount(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capability: Capability,
        amount: u64,
    ) -> Result<Decision, AccessError> {
        let effective = self
            .permissions
            .effective(identity, service)
            .await
            .map_err(|e| self.check_failed(identity, service, e))?;

        let mut decision = effective.decide(capability);
        if decision.allowed && !effective.permissions().allows_amount(amount) {
            decision = Decision {
                allowed: false,
                reason: crate::engine::DecisionReason::AmountCeiling,
            };
        }

        let event = self
            .decision_event(identity, service, &[capability], decision)
            .with_metadata("amount", amount.to_string());
        self.audit.emit(event);
        Ok(decision)
    }

    /// [`authorize`](Self::authorize), but a denial propagates as a typed
    /// [`AuthorizationDenied`] failure.
    pub async fn require(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capability: Capability,
    ) -> Result<(), AccessError> {
        let decision = self.authorize(identity, service, capability).await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(AuthorizationDenied::Capability {
                service: service.clone(),
                capability,
                reason: decision.reason.label().to_string(),
            }
            .into())
        }
    }

    /// The set of hierarchy ids this identity may see or manage.
    pub async fn accessible_scope(
        &self,
        identity: &Identity,
        mode: ScopeMode,
    ) -> Result<HashSet<SubjectId>, AccessError> {
        match self.scopes.accessible_scope(identity, mode).await {
            Ok(scope) => Ok(scope),
            Err(ScopeError::CycleDetected(node)) => {
                self.audit.emit(
                    AuditEvent::new(
                        identity.id(),
                        "resolve_scope",
                        "tenant",
                        node.to_string(),
                        AuditOutcome::Failure,
                        "hierarchy_cycle",
                    )
                    .with_metadata("kind", identity.kind().label()),
                );
                Err(AuthorizationDenied::Failed.into())
            }
            Err(ScopeError::Store(e)) => Err(AccessError::Store(e)),
        }
    }

    /// Fails with [`AuthorizationDenied::OutOfScope`] unless `target` lies
    /// within the identity's self-and-descendants scope.
    pub async fn ensure_in_scope(
        &self,
        identity: &Identity,
        target: &SubjectId,
    ) -> Result<(), AccessError> {
        let scope = self
            .accessible_scope(identity, ScopeMode::SelfAndDescendants)
            .await?;
        if scope.contains(target) {
            return Ok(());
        }

        self.audit.emit(AuditEvent::new(
            identity.id(),
            "scope_check",
            "tenant",
            target.to_string(),
            AuditOutcome::Denied,
            "out_of_scope",
        ));
        Err(AuthorizationDenied::OutOfScope { target: *target }.into())
    }

    /// Whether the identity may manage the target tenant: target inside the
    /// descendants-only scope and the caller's role outranks the target's.
    /// Root manages everyone; a delegate answers with its sponsor's rank.
    pub async fn can_manage(
        &self,
        identity: &Identity,
        target: &SubjectId,
    ) -> Result<bool, AccessError> {
        let manager_role = match identity {
            Identity::Root { .. } => {
                self.audit_manage(identity, target, true, "root_bypass");
                return Ok(true);
            }
            Identity::Tenant { role, .. } => role.clone(),
            Identity::Delegate { sponsor, .. } => match sponsor.kind {
                SponsorKind::Root => {
                    self.audit_manage(identity, target, true, "root_bypass");
                    return Ok(true);
                }
                SponsorKind::Tenant => match self.directory.find_tenant(&sponsor.id).await? {
                    Some(record) => record.role,
                    None => {
                        tracing::warn!(
                            sponsor = %sponsor.id,
                            "delegate sponsor missing from directory, failing closed"
                        );
                        self.audit_manage(identity, target, false, "sponsor_unresolved");
                        return Ok(false);
                    }
                },
            },
        };

        let scope = self
            .accessible_scope(identity, ScopeMode::DescendantsOnly)
            .await?;
        if !scope.contains(target) {
            self.audit_manage(identity, target, false, "out_of_scope");
            return Ok(false);
        }

        let target_role = match self.directory.find_tenant(target).await? {
            Some(record) => record.role,
            None => {
                self.audit_manage(identity, target, false, "unknown_target");
                return Ok(false);
            }
        };

        let (Some(manager), Some(managed)) = (
            self.catalog.find_role(&manager_role).await?,
            self.catalog.find_role(&target_role).await?,
        ) else {
            tracing::warn!(
                manager_role = %manager_role,
                target_role = %target_role,
                "role missing from catalog, failing closed"
            );
            self.audit_manage(identity, target, false, "unknown_role");
            return Ok(false);
        };

        let allowed = manager.outranks(&managed);
        self.audit_manage(identity, target, allowed, "rank_comparison");
        Ok(allowed)
    }

    /// Runs `action` with the delegation-aware actor attribution: the caller
    /// stays actor of record while created records belong to the effective
    /// authority.
    pub fn with_delegation<R>(
        &self,
        identity: &Identity,
        action: impl FnOnce(&ActorContext) -> R,
    ) -> R {
        let ctx = actor_context(identity);
        action(&ctx)
    }

    pub fn effective_authority(&self, identity: &Identity) -> SubjectId {
        effective_authority(identity)
    }

    fn check_failed(
        &self,
        identity: &Identity,
        service: &ServiceId,
        err: CheckError,
    ) -> AccessError {
        match err {
            CheckError::SponsorUnresolved(sponsor) => {
                tracing::error!(
                    actor = %identity.id(),
                    sponsor = %sponsor,
                    "delegate sponsor missing from directory, failing closed"
                );
                self.audit.emit(AuditEvent::new(
                    identity.id(),
                    "authorize",
                    "service",
                    service.as_str(),
                    AuditOutcome::Failure,
                    "sponsor_unresolved",
                ));
                AccessError::Denied(AuthorizationDenied::Failed)
            }
            CheckError::Store(e) => AccessError::Store(e),
        }
    }

    fn decision_event(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capabilities: &[Capability],
        decision: Decision,
    ) -> AuditEvent {
        let outcome = if decision.allowed {
            AuditOutcome::Allowed
        } else {
            AuditOutcome::Denied
        };
        let capabilities = capabilities
            .iter()
            .map(Capability::label)
            .collect::<Vec<_>>()
            .join(",");
        AuditEvent::new(
            identity.id(),
            "authorize",
            "service",
            service.as_str(),
            outcome,
            decision.reason.label(),
        )
        .with_metadata("capabilities", capabilities)
        .with_metadata("kind", identity.kind().label())
    }

    fn audit_decision(
        &self,
        identity: &Identity,
        service: &ServiceId,
        capabilities: &[Capability],
        decision: Decision,
    ) {
        self.audit
            .emit(self.decision_event(identity, service, capabilities, decision));
    }

    fn audit_manage(&self, identity: &Identity, target: &SubjectId, allowed: bool, reason: &str) {
        let outcome = if allowed {
            AuditOutcome::Allowed
        } else {
            AuditOutcome::Denied
        };
        self.audit.emit(AuditEvent::new(
            identity.id(),
            "manage_check",
            "tenant",
            target.to_string(),
            outcome,
            reason,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PermissionSet;
    use crate::engine::DecisionReason;
    use crate::identity::SponsorRef;
    use crate::subject::RoleId;
    use crate::testutil::{sid, Fixture};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CapturingSink(Arc<Mutex<Vec<AuditEvent>>>);

    impl CapturingSink {
        fn events(&self) -> Vec<AuditEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AuditSink for CapturingSink {
        fn emit(&self, event: AuditEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn core(fixture: Fixture) -> (AccessCore<Fixture, Fixture, CapturingSink>, CapturingSink) {
        let shared = Arc::new(fixture);
        let sink = CapturingSink::default();
        let core = AccessCore::new(
            Arc::clone(&shared),
            shared,
            sink.clone(),
            AccessPolicy {
                admin_role: RoleId::from("admin"),
            },
        );
        (core, sink)
    }

    fn bank() -> ServiceId {
        ServiceId::from("bank")
    }

    fn view_only() -> PermissionSet {
        PermissionSet {
            can_view: true,
            ..PermissionSet::none()
        }
    }

    #[tokio::test]
    async fn duplicate_subject_fails_closed_and_opaque() {
        let fixture = Fixture::new()
            .with_root(sid(1))
            .with_tenant(sid(1), "distributor", None);
        let (core, sink) = core(fixture);

        let err = core.resolve_identity(&sid(1), None).await.unwrap_err();

        assert_eq!(
            err,
            AccessError::Authentication(AuthenticationError::Failed),
            "duplicate detail must not cross the boundary"
        );
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Failure);
        assert_eq!(events[0].reason, "duplicate_subject");
    }

    #[tokio::test]
    async fn resolution_failures_are_audited() {
        let (core, sink) = core(Fixture::new());

        let err = core.resolve_identity(&sid(9), None).await.unwrap_err();

        assert_eq!(
            err,
            AccessError::Authentication(AuthenticationError::UnknownSubject(sid(9)))
        );
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "resolve_identity");
        assert_eq!(events[0].reason, "unknown_subject");
    }

    #[tokio::test]
    async fn authorize_emits_one_event_per_decision() {
        let fixture = Fixture::new()
            .with_tenant(sid(1), "distributor", None)
            .with_defaults("distributor", "bank", view_only());
        let (core, sink) = core(fixture);
        let tenant = core
            .resolve_identity(&sid(1), Some(IdentityKind::Tenant))
            .await
            .unwrap();

        let allowed = core.authorize(&tenant, &bank(), Capability::View).await.unwrap();
        let denied = core.authorize(&tenant, &bank(), Capability::Edit).await.unwrap();

        assert!(allowed.allowed);
        assert!(!denied.allowed);
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, AuditOutcome::Allowed);
        assert_eq!(events[1].outcome, AuditOutcome::Denied);
        assert_eq!(events[1].reason, "role_default");
    }

    #[tokio::test]
    async fn require_turns_denial_into_typed_failure() {
        let fixture = Fixture::new().with_tenant(sid(1), "distributor", None);
        let (core, _) = core(fixture);
        let tenant = core.resolve_identity(&sid(1), None).await.unwrap();

        let err = core.require(&tenant, &bank(), Capability::Edit).await.unwrap_err();

        match err {
            AccessError::Denied(AuthorizationDenied::Capability {
                service,
                capability,
                reason,
            }) => {
                assert_eq!(service, bank());
                assert_eq!(capability, Capability::Edit);
                assert_eq!(reason, "default_deny");
            }
            other => panic!("expected capability denial, got: {other}"),
        }
    }

    #[tokio::test]
    async fn hierarchy_cycle_surfaces_as_opaque_denial() {
        let fixture = Fixture::new()
            .with_tenant(sid(1), "distributor", None)
            .with_tenant(sid(2), "retailer", Some(sid(1)))
            .with_edge(sid(2), sid(1));
        let (core, sink) = core(fixture);
        let tenant = core.resolve_identity(&sid(1), None).await.unwrap();

        let err = core
            .accessible_scope(&tenant, ScopeMode::DescendantsOnly)
            .await
            .unwrap_err();

        assert_eq!(err, AccessError::Denied(AuthorizationDenied::Failed));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "resolve_scope");
        assert_eq!(events[0].outcome, AuditOutcome::Failure);
        assert_eq!(events[0].reason, "hierarchy_cycle");
    }

    #[tokio::test]
    async fn ensure_in_scope_denies_outside_targets() {
        let fixture = Fixture::new()
            .with_tenant(sid(1), "distributor", None)
            .with_tenant(sid(2), "retailer", Some(sid(1)))
            .with_tenant(sid(3), "distributor", None);
        let (core, sink) = core(fixture);
        let tenant = core.resolve_identity(&sid(1), None).await.unwrap();

        core.ensure_in_scope(&tenant, &sid(2)).await.unwrap();

        let err = core.ensure_in_scope(&tenant, &sid(3)).await.unwrap_err();
        assert_eq!(
            err,
            AccessError::Denied(AuthorizationDenied::OutOfScope { target: sid(3) })
        );
        let last = sink.events().pop().unwrap();
        assert_eq!(last.action, "scope_check");
        assert_eq!(last.reason, "out_of_scope");
    }

    #[tokio::test]
    async fn missing_sponsor_fails_closed_on_authorize() {
        let fixture = Fixture::new().with_defaults("support", "bank", view_only());
        let (core, sink) = core(fixture);
        let delegate = Identity::Delegate {
            id: sid(2),
            department: RoleId::from("support"),
            sponsor: SponsorRef {
                id: sid(10),
                kind: SponsorKind::Tenant,
            },
        };

        let err = core
            .authorize(&delegate, &bank(), Capability::View)
            .await
            .unwrap_err();

        assert_eq!(err, AccessError::Denied(AuthorizationDenied::Failed));
        assert_eq!(sink.events()[0].reason, "sponsor_unresolved");
    }

    #[tokio::test]
    async fn authorize_amount_respects_the_ceiling() {
        let fixture = Fixture::new()
            .with_tenant(sid(1), "distributor", None)
            .with_defaults(
                "distributor",
                "bank",
                PermissionSet {
                    can_process: true,
                    amount_ceiling: Some(100),
                    ..PermissionSet::none()
                },
            );
        let (core, _) = core(fixture);
        let tenant = core.resolve_identity(&sid(1), None).await.unwrap();

        let within = core
            .authorize_amount(&tenant, &bank(), Capability::Process, 100)
            .await
            .unwrap();
        assert!(within.allowed);

        let beyond = core
            .authorize_amount(&tenant, &bank(), Capability::Process, 101)
            .await
            .unwrap();
        assert!(!beyond.allowed);
        assert_eq!(beyond.reason, DecisionReason::AmountCeiling);
    }

    #[tokio::test]
    async fn can_manage_requires_scope_and_rank() {
        let fixture = Fixture::new()
            .with_role("distributor", 1)
            .with_role("retailer", 2)
            .with_tenant(sid(1), "distributor", None)
            .with_tenant(sid(2), "retailer", Some(sid(1)))
            .with_tenant(sid(3), "distributor", Some(sid(1)));
        let (core, _) = core(fixture);
        let tenant = core.resolve_identity(&sid(1), None).await.unwrap();

        assert!(core.can_manage(&tenant, &sid(2)).await.unwrap());
        assert!(
            !core.can_manage(&tenant, &sid(3)).await.unwrap(),
            "equal rank does not manage"
        );
        assert!(
            !core.can_manage(&tenant, &sid(9)).await.unwrap(),
            "out of scope"
        );
    }

    #[tokio::test]
    async fn can_manage_uses_sponsor_rank_for_delegates() {
        let fixture = Fixture::new()
            .with_role("distributor", 1)
            .with_role("retailer", 2)
            .with_tenant(sid(1), "distributor", None)
            .with_tenant(sid(2), "retailer", Some(sid(1)))
            .with_delegate(sid(5), "support", sid(1), SponsorKind::Tenant);
        let (core, _) = core(fixture);
        let delegate = core.resolve_identity(&sid(5), None).await.unwrap();

        assert!(core.can_manage(&delegate, &sid(2)).await.unwrap());
    }

    #[tokio::test]
    async fn root_manages_everyone() {
        let fixture = Fixture::new()
            .with_root(sid(100))
            .with_tenant(sid(1), "distributor", None);
        let (core, _) = core(fixture);
        let root = core.resolve_identity(&sid(100), None).await.unwrap();

        assert!(core.can_manage(&root, &sid(1)).await.unwrap());
    }

    #[tokio::test]
    async fn with_delegation_attributes_records_to_the_sponsor() {
        let fixture = Fixture::new()
            .with_tenant(sid(1), "distributor", None)
            .with_delegate(sid(5), "support", sid(1), SponsorKind::Tenant);
        let (core, _) = core(fixture);
        let delegate = core.resolve_identity(&sid(5), None).await.unwrap();

        let owner = core.with_delegation(&delegate, |ctx| {
            assert_eq!(ctx.actor, sid(5));
            ctx.authority
        });

        assert_eq!(owner, sid(1));
        assert_eq!(core.effective_authority(&delegate), sid(1));
    }
}
