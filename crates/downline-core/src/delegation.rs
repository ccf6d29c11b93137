use crate::identity::Identity;
use crate::subject::SubjectId;

/// Actor attribution for one delegated action. The delegate stays the actor
/// of record; `authority` is the identity whose entitlement backs the action
/// and who owns whatever the action creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext {
    pub actor: SubjectId,
    pub authority: SubjectId,
}

/// The identity whose authority backs an action: self for root and tenants,
/// the sponsor for a delegate.
pub fn effective_authority(identity: &Identity) -> SubjectId {
    match identity {
        Identity::Root { id } | Identity::Tenant { id, .. } => *id,
        Identity::Delegate { sponsor, .. } => sponsor.id,
    }
}

pub fn actor_context(identity: &Identity) -> ActorContext {
    ActorContext {
        actor: identity.id(),
        authority: effective_authority(identity),
    }
}
