use std::fmt;

use crate::subject::{RoleId, SubjectId};

/// The three organizational kinds an authenticated caller can belong to.
/// Doubles as the resolver's kind hint and as its probe order vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Root,
    Delegate,
    Tenant,
}

impl IdentityKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Delegate => "delegate",
            Self::Tenant => "tenant",
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Suspended,
}

impl Status {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// What kind of identity sponsors a delegate. Delegates of the root operator
/// inherit the full permission universe as their ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SponsorKind {
    Root,
    Tenant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SponsorRef {
    pub id: SubjectId,
    pub kind: SponsorKind,
}

/// Resolved actor for one request.
///
/// Constructed by the identity resolver and discarded at request end; never
/// persisted. The resolver refuses to build an `Identity` for a non-active
/// record, so a live value always refers to an active subject. Only delegates
/// carry a sponsor and only tenants carry a hierarchy role, so the data-model
/// invariants hold by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Root {
        id: SubjectId,
    },
    Tenant {
        id: SubjectId,
        role: RoleId,
    },
    Delegate {
        id: SubjectId,
        department: RoleId,
        sponsor: SponsorRef,
    },
}

impl Identity {
    pub fn id(&self) -> SubjectId {
        match self {
            Self::Root { id } | Self::Tenant { id, .. } | Self::Delegate { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> IdentityKind {
        match self {
            Self::Root { .. } => IdentityKind::Root,
            Self::Tenant { .. } => IdentityKind::Tenant,
            Self::Delegate { .. } => IdentityKind::Delegate,
        }
    }
}

/// Root operator record as held by the directory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub id: SubjectId,
    pub status: Status,
}

/// Tenant record: a node in the agent/distributor forest. `parent` is `None`
/// for top-level tenants, whose implicit ancestor is the root operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRecord {
    pub id: SubjectId,
    pub role: RoleId,
    pub parent: Option<SubjectId>,
    pub status: Status,
}

/// Delegate record: an employee acting on behalf of a sponsor, with no tree
/// position of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateRecord {
    pub id: SubjectId,
    pub department: RoleId,
    pub sponsor: SponsorRef,
    pub status: Status,
}
