use std::sync::Arc;

use crate::identity::{Identity, IdentityKind, Status};
use crate::store::{DirectoryReader, StoreError};
use crate::subject::SubjectId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("subject not found: {0}")]
    UnknownSubject(SubjectId),

    #[error("subject is suspended: {0}")]
    Suspended(SubjectId),

    /// More than one identity store holds a record for the same id. This is
    /// corrupted state, never a silently-resolved first hit.
    #[error("subject {id} exists in more than one identity store: {kinds:?}")]
    DuplicateSubject {
        id: SubjectId,
        kinds: Vec<IdentityKind>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Turns a verified subject id (plus optional kind hint) into exactly one
/// [`Identity`], or fails. All store probing lives here; callers never see it.
pub struct IdentityResolver<D> {
    directory: Arc<D>,
}

/// Probe priority when the caller supplies no kind hint.
const PROBE_ORDER: [IdentityKind; 3] = [
    IdentityKind::Root,
    IdentityKind::Delegate,
    IdentityKind::Tenant,
];

impl<D: DirectoryReader> IdentityResolver<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    pub async fn resolve(
        &self,
        subject: &SubjectId,
        hint: Option<IdentityKind>,
    ) -> Result<Identity, ResolveError> {
        match hint {
            Some(kind) => {
                let candidate = self
                    .lookup(subject, kind)
                    .await?
                    .ok_or(ResolveError::UnknownSubject(*subject))?;
                Self::gate(subject, candidate)
            }
            None => self.probe(subject).await,
        }
    }

    /// Probes every store in [`PROBE_ORDER`]. A single hit resolves; zero
    /// hits fail as unknown; multiple hits fail as a duplicate regardless of
    /// priority, which is why all three stores are always consulted.
    async fn probe(&self, subject: &SubjectId) -> Result<Identity, ResolveError> {
        let mut hits = Vec::new();
        for kind in PROBE_ORDER {
            if let Some(candidate) = self.lookup(subject, kind).await? {
                hits.push((kind, candidate));
            }
        }

        match hits.len() {
            0 => Err(ResolveError::UnknownSubject(*subject)),
            1 => {
                let (_, candidate) = hits.remove(0);
                Self::gate(subject, candidate)
            }
            _ => Err(ResolveError::DuplicateSubject {
                id: *subject,
                kinds: hits.into_iter().map(|(kind, _)| kind).collect(),
            }),
        }
    }

    async fn lookup(
        &self,
        subject: &SubjectId,
        kind: IdentityKind,
    ) -> Result<Option<(Identity, Status)>, ResolveError> {
        let candidate = match kind {
            IdentityKind::Root => self
                .directory
                .find_root(subject)
                .await?
                .map(|r| (Identity::Root { id: r.id }, r.status)),
            IdentityKind::Delegate => self.directory.find_delegate(subject).await?.map(|r| {
                (
                    Identity::Delegate {
                        id: r.id,
                        department: r.department,
                        sponsor: r.sponsor,
                    },
                    r.status,
                )
            }),
            IdentityKind::Tenant => self.directory.find_tenant(subject).await?.map(|r| {
                (
                    Identity::Tenant {
                        id: r.id,
                        role: r.role,
                    },
                    r.status,
                )
            }),
        };
        Ok(candidate)
    }

    fn gate(subject: &SubjectId, candidate: (Identity, Status)) -> Result<Identity, ResolveError> {
        let (identity, status) = candidate;
        if !status.is_active() {
            return Err(ResolveError::Suspended(*subject));
        }
        Ok(identity)
    }
}
