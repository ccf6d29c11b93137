use crate::catalog::Capability;
use crate::store::StoreError;
use crate::subject::{ServiceId, SubjectId};

/// The subject could not be resolved into an active identity. Terminal for
/// the request; never retried inside the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("subject not found: {0}")]
    UnknownSubject(SubjectId),

    #[error("subject is suspended: {0}")]
    Suspended(SubjectId),

    /// Opaque fail-closed variant covering structural problems (e.g. one id
    /// in several identity stores). Full detail is retained in logs and the
    /// audit trail only, never in the error callers see.
    #[error("authentication failed")]
    Failed,
}

/// The identity resolved but may not perform the operation or see the
/// target.
///
/// Kept distinct from [`AuthenticationError`] so callers can pick the right
/// outward response category; at the public edge the two should usually
/// render identically, otherwise the difference lets an attacker enumerate
/// which ids exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationDenied {
    #[error("'{capability}' denied on service '{service}': {reason}")]
    Capability {
        service: ServiceId,
        capability: Capability,
        reason: String,
    },

    #[error("target {target} is outside the caller's accessible scope")]
    OutOfScope { target: SubjectId },

    /// Opaque fail-closed variant covering structural problems (e.g. a
    /// hierarchy cycle). Detail lives in logs and audit only.
    #[error("authorization failed")]
    Failed,
}

/// Failure surface of the public facade operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Denied(#[from] AuthorizationDenied),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sid;

    #[test]
    fn authentication_errors_render_their_subject() {
        let err = AuthenticationError::UnknownSubject(sid(1));
        assert!(err.to_string().contains(&sid(1).to_string()));

        let err = AuthenticationError::Failed;
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[test]
    fn capability_denial_names_service_and_capability() {
        let err = AuthorizationDenied::Capability {
            service: ServiceId::from("bank"),
            capability: Capability::Process,
            reason: "sponsor_ceiling".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("bank"), "got: {msg}");
        assert!(msg.contains("process"), "got: {msg}");
        assert!(msg.contains("sponsor_ceiling"), "got: {msg}");
    }

    #[test]
    fn opaque_variants_reveal_nothing() {
        assert_eq!(AuthorizationDenied::Failed.to_string(), "authorization failed");
    }

    #[test]
    fn access_error_wraps_each_layer() {
        let auth: AccessError = AuthenticationError::Suspended(sid(2)).into();
        assert!(matches!(auth, AccessError::Authentication(_)));

        let denied: AccessError = AuthorizationDenied::OutOfScope { target: sid(3) }.into();
        assert!(matches!(denied, AccessError::Denied(_)));

        let store: AccessError = StoreError::Unavailable("down".to_string()).into();
        assert!(store.to_string().contains("down"));
    }
}
