mod check;
mod resolve;
mod scope;

pub use check::{CheckError, Decision, DecisionReason, Effective, PermissionEngine};
pub use resolve::{IdentityResolver, ResolveError};
pub use scope::{ScopeEngine, ScopeError, ScopeMode};
