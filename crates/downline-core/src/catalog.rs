use std::fmt;

use crate::subject::{RoleId, SubjectId};

/// The fixed capability vocabulary every service-level permission record
/// speaks. Closed on purpose: new capabilities are a schema change, not data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    View,
    Edit,
    SetCommission,
    Process,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::View,
        Capability::Edit,
        Capability::SetCommission,
        Capability::Process,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::SetCommission => "set_commission",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Allow/deny per capability for one (role-or-subject, service) pair.
/// Absent fields are `false`, never undefined; `Default` is the all-deny set.
/// `amount_ceiling` optionally bounds monetary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet {
    pub can_view: bool,
    pub can_edit: bool,
    pub can_set_commission: bool,
    pub can_process: bool,
    pub amount_ceiling: Option<u64>,
}

impl PermissionSet {
    pub fn none() -> Self {
        Self::default()
    }

    /// The full permission universe: every capability, no ceiling. Reserved
    /// for the root operator and for root-sponsored delegation ceilings.
    pub fn full() -> Self {
        Self {
            can_view: true,
            can_edit: true,
            can_set_commission: true,
            can_process: true,
            amount_ceiling: None,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view,
            Capability::Edit => self.can_edit,
            Capability::SetCommission => self.can_set_commission,
            Capability::Process => self.can_process,
        }
    }

    pub fn allows_amount(&self, amount: u64) -> bool {
        self.amount_ceiling.map_or(true, |ceiling| amount <= ceiling)
    }

    /// Capability-by-capability AND. Ceilings combine to the tighter bound:
    /// a delegate can never process more than its sponsor may.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            can_view: self.can_view && other.can_view,
            can_edit: self.can_edit && other.can_edit,
            can_set_commission: self.can_set_commission && other.can_set_commission,
            can_process: self.can_process && other.can_process,
            amount_ceiling: match (self.amount_ceiling, other.amount_ceiling) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

/// Stored form of a permission override: fields present replace the matching
/// base fields individually, fields absent leave the base untouched. This is
/// why an override can grant a capability the role lacks and revoke one it
/// has, without touching the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionPatch {
    pub can_view: Option<bool>,
    pub can_edit: Option<bool>,
    pub can_set_commission: Option<bool>,
    pub can_process: Option<bool>,
    pub amount_ceiling: Option<u64>,
}

impl PermissionPatch {
    pub fn with(mut self, capability: Capability, allowed: bool) -> Self {
        match capability {
            Capability::View => self.can_view = Some(allowed),
            Capability::Edit => self.can_edit = Some(allowed),
            Capability::SetCommission => self.can_set_commission = Some(allowed),
            Capability::Process => self.can_process = Some(allowed),
        }
        self
    }

    pub fn with_ceiling(mut self, ceiling: u64) -> Self {
        self.amount_ceiling = Some(ceiling);
        self
    }

    pub fn apply(&self, base: &mut PermissionSet) {
        if let Some(v) = self.can_view {
            base.can_view = v;
        }
        if let Some(v) = self.can_edit {
            base.can_edit = v;
        }
        if let Some(v) = self.can_set_commission {
            base.can_set_commission = v;
        }
        if let Some(v) = self.can_process {
            base.can_process = v;
        }
        if let Some(c) = self.amount_ceiling {
            base.amount_ceiling = Some(c);
        }
    }

    /// Whether this patch touches the given capability at all.
    pub fn patches(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view.is_some(),
            Capability::Edit => self.can_edit.is_some(),
            Capability::SetCommission => self.can_set_commission.is_some(),
            Capability::Process => self.can_process.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.can_view.is_none()
            && self.can_edit.is_none()
            && self.can_set_commission.is_none()
            && self.can_process.is_none()
            && self.amount_ceiling.is_none()
    }

    /// Field-wise overlay: `self` wins where set, `base` fills the rest.
    /// Applying the overlay equals applying `base` then `self`.
    pub fn overlay(&self, base: &Self) -> Self {
        Self {
            can_view: self.can_view.or(base.can_view),
            can_edit: self.can_edit.or(base.can_edit),
            can_set_commission: self.can_set_commission.or(base.can_set_commission),
            can_process: self.can_process.or(base.can_process),
            amount_ceiling: self.amount_ceiling.or(base.amount_ceiling),
        }
    }
}

/// Catalog role. `level` is rank within the hierarchy (0 is most senior) and
/// backs the manage-who-can-manage-whom comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub level: u8,
}

impl Role {
    pub fn outranks(&self, other: &Role) -> bool {
        self.level < other.level
    }
}

/// Who an override is scoped to: a whole catalog role, or one individual
/// tenant/delegate. Subject-scoped override fields take precedence over
/// role-scoped ones, which take precedence over role defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideScope {
    Role(RoleId),
    Subject(SubjectId),
}
