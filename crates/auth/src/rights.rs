//! Roles, permissions, and the static role→rights table.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Role identifier used for RBAC.
///
/// Roles are opaque strings at this layer; what a role grants is decided by
/// the [`RoleRights`] table injected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission identifier (e.g. "users.read").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static mapping from role name to the set of permission names it grants.
///
/// Constructed once at startup and injected into the evaluator; immutable
/// afterwards, so it is safe to share across request tasks without locking.
/// A role absent from the table grants the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRights {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl RoleRights {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table the service ships with: plain users hold no rights,
    /// admins may read and manage users.
    pub fn standard() -> Self {
        Self::new()
            .grant("user", std::iter::empty::<&str>())
            .grant("admin", ["users.read", "users.manage"])
    }

    /// Builder-style: add (or extend) a role's permission set.
    pub fn grant<I>(mut self, role: impl Into<Cow<'static, str>>, permissions: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cow<'static, str>>,
    {
        self.grants
            .entry(Role::new(role))
            .or_default()
            .extend(permissions.into_iter().map(Permission::new));
        self
    }

    /// Permissions granted to a role (empty for unknown roles).
    pub fn permissions_of(&self, role: &Role) -> impl Iterator<Item = &Permission> {
        self.grants.get(role).into_iter().flatten()
    }

    pub fn grants_all<'a>(
        &self,
        role: &Role,
        required: impl IntoIterator<Item = &'a Permission>,
    ) -> bool {
        let granted = self.grants.get(role);
        required.into_iter().all(|p| {
            granted.map(|set| set.contains(p)).unwrap_or(false)
        })
    }
}
