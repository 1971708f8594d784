use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

/// The universal wildcard atom.
pub const WILDCARD: &str = "*";

/// Permission atom.
///
/// Atoms are opaque strings of the form `"<resource>.<action>"` (e.g.
/// `"payroll.manage"`), or the wildcard `"*"`.
///
/// Matching is **exact**: there is no prefix or hierarchy expansion, so
/// `"payroll.manage"` does not imply `"payroll.view"` and `"payroll.*"` is not
/// a pattern. A role that needs both must list both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build an atom from a static string (usable in `const` items).
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub const fn wildcard() -> Self {
        Self::from_static(WILDCARD)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }

    /// Resource half of a `"<resource>.<action>"` atom.
    pub fn resource(&self) -> Option<&str> {
        self.as_str().split_once('.').map(|(resource, _)| resource)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lets sets of atoms be probed with a plain `&str`. Ordering and hashing
/// are those of the underlying string, so lookups agree with the derives.
impl Borrow<str> for Permission {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Portal access atoms.
pub mod portal {
    use super::Permission;

    pub const ADMIN: Permission = Permission::from_static("portal.admin");
    pub const EMPLOYEE: Permission = Permission::from_static("portal.employee");
}

/// Atoms that gate the access core's own endpoints.
pub mod roles {
    use super::Permission;

    pub const MANAGE: Permission = Permission::from_static("roles.manage");
}

pub mod dashboard {
    use super::Permission;

    pub const VIEW: Permission = Permission::from_static("dashboard.view");
}
