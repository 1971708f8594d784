use peoplehub_auth::{CommandAuthorization, Permission, Portal, permissions::roles};

/// Small helper wrapper to associate an authorization contract with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
    pub portal: Option<Portal>,
}

impl<C> CmdAuth<C> {
    /// Admin-surface reads open to any Admin-portal role.
    pub fn admin_portal(inner: C) -> Self {
        Self {
            inner,
            required: Vec::new(),
            portal: Some(Portal::Admin),
        }
    }

    /// Role administration: Admin portal plus `roles.manage`.
    pub fn manage_roles(inner: C) -> Self {
        Self {
            inner,
            required: vec![roles::MANAGE],
            portal: Some(Portal::Admin),
        }
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }

    fn required_portal(&self) -> Option<Portal> {
        self.portal
    }
}
