use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::identity::{Identity, Role};

/// What a role may do with leads it does not own. Owners can always view and edit their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub view_others: bool,
    pub edit_others: bool,
    pub record_sales: bool,
}

/// Immutable role→capability table handed to the lead service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRules {
    rules: BTreeMap<Role, Capabilities>,
}

impl PermissionRules {
    /// ME works its own leads; LEAD can see the floor; DM can edit it; ADMIN can do anything.
    pub fn standard() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            Role::Me,
            Capabilities {
                view_others: false,
                edit_others: false,
                record_sales: true,
            },
        );
        rules.insert(
            Role::Lead,
            Capabilities {
                view_others: true,
                edit_others: false,
                record_sales: true,
            },
        );
        rules.insert(
            Role::Dm,
            Capabilities {
                view_others: true,
                edit_others: true,
                record_sales: true,
            },
        );
        rules.insert(
            Role::Admin,
            Capabilities {
                view_others: true,
                edit_others: true,
                record_sales: true,
            },
        );
        Self { rules }
    }

    pub fn new(rules: BTreeMap<Role, Capabilities>) -> Self {
        Self { rules }
    }

    /// Roles missing from the table get no capabilities.
    pub fn capabilities(&self, role: Role) -> Capabilities {
        self.rules.get(&role).copied().unwrap_or_default()
    }

    pub fn can_view(&self, identity: &Identity, owner: Option<&str>) -> bool {
        owns(identity, owner) || self.capabilities(identity.role).view_others
    }

    pub fn can_edit(&self, identity: &Identity, owner: Option<&str>) -> bool {
        owns(identity, owner) || self.capabilities(identity.role).edit_others
    }

    pub fn can_record_sale(&self, identity: &Identity, owner: Option<&str>) -> bool {
        self.capabilities(identity.role).record_sales && self.can_edit(identity, owner)
    }
}

impl Default for PermissionRules {
    fn default() -> Self {
        Self::standard()
    }
}

fn owns(identity: &Identity, owner: Option<&str>) -> bool {
    owner == Some(identity.uid.as_str())
}
