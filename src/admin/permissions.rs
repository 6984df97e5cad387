use serde::{Deserialize, Serialize};

// ============================================================================
// Admin Permissions - fixed-shape capability record
// ============================================================================

/// Areas of the back-office an admin can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Products,
    Orders,
    Customers,
    Analytics,
    Settings,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminPermissions {
    pub products: bool,
    pub orders: bool,
    pub customers: bool,
    pub analytics: bool,
    pub settings: bool,
    pub users: bool,
}

impl AdminPermissions {
    pub fn full() -> Self {
        Self {
            products: true,
            orders: true,
            customers: true,
            analytics: true,
            settings: true,
            users: true,
        }
    }

    /// Analytics only. Every area that can mutate state is denied.
    pub fn read_only() -> Self {
        Self {
            analytics: true,
            ..Self::default()
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Products => self.products,
            Capability::Orders => self.orders,
            Capability::Customers => self.customers,
            Capability::Analytics => self.analytics,
            Capability::Settings => self.settings,
            Capability::Users => self.users,
        }
    }
}
