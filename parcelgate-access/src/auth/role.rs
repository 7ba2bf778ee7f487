//! Desk roles
//!
//! The backend assigns one role per account and sends it as a single-letter
//! code. Everything else in the client goes through [`Role`].

use parcelgate_core::LifetimeConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role assigned to an account server-side
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Customer,
    Admin,
    SuperAdmin,
    Cashier,
    PackageHandler,
    TransferPersonnel,
    FrontDesk,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Customer,
        Role::Admin,
        Role::SuperAdmin,
        Role::Cashier,
        Role::PackageHandler,
        Role::TransferPersonnel,
        Role::FrontDesk,
    ];

    /// Wire code used by the backend
    pub fn code(&self) -> char {
        match self {
            Role::Customer => 'C',
            Role::Admin => 'A',
            Role::SuperAdmin => 'S',
            Role::Cashier => 'K',
            Role::PackageHandler => 'H',
            Role::TransferPersonnel => 'T',
            Role::FrontDesk => 'F',
        }
    }

    /// Parse a backend role value, accepting either the code or the name.
    ///
    /// Returns `None` for anything unrecognised so callers fail closed.
    pub fn from_code(value: &str) -> Option<Role> {
        value.parse().ok()
    }

    /// Human readable name shown in menus and headers
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Admin => "Administrator",
            Role::SuperAdmin => "Super Administrator",
            Role::Cashier => "Cashier",
            Role::PackageHandler => "Package Handler",
            Role::TransferPersonnel => "Transfer Personnel",
            Role::FrontDesk => "Front Desk",
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Customer)
    }

    /// Admin-class roles get the longest token lifetime
    pub fn is_admin_class(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// How long a login with this role is honored
    pub fn token_lifetime(&self, lifetimes: &LifetimeConfig) -> chrono::Duration {
        let hours = match self {
            Role::Customer => lifetimes.customer_hours,
            role if role.is_admin_class() => lifetimes.admin_hours,
            _ => lifetimes.default_hours,
        };
        chrono::Duration::hours(i64::from(hours))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
            Role::Cashier => write!(f, "cashier"),
            Role::PackageHandler => write!(f, "package_handler"),
            Role::TransferPersonnel => write!(f, "transfer_personnel"),
            Role::FrontDesk => write!(f, "front_desk"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(role) = Role::ALL.iter().find(|role| {
            trimmed.len() == 1 && trimmed.starts_with(role.code())
        }) {
            return Ok(*role);
        }

        match trimmed.to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            "cashier" => Ok(Role::Cashier),
            "package_handler" => Ok(Role::PackageHandler),
            "transfer_personnel" => Ok(Role::TransferPersonnel),
            "front_desk" => Ok(Role::FrontDesk),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Roles travel as their backend code
impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code().to_string())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Deserialize an optional role, mapping unknown codes to `None`
pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(Role::from_code))
}
