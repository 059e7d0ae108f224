//! Status and role enums for orders and accounts.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Order lifecycle status as reported by the backend.
///
/// Statuses the client does not know about deserialize to [`OrderStatus::Unknown`]
/// and are treated as still in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Placed,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order has reached a final state.
    ///
    /// Terminal orders are shown under "past orders"; everything else is a
    /// current order.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// Whether the order ended without being delivered.
    #[must_use]
    pub const fn is_unsuccessful(self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed)
    }

    /// The wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Placed => "PLACED",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role, used to gate role-specific navigation.
///
/// The backend has used both `buyer`/`seller` and `CUSTOMER`/`SELLER`/`OWNER`
/// spellings; parsing is case-insensitive and maps `customer` to
/// [`UserRole::Buyer`]. Roles the client does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRole {
    Buyer,
    Seller,
    Owner,
    Other(String),
}

impl UserRole {
    /// The canonical lowercase form stored in the session.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Owner => "owner",
            Self::Other(role) => role,
        }
    }

    /// Whether this role may access the seller dashboard.
    #[must_use]
    pub const fn is_seller(&self) -> bool {
        matches!(self, Self::Seller | Self::Owner)
    }

    /// The route a freshly logged-in user lands on.
    #[must_use]
    pub const fn landing_route(&self) -> &'static str {
        match self {
            Self::Seller => "/seller_dashboard",
            _ => "/",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "buyer" | "customer" => Self::Buyer,
            "seller" => Self::Seller,
            "owner" => Self::Owner,
            _ => Self::Other(s.to_owned()),
        })
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}
