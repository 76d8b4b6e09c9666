use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a registered user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Buyer => write!(f, "buyer"),
            Role::Seller => write!(f, "seller"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Lifecycle status of an order. Orders are written once as `Placed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Placed => write!(f, "placed"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placed" => Ok(OrderStatus::Placed),
            _ => Err(format!("Invalid order status: {}", s)),
        }
    }
}

/// Which of the three storefront services a process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Auth,
    Buyer,
    Seller,
}

impl ServiceKind {
    /// Port the service listens on when nothing is configured
    pub fn default_port(&self) -> u16 {
        match self {
            ServiceKind::Buyer => 8000,
            ServiceKind::Seller => 8001,
            ServiceKind::Auth => 8002,
        }
    }

    /// Message returned by the root endpoint
    pub fn banner(&self) -> &'static str {
        match self {
            ServiceKind::Auth => "Storefront auth service is running",
            ServiceKind::Buyer => "Storefront buyer service is running",
            ServiceKind::Seller => "Storefront seller service is running",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Auth => write!(f, "auth"),
            ServiceKind::Buyer => write!(f, "buyer"),
            ServiceKind::Seller => write!(f, "seller"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(Role::Buyer.to_string(), "buyer");
        assert_eq!(Role::Seller.to_string(), "seller");

        assert_eq!("buyer".parse::<Role>().unwrap(), Role::Buyer);
        assert_eq!("SELLER".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!(" Buyer ".parse::<Role>().unwrap(), Role::Buyer);

        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_order_status_string_conversion() {
        assert_eq!(OrderStatus::Placed.to_string(), "placed");
        assert_eq!("PLACED".parse::<OrderStatus>().unwrap(), OrderStatus::Placed);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_service_default_ports() {
        assert_eq!(ServiceKind::Buyer.default_port(), 8000);
        assert_eq!(ServiceKind::Seller.default_port(), 8001);
        assert_eq!(ServiceKind::Auth.default_port(), 8002);
    }

    #[test]
    fn test_serde_serialization() {
        let json = serde_json::to_string(&Role::Seller).unwrap();
        assert_eq!(json, "\"seller\"");

        let deserialized: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, Role::Seller);
    }
}
