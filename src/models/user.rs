use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Role;

/// Registered storefront user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub savings: Decimal,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with an empty balance
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            username,
            password_hash,
            role,
            savings: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// Query parameters for `POST /register_user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Query parameters for `POST /login_user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserRequest {
    pub username: String,
    pub password: String,
}

/// Successful login outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
}

/// Query parameters naming a buyer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerQuery {
    pub buyer: String,
}

/// Query parameters for `POST /add_balance`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBalanceRequest {
    pub buyer: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceUpdatedResponse {
    pub message: String,
    pub balance: Decimal,
}
