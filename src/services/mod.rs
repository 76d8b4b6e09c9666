// Services module - business logic layer

pub mod auth_service;
pub mod buyer_service;
pub mod password;
pub mod seller_service;

pub use auth_service::AuthService;
pub use buyer_service::BuyerService;
pub use password::PasswordHasher;
pub use seller_service::SellerService;
