pub mod auth;
pub mod buyer;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod seller;

pub use auth::{auth_router, AuthState};
pub use buyer::{buyer_router, BuyerState};
pub use error::{status_for, ApiError, ApiQuery};
pub use health::{health_check, root};
pub use metrics::metrics_handler;
pub use middleware::{request_size_middleware, security_headers_middleware};
pub use seller::{seller_router, SellerState};
