// Re-export all model types
pub use self::cart::*;
pub use self::checkout::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::inventory::*;
pub use self::order::*;
pub use self::response::*;
pub use self::user::*;
pub use self::validation::*;

mod cart;
mod checkout;
mod enums;
mod errors;
mod inventory;
mod order;
mod response;
mod user;
mod validation;
