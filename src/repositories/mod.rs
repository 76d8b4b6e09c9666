// Repositories module - data access layer

pub mod cart_repository;
pub mod checkout_repository;
pub mod dynamodb;
pub mod inventory_repository;
pub mod memory;
pub mod metered;
pub mod order_repository;
pub mod table_manager;
pub mod user_repository;


pub use cart_repository::{CartRepository, DynamoDbCartRepository};
pub use checkout_repository::{CheckoutRepository, DynamoDbCheckoutRepository};
pub use inventory_repository::{DynamoDbInventoryRepository, InventoryRepository};
pub use memory::InMemoryStore;
pub use metered::Metered;
pub use order_repository::{DynamoDbOrderRepository, OrderRepository};
pub use table_manager::{StoreTables, TableManager};
pub use user_repository::{DynamoDbUserRepository, UserRepository};
