//! In-process store used for local runs and by the test suites.
//!
//! All four collections sit behind one lock, so a checkout validates every
//! guard and applies every mutation under a single write guard.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{CartRepository, CheckoutRepository, InventoryRepository, OrderRepository, UserRepository};
use crate::models::{
    CartEntry, CheckoutPlan, CheckoutRejection, InventoryItem, Order, RepositoryError,
    RepositoryResult, User,
};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<String, User>,
    inventory: HashMap<String, InventoryItem>,
    carts: HashMap<String, Vec<CartEntry>>,
    orders: HashMap<String, Vec<Order>>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreState {
    fn listing_id(&self, seller: &str, product: &str) -> Option<String> {
        self.inventory
            .values()
            .find(|item| item.seller == seller && item.product == product)
            .map(|item| item.id.clone())
    }

    /// Check every guard of a checkout without mutating anything
    fn check_plan(&self, plan: &CheckoutPlan) -> RepositoryResult<()> {
        for decrement in &plan.decrements {
            let enough = self
                .inventory
                .get(&decrement.product_id)
                .map(|item| item.quantity >= decrement.quantity)
                .unwrap_or(false);
            if !enough {
                return Err(RepositoryError::CheckoutRejected {
                    reason: CheckoutRejection::InsufficientStock {
                        product_id: decrement.product_id.clone(),
                    },
                });
            }
        }

        let covered = self
            .users
            .get(&plan.buyer)
            .map(|user| user.savings >= plan.total())
            .unwrap_or(false);
        if !covered {
            return Err(RepositoryError::CheckoutRejected {
                reason: CheckoutRejection::InsufficientFunds,
            });
        }

        let cart = self.carts.get(&plan.buyer);
        let all_present = plan.cart_entry_ids.iter().all(|id| {
            cart.map(|entries| entries.iter().any(|entry| &entry.id == id))
                .unwrap_or(false)
        });
        if !all_present {
            return Err(RepositoryError::CheckoutRejected {
                reason: CheckoutRejection::CartChanged,
            });
        }

        let duplicate_order = self
            .orders
            .get(&plan.buyer)
            .map(|orders| orders.iter().any(|order| order.id == plan.order.id))
            .unwrap_or(false);
        if duplicate_order {
            return Err(RepositoryError::TransactionFailed {
                message: format!("Order {} already exists", plan.order.id),
            });
        }

        Ok(())
    }

    /// Apply a plan whose guards have already been checked
    fn apply_plan(&mut self, plan: &CheckoutPlan) {
        let now = Utc::now();
        for decrement in &plan.decrements {
            if let Some(item) = self.inventory.get_mut(&decrement.product_id) {
                item.quantity -= decrement.quantity;
                item.updated_at = now;
            }
        }

        if let Some(user) = self.users.get_mut(&plan.buyer) {
            user.savings -= plan.total();
        }

        self.orders
            .entry(plan.buyer.clone())
            .or_default()
            .push(plan.order.clone());

        if let Some(entries) = self.carts.get_mut(&plan.buyer) {
            entries.retain(|entry| !plan.cart_entry_ids.contains(&entry.id));
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.username) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("User {} already exists", user.username),
            });
        }
        state.users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        Ok(self.state.read().await.users.get(username).cloned())
    }

    async fn add_savings(&self, username: &str, amount: Decimal) -> RepositoryResult<Decimal> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(username)
            .ok_or(RepositoryError::NotFound)?;
        user.savings += amount;
        Ok(user.savings)
    }
}

#[async_trait]
impl InventoryRepository for InMemoryStore {
    async fn create(&self, item: InventoryItem) -> RepositoryResult<InventoryItem> {
        let mut state = self.state.write().await;
        if state.listing_id(&item.seller, &item.product).is_some() || state.inventory.contains_key(&item.id) {
            return Err(RepositoryError::ConstraintViolation {
                message: format!("Product {} already listed by {}", item.product, item.seller),
            });
        }
        state.inventory.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<InventoryItem>> {
        Ok(self.state.read().await.inventory.get(id).cloned())
    }

    async fn find_by_seller(&self, seller: &str) -> RepositoryResult<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state
            .inventory
            .values()
            .filter(|item| item.seller == seller)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.product.cmp(&b.product));
        Ok(items)
    }

    async fn find_by_product(&self, product: &str) -> RepositoryResult<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state
            .inventory
            .values()
            .filter(|item| item.product == product)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn find_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let state = self.state.read().await;
        let mut items: Vec<InventoryItem> = state.inventory.values().cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn update_listing(
        &self,
        seller: &str,
        product: &str,
        price: Decimal,
        quantity: u32,
    ) -> RepositoryResult<InventoryItem> {
        let mut state = self.state.write().await;
        let id = state.listing_id(seller, product).ok_or(RepositoryError::NotFound)?;
        let item = state
            .inventory
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        item.price = price;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, seller: &str, product: &str) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let id = state.listing_id(seller, product).ok_or(RepositoryError::NotFound)?;
        state.inventory.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn add_entry(&self, entry: CartEntry) -> RepositoryResult<CartEntry> {
        let mut state = self.state.write().await;
        state
            .carts
            .entry(entry.buyer.clone())
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<CartEntry>> {
        // Insertion order is add order
        Ok(self
            .state
            .read()
            .await
            .carts
            .get(buyer)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_entry(&self, buyer: &str, entry_id: &str) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let entries = state.carts.get_mut(buyer).ok_or(RepositoryError::NotFound)?;
        let position = entries
            .iter()
            .position(|entry| entry.id == entry_id)
            .ok_or(RepositoryError::NotFound)?;
        entries.remove(position);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<Order>> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .get(buyer)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl CheckoutRepository for InMemoryStore {
    #[instrument(skip(self, plan), fields(buyer = %plan.buyer, order_id = %plan.order.id))]
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> RepositoryResult<()> {
        if !plan.fits_in_transaction() {
            return Err(RepositoryError::InvalidQuery {
                message: format!(
                    "Checkout needs {} writes, more than one transaction can hold",
                    plan.transaction_items()
                ),
            });
        }

        let mut state = self.state.write().await;
        state.check_plan(plan)?;
        state.apply_plan(plan);

        debug!("Checkout applied in memory");
        Ok(())
    }
}
