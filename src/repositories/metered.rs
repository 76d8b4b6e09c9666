//! Repository decorator that records `database_operations_*` metrics for
//! every call, whatever store sits underneath.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::{CartRepository, CheckoutRepository, InventoryRepository, OrderRepository, UserRepository};
use crate::models::{
    CartEntry, CheckoutPlan, InventoryItem, Order, RepositoryResult, User,
};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

pub struct Metered<R: ?Sized> {
    inner: Arc<R>,
    table: String,
    tracer: DatabaseTracingMiddleware,
}

impl<R: ?Sized> Metered<R> {
    pub fn new(inner: Arc<R>, table: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self {
            inner,
            table: table.into(),
            tracer: DatabaseTracingMiddleware::new(metrics),
        }
    }
}

#[async_trait]
impl<R: UserRepository + ?Sized> UserRepository for Metered<R> {
    async fn create(&self, user: User) -> RepositoryResult<User> {
        self.tracer
            .trace_operation("create_user", &self.table, self.inner.create(user))
            .await
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        self.tracer
            .trace_operation("get_user", &self.table, self.inner.find_by_username(username))
            .await
    }

    async fn add_savings(&self, username: &str, amount: Decimal) -> RepositoryResult<Decimal> {
        self.tracer
            .trace_operation(
                "add_savings",
                &self.table,
                self.inner.add_savings(username, amount),
            )
            .await
    }
}

#[async_trait]
impl<R: InventoryRepository + ?Sized> InventoryRepository for Metered<R> {
    async fn create(&self, item: InventoryItem) -> RepositoryResult<InventoryItem> {
        self.tracer
            .trace_operation("create_listing", &self.table, self.inner.create(item))
            .await
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<InventoryItem>> {
        self.tracer
            .trace_operation("get_listing", &self.table, self.inner.find_by_id(id))
            .await
    }

    async fn find_by_seller(&self, seller: &str) -> RepositoryResult<Vec<InventoryItem>> {
        self.tracer
            .trace_operation("query_by_seller", &self.table, self.inner.find_by_seller(seller))
            .await
    }

    async fn find_by_product(&self, product: &str) -> RepositoryResult<Vec<InventoryItem>> {
        self.tracer
            .trace_operation(
                "query_by_product",
                &self.table,
                self.inner.find_by_product(product),
            )
            .await
    }

    async fn find_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        self.tracer
            .trace_operation("scan_listings", &self.table, self.inner.find_all())
            .await
    }

    async fn update_listing(
        &self,
        seller: &str,
        product: &str,
        price: Decimal,
        quantity: u32,
    ) -> RepositoryResult<InventoryItem> {
        self.tracer
            .trace_operation(
                "update_listing",
                &self.table,
                self.inner.update_listing(seller, product, price, quantity),
            )
            .await
    }

    async fn delete(&self, seller: &str, product: &str) -> RepositoryResult<()> {
        self.tracer
            .trace_operation("delete_listing", &self.table, self.inner.delete(seller, product))
            .await
    }
}

#[async_trait]
impl<R: CartRepository + ?Sized> CartRepository for Metered<R> {
    async fn add_entry(&self, entry: CartEntry) -> RepositoryResult<CartEntry> {
        self.tracer
            .trace_operation("add_cart_entry", &self.table, self.inner.add_entry(entry))
            .await
    }

    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<CartEntry>> {
        self.tracer
            .trace_operation("query_cart", &self.table, self.inner.find_by_buyer(buyer))
            .await
    }

    async fn delete_entry(&self, buyer: &str, entry_id: &str) -> RepositoryResult<()> {
        self.tracer
            .trace_operation(
                "delete_cart_entry",
                &self.table,
                self.inner.delete_entry(buyer, entry_id),
            )
            .await
    }
}

#[async_trait]
impl<R: OrderRepository + ?Sized> OrderRepository for Metered<R> {
    async fn find_by_buyer(&self, buyer: &str) -> RepositoryResult<Vec<Order>> {
        self.tracer
            .trace_operation("query_orders", &self.table, self.inner.find_by_buyer(buyer))
            .await
    }
}

#[async_trait]
impl<R: CheckoutRepository + ?Sized> CheckoutRepository for Metered<R> {
    async fn commit_checkout(&self, plan: &CheckoutPlan) -> RepositoryResult<()> {
        self.tracer
            .trace_operation(
                "transact_write_items",
                &self.table,
                self.inner.commit_checkout(plan),
            )
            .await
    }
}
