use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    validate_username, AddBalanceRequest, AddToCartRequest, BalanceResponse,
    BalanceUpdatedResponse, CartEntry, CartEntryResponse, CheckoutPlan, CheckoutRejection,
    MessageResponse, OrderPlacedResponse, OrderResponse, ProductSummary, RemoveFromCartRequest,
    RepositoryError, ServiceError, ServiceResult, Validate, ValidationError, validate_cart_quantity,
    MAX_TRANSACTION_ITEMS,
};
use crate::repositories::{
    CartRepository, CheckoutRepository, InventoryRepository, OrderRepository, UserRepository,
};

/// Service for buyer browsing, cart, balance and checkout operations
pub struct BuyerService {
    user_repository: Arc<dyn UserRepository>,
    inventory_repository: Arc<dyn InventoryRepository>,
    cart_repository: Arc<dyn CartRepository>,
    order_repository: Arc<dyn OrderRepository>,
    checkout_repository: Arc<dyn CheckoutRepository>,
}

impl BuyerService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        inventory_repository: Arc<dyn InventoryRepository>,
        cart_repository: Arc<dyn CartRepository>,
        order_repository: Arc<dyn OrderRepository>,
        checkout_repository: Arc<dyn CheckoutRepository>,
    ) -> Self {
        Self {
            user_repository,
            inventory_repository,
            cart_repository,
            order_repository,
            checkout_repository,
        }
    }

    /// List every product in the store
    #[instrument(skip(self))]
    pub async fn view_products(&self) -> ServiceResult<Vec<ProductSummary>> {
        let items = self.inventory_repository.find_all().await?;
        info!("Listing {} products", items.len());
        Ok(items.iter().map(|item| item.to_summary()).collect())
    }

    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn view_cart(&self, buyer: &str) -> ServiceResult<Vec<CartEntryResponse>> {
        validate_username(buyer)?;
        let entries = self.cart_repository.find_by_buyer(buyer.trim()).await?;
        info!("Cart has {} entries", entries.len());
        Ok(entries.into_iter().map(CartEntryResponse::from).collect())
    }

    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn check_balance(&self, buyer: &str) -> ServiceResult<BalanceResponse> {
        validate_username(buyer)?;
        let buyer = buyer.trim();

        let user = self
            .user_repository
            .find_by_username(buyer)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                username: buyer.to_string(),
            })?;

        Ok(BalanceResponse {
            balance: user.savings,
        })
    }

    /// Top up a buyer's savings
    #[instrument(skip(self, request), fields(buyer = %request.buyer, amount = %request.amount))]
    pub async fn add_balance(&self, request: AddBalanceRequest) -> ServiceResult<BalanceUpdatedResponse> {
        request.validate()?;
        let buyer = request.buyer.trim();

        let balance = match self.user_repository.add_savings(buyer, request.amount).await {
            Ok(balance) => balance,
            Err(RepositoryError::NotFound) => {
                return Err(ServiceError::UserNotFound {
                    username: buyer.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        info!("Balance updated");
        Ok(BalanceUpdatedResponse {
            message: format!("Balance updated. New balance: ₹{}", balance),
            balance,
        })
    }

    /// Snapshot a product into the buyer's cart.
    ///
    /// Stock is checked but not reserved; checkout re-checks it.
    #[instrument(skip(self, request), fields(buyer = %request.buyer, product_id = %request.product_id, quantity = request.quantity))]
    pub async fn add_to_cart(&self, request: AddToCartRequest) -> ServiceResult<MessageResponse> {
        request.validate()?;
        let quantity = validate_cart_quantity(request.quantity)?;
        let buyer = request.buyer.trim();

        let item = self
            .inventory_repository
            .find_by_id(request.product_id.trim())
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound {
                product: request.product_id.clone(),
            })?;

        if quantity > item.quantity {
            warn!("Requested more than available stock");
            return Err(ServiceError::InsufficientStock {
                product: item.product,
                requested: quantity,
                available: item.quantity,
            });
        }

        let entry = self
            .cart_repository
            .add_entry(CartEntry::new(buyer.to_string(), &item, quantity))
            .await?;

        info!("Cart entry {} added", entry.id);
        Ok(MessageResponse::new(format!(
            "Added {} of '{}' to {}'s cart.",
            quantity, entry.product, buyer
        )))
    }

    /// Remove the oldest cart line for a product
    #[instrument(skip(self, request), fields(buyer = %request.buyer, product_id = %request.product_id))]
    pub async fn remove_from_cart(&self, request: RemoveFromCartRequest) -> ServiceResult<MessageResponse> {
        request.validate()?;
        let buyer = request.buyer.trim();
        let product_id = request.product_id.trim();

        let not_found = || ServiceError::CartItemNotFound {
            product_id: product_id.to_string(),
            buyer: buyer.to_string(),
        };

        let entry = self
            .cart_repository
            .find_by_buyer(buyer)
            .await?
            .into_iter()
            .find(|entry| entry.product_id == product_id)
            .ok_or_else(not_found)?;

        match self.cart_repository.delete_entry(buyer, &entry.id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        }

        info!("Cart entry {} removed", entry.id);
        Ok(MessageResponse::new("Item removed from cart."))
    }

    /// Check out the buyer's whole cart as one atomic unit of work
    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn place_order(&self, buyer: &str) -> ServiceResult<OrderPlacedResponse> {
        validate_username(buyer)?;
        let buyer = buyer.trim();

        let entries = self.cart_repository.find_by_buyer(buyer).await?;
        let plan = CheckoutPlan::from_cart(buyer, &entries).ok_or_else(|| {
            ServiceError::CartEmpty {
                buyer: buyer.to_string(),
            }
        })?;

        let user = self
            .user_repository
            .find_by_username(buyer)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                username: buyer.to_string(),
            })?;

        if !plan.fits_in_transaction() {
            return Err(ValidationError::OutOfRange {
                field: "cart".to_string(),
                min: "1".to_string(),
                max: MAX_TRANSACTION_ITEMS.to_string(),
                value: plan.transaction_items().to_string(),
            }
            .into());
        }

        if user.savings < plan.total() {
            warn!("Savings do not cover the order");
            return Err(ServiceError::InsufficientFunds {
                total: plan.total(),
                available: user.savings,
            });
        }

        for decrement in &plan.decrements {
            let available = self.current_stock(&decrement.product_id).await?;
            if available < decrement.quantity {
                warn!("Stock no longer covers the cart");
                return Err(ServiceError::InsufficientStock {
                    product: decrement.product.clone(),
                    requested: decrement.quantity,
                    available,
                });
            }
        }

        if let Err(e) = self.checkout_repository.commit_checkout(&plan).await {
            return Err(self.map_commit_error(&plan, e).await);
        }

        info!(order_id = %plan.order.id, total = %plan.total(), "Order placed");
        Ok(OrderPlacedResponse {
            message: format!("Order placed! Total paid: ₹{}", plan.total()),
            order_id: plan.order.id.clone(),
            total_payment: plan.total(),
        })
    }

    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn view_orders(&self, buyer: &str) -> ServiceResult<Vec<OrderResponse>> {
        validate_username(buyer)?;
        let orders = self.order_repository.find_by_buyer(buyer.trim()).await?;
        info!("Found {} orders", orders.len());
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    async fn current_stock(&self, product_id: &str) -> ServiceResult<u32> {
        Ok(self
            .inventory_repository
            .find_by_id(product_id)
            .await?
            .map(|item| item.quantity)
            .unwrap_or(0))
    }

    /// Turn a rejected commit into the business error for the guard that failed
    async fn map_commit_error(&self, plan: &CheckoutPlan, error: RepositoryError) -> ServiceError {
        let reason = match error {
            RepositoryError::CheckoutRejected { reason } => reason,
            other => return other.into(),
        };

        warn!("Checkout rejected at commit: {:?}", reason);
        match reason {
            CheckoutRejection::InsufficientStock { product_id } => {
                let decrement = plan.decrements.iter().find(|d| d.product_id == product_id);
                ServiceError::InsufficientStock {
                    product: decrement
                        .map(|d| d.product.clone())
                        .unwrap_or_else(|| product_id.clone()),
                    requested: decrement.map(|d| d.quantity).unwrap_or(0),
                    available: self.current_stock(&product_id).await.unwrap_or(0),
                }
            }
            CheckoutRejection::InsufficientFunds => {
                let available = self
                    .user_repository
                    .find_by_username(&plan.buyer)
                    .await
                    .ok()
                    .flatten()
                    .map(|user| user.savings)
                    .unwrap_or(Decimal::ZERO);
                ServiceError::InsufficientFunds {
                    total: plan.total(),
                    available,
                }
            }
            CheckoutRejection::CartChanged => ServiceError::CartChanged {
                buyer: plan.buyer.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, InventoryItem, Order, Role, User};
    use async_trait::async_trait;
    use mockall::mock;
    use rust_decimal_macros::dec;

    mock! {
        TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: User) -> Result<User, RepositoryError>;
            async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
            async fn add_savings(&self, username: &str, amount: Decimal) -> Result<Decimal, RepositoryError>;
        }
    }

    mock! {
        TestInventoryRepository {}

        #[async_trait]
        impl InventoryRepository for TestInventoryRepository {
            async fn create(&self, item: InventoryItem) -> Result<InventoryItem, RepositoryError>;
            async fn find_by_id(&self, id: &str) -> Result<Option<InventoryItem>, RepositoryError>;
            async fn find_by_seller(&self, seller: &str) -> Result<Vec<InventoryItem>, RepositoryError>;
            async fn find_by_product(&self, product: &str) -> Result<Vec<InventoryItem>, RepositoryError>;
            async fn find_all(&self) -> Result<Vec<InventoryItem>, RepositoryError>;
            async fn update_listing(&self, seller: &str, product: &str, price: Decimal, quantity: u32) -> Result<InventoryItem, RepositoryError>;
            async fn delete(&self, seller: &str, product: &str) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        TestCartRepository {}

        #[async_trait]
        impl CartRepository for TestCartRepository {
            async fn add_entry(&self, entry: CartEntry) -> Result<CartEntry, RepositoryError>;
            async fn find_by_buyer(&self, buyer: &str) -> Result<Vec<CartEntry>, RepositoryError>;
            async fn delete_entry(&self, buyer: &str, entry_id: &str) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        TestOrderRepository {}

        #[async_trait]
        impl OrderRepository for TestOrderRepository {
            async fn find_by_buyer(&self, buyer: &str) -> Result<Vec<Order>, RepositoryError>;
        }
    }

    mock! {
        TestCheckoutRepository {}

        #[async_trait]
        impl CheckoutRepository for TestCheckoutRepository {
            async fn commit_checkout(&self, plan: &CheckoutPlan) -> Result<(), RepositoryError>;
        }
    }

    struct Mocks {
        users: MockTestUserRepository,
        inventory: MockTestInventoryRepository,
        carts: MockTestCartRepository,
        orders: MockTestOrderRepository,
        checkout: MockTestCheckoutRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                users: MockTestUserRepository::new(),
                inventory: MockTestInventoryRepository::new(),
                carts: MockTestCartRepository::new(),
                orders: MockTestOrderRepository::new(),
                checkout: MockTestCheckoutRepository::new(),
            }
        }

        fn into_service(self) -> BuyerService {
            BuyerService::new(
                Arc::new(self.users),
                Arc::new(self.inventory),
                Arc::new(self.carts),
                Arc::new(self.orders),
                Arc::new(self.checkout),
            )
        }
    }

    fn pen(quantity: u32) -> InventoryItem {
        InventoryItem::new(
            "alice".to_string(),
            "Pen".to_string(),
            dec!(10),
            quantity,
            Some("http://x/img.png".to_string()),
        )
    }

    fn bob(savings: Decimal) -> User {
        let mut user = User::new("bob".to_string(), "h".to_string(), Role::Buyer);
        user.savings = savings;
        user
    }

    #[tokio::test]
    async fn test_add_to_cart_checks_stock() {
        let mut mocks = Mocks::new();
        mocks
            .inventory
            .expect_find_by_id()
            .returning(|_| Ok(Some(pen(5))));
        mocks.carts.expect_add_entry().times(0);

        let service = mocks.into_service();
        let error = service
            .add_to_cart(AddToCartRequest {
                buyer: "bob".to_string(),
                product_id: pen(5).id,
                quantity: 6,
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InsufficientStock);
    }

    #[tokio::test]
    async fn test_add_to_cart_snapshots_price() {
        let mut mocks = Mocks::new();
        mocks
            .inventory
            .expect_find_by_id()
            .returning(|_| Ok(Some(pen(5))));
        mocks
            .carts
            .expect_add_entry()
            .withf(|entry: &CartEntry| {
                entry.buyer == "bob" && entry.quantity == 2 && entry.price == dec!(10)
            })
            .times(1)
            .returning(|entry| Ok(entry));

        let service = mocks.into_service();
        let response = service
            .add_to_cart(AddToCartRequest {
                buyer: "bob".to_string(),
                product_id: pen(5).id,
                quantity: 2,
            })
            .await
            .unwrap();

        assert_eq!(response.message, "Added 2 of 'Pen' to bob's cart.");
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_non_positive_quantity() {
        let mut mocks = Mocks::new();
        mocks.inventory.expect_find_by_id().times(0);

        let service = mocks.into_service();
        for quantity in [0, -1] {
            let error = service
                .add_to_cart(AddToCartRequest {
                    buyer: "bob".to_string(),
                    product_id: "p".to_string(),
                    quantity,
                })
                .await
                .unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_add_balance_unknown_user() {
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_add_savings()
            .times(1)
            .returning(|_, _| Err(RepositoryError::NotFound));

        let service = mocks.into_service();
        let error = service
            .add_balance(AddBalanceRequest {
                buyer: "ghost".to_string(),
                amount: dec!(10),
            })
            .await
            .unwrap_err();

        assert!(matches!(error, ServiceError::UserNotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_balance_rejects_non_positive_amount() {
        let mut mocks = Mocks::new();
        mocks.users.expect_add_savings().times(0);

        let service = mocks.into_service();
        let error = service
            .add_balance(AddBalanceRequest {
                buyer: "bob".to_string(),
                amount: dec!(0),
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_place_order_empty_cart() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(Vec::new()));
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        let error = service.place_order("bob").await.unwrap_err();

        assert!(matches!(error, ServiceError::CartEmpty { .. }));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_place_order_unknown_buyer_with_cart() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(vec![CartEntry::new("ghost".to_string(), &pen(5), 2)]));
        mocks
            .users
            .expect_find_by_username()
            .times(1)
            .returning(|_| Ok(None));
        mocks.inventory.expect_find_by_id().times(0);
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        let error = service.place_order("ghost").await.unwrap_err();

        assert!(matches!(error, ServiceError::UserNotFound { .. }));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_place_order_unknown_buyer_with_oversized_cart() {
        let mut mocks = Mocks::new();
        mocks.carts.expect_find_by_buyer().returning(|_| {
            let item = pen(5);
            Ok((0..MAX_TRANSACTION_ITEMS)
                .map(|_| CartEntry::new("ghost".to_string(), &item, 1))
                .collect())
        });
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(None));
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        let error = service.place_order("ghost").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_place_order_oversized_cart_is_invalid() {
        let mut mocks = Mocks::new();
        mocks.carts.expect_find_by_buyer().returning(|_| {
            let item = pen(5);
            Ok((0..MAX_TRANSACTION_ITEMS)
                .map(|_| CartEntry::new("bob".to_string(), &item, 1))
                .collect())
        });
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(Some(bob(dec!(100000)))));
        mocks.inventory.expect_find_by_id().times(0);
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        let error = service.place_order("bob").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_place_order_insufficient_funds_commits_nothing() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(vec![CartEntry::new("bob".to_string(), &pen(5), 2)]));
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(Some(bob(dec!(0)))));
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        let error = service.place_order("bob").await.unwrap_err();

        match error {
            ServiceError::InsufficientFunds { total, available } => {
                assert_eq!(total, dec!(20));
                assert_eq!(available, dec!(0));
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_place_order_aggregates_stock_per_product() {
        let mut mocks = Mocks::new();
        // Two lines of 3 against a stock of 5
        mocks.carts.expect_find_by_buyer().returning(|_| {
            let item = pen(5);
            Ok(vec![
                CartEntry::new("bob".to_string(), &item, 3),
                CartEntry::new("bob".to_string(), &item, 3),
            ])
        });
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(Some(bob(dec!(100)))));
        mocks
            .inventory
            .expect_find_by_id()
            .returning(|_| Ok(Some(pen(5))));
        mocks.checkout.expect_commit_checkout().times(0);

        let service = mocks.into_service();
        match service.place_order("bob").await.unwrap_err() {
            ServiceError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("Expected InsufficientStock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_place_order_commits_plan() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(vec![CartEntry::new("bob".to_string(), &pen(5), 2)]));
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(Some(bob(dec!(100)))));
        mocks
            .inventory
            .expect_find_by_id()
            .returning(|_| Ok(Some(pen(5))));
        mocks
            .checkout
            .expect_commit_checkout()
            .withf(|plan: &CheckoutPlan| {
                plan.buyer == "bob" && plan.total() == dec!(20) && plan.cart_entry_ids.len() == 1
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = mocks.into_service();
        let response = service.place_order("bob").await.unwrap();

        assert_eq!(response.total_payment, dec!(20));
        assert_eq!(response.message, "Order placed! Total paid: ₹20");
    }

    #[tokio::test]
    async fn test_place_order_maps_commit_rejection() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(vec![CartEntry::new("bob".to_string(), &pen(5), 2)]));
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(Some(bob(dec!(100)))));
        mocks
            .inventory
            .expect_find_by_id()
            .returning(|_| Ok(Some(pen(5))));
        mocks.checkout.expect_commit_checkout().returning(|_| {
            Err(RepositoryError::CheckoutRejected {
                reason: CheckoutRejection::CartChanged,
            })
        });

        let service = mocks.into_service();
        let error = service.place_order("bob").await.unwrap_err();

        assert!(matches!(error, ServiceError::CartChanged { .. }));
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_remove_from_cart_missing_entry() {
        let mut mocks = Mocks::new();
        mocks
            .carts
            .expect_find_by_buyer()
            .returning(|_| Ok(Vec::new()));
        mocks.carts.expect_delete_entry().times(0);

        let service = mocks.into_service();
        let error = service
            .remove_from_cart(RemoveFromCartRequest {
                buyer: "bob".to_string(),
                product_id: "p".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(error, ServiceError::CartItemNotFound { .. }));
    }

    #[tokio::test]
    async fn test_check_balance_unknown_user() {
        let mut mocks = Mocks::new();
        mocks
            .users
            .expect_find_by_username()
            .returning(|_| Ok(None));

        let service = mocks.into_service();
        let error = service.check_balance("ghost").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }
}
