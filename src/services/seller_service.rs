use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    validate_product_name, validate_stock_quantity, validate_username, AddItemRequest,
    ImageMarkdownResponse, InventoryItem, MessageResponse, ProductAddedResponse,
    ProductInfoResponse, RepositoryError, SellerProductQuery, SellerProductResponse, ServiceError,
    ServiceResult, UpdateItemRequest, Validate,
};
use crate::repositories::InventoryRepository;

/// Service for seller inventory management and product lookups
pub struct SellerService {
    inventory_repository: Arc<dyn InventoryRepository>,
}

impl SellerService {
    pub fn new(inventory_repository: Arc<dyn InventoryRepository>) -> Self {
        Self {
            inventory_repository,
        }
    }

    /// List a new product for a seller
    #[instrument(skip(self, request), fields(seller = %request.username, product = %request.product))]
    pub async fn add_item(&self, request: AddItemRequest) -> ServiceResult<ProductAddedResponse> {
        request.validate()?;
        let quantity = validate_stock_quantity("quantity", request.quantity, 1)?;
        let seller = request.username.trim();
        let product = request.product.trim();

        let item = InventoryItem::new(
            seller.to_string(),
            product.to_string(),
            request.price,
            quantity,
            Some(request.image_url.trim().to_string()),
        );

        let item = match self.inventory_repository.create(item).await {
            Ok(item) => item,
            Err(RepositoryError::ConstraintViolation { .. }) => {
                warn!("Seller already lists this product");
                return Err(ServiceError::ProductAlreadyExists {
                    seller: seller.to_string(),
                    product: product.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!("Product {} listed", item.id);
        Ok(ProductAddedResponse {
            message: format!(
                "Product '{}' added successfully by seller '{}'.",
                product, seller
            ),
            product_id: item.id,
        })
    }

    /// Overwrite price and stock of an existing listing
    #[instrument(skip(self, request), fields(seller = %request.username, product = %request.product))]
    pub async fn update_item(&self, request: UpdateItemRequest) -> ServiceResult<MessageResponse> {
        request.validate()?;
        let quantity = validate_stock_quantity("upd_quantity", request.upd_quantity, 0)?;
        let seller = request.username.trim();
        let product = request.product.trim();

        self.inventory_repository
            .update_listing(seller, product, request.upd_price, quantity)
            .await
            .map_err(|e| missing_listing(e, seller, product))?;

        info!("Product updated");
        Ok(MessageResponse::new(format!(
            "Product '{}' updated by seller '{}'.",
            product, seller
        )))
    }

    #[instrument(skip(self), fields(seller = %username))]
    pub async fn view_seller_products(&self, username: &str) -> ServiceResult<Vec<SellerProductResponse>> {
        validate_username(username)?;
        let items = self
            .inventory_repository
            .find_by_seller(username.trim())
            .await?;

        info!("Seller has {} products", items.len());
        Ok(items.iter().map(|item| item.to_seller_response()).collect())
    }

    #[instrument(skip(self, query), fields(seller = %query.username, product = %query.product))]
    pub async fn remove_item(&self, query: SellerProductQuery) -> ServiceResult<MessageResponse> {
        validate_username(&query.username)?;
        validate_product_name(&query.product)?;
        let seller = query.username.trim();
        let product = query.product.trim();

        self.inventory_repository
            .delete(seller, product)
            .await
            .map_err(|e| missing_listing(e, seller, product))?;

        info!("Product removed");
        Ok(MessageResponse::new(format!(
            "Product '{}' removed from seller '{}' inventory.",
            product, seller
        )))
    }

    /// Markdown image link for a product, from the first listing that has one
    #[instrument(skip(self), fields(product = %product))]
    pub async fn get_product_image_url(&self, product: &str) -> ServiceResult<ImageMarkdownResponse> {
        let listings = self.listings(product).await?;

        let image_markdown = listings
            .iter()
            .find_map(|item| item.image_markdown())
            .ok_or_else(|| ServiceError::ImageNotFound {
                product: product.trim().to_string(),
            })?;

        Ok(ImageMarkdownResponse { image_markdown })
    }

    /// Human-readable product blurb with image, price and stock
    #[instrument(skip(self), fields(product = %product))]
    pub async fn get_product_info_with_image(&self, product: &str) -> ServiceResult<ProductInfoResponse> {
        let listings = self.listings(product).await?;
        let item = listings
            .first()
            .ok_or_else(|| ServiceError::ProductNotFound {
                product: product.trim().to_string(),
            })?;

        Ok(ProductInfoResponse {
            info: item.info_text(),
        })
    }

    /// All listings of a product name, oldest first. Empty is NotFound.
    async fn listings(&self, product: &str) -> ServiceResult<Vec<InventoryItem>> {
        validate_product_name(product)?;
        let product = product.trim();

        let listings = self.inventory_repository.find_by_product(product).await?;
        if listings.is_empty() {
            warn!("No listing for product");
            return Err(ServiceError::ProductNotFound {
                product: product.to_string(),
            });
        }
        Ok(listings)
    }
}

fn missing_listing(error: RepositoryError, seller: &str, product: &str) -> ServiceError {
    match error {
        RepositoryError::NotFound => ServiceError::SellerProductNotFound {
            seller: seller.to_string(),
            product: product.to_string(),
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;
    use async_trait::async_trait;
    use mockall::{mock, predicate};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

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

    fn add_request() -> AddItemRequest {
        AddItemRequest {
            username: "alice".to_string(),
            product: "Pen".to_string(),
            price: dec!(10),
            quantity: 5,
            image_url: "http://x/img.png".to_string(),
        }
    }

    fn listing(image_url: Option<&str>) -> InventoryItem {
        InventoryItem::new(
            "alice".to_string(),
            "Pen".to_string(),
            dec!(10),
            5,
            image_url.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_add_item_success() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo
            .expect_create()
            .withf(|item: &InventoryItem| {
                item.seller == "alice"
                    && item.product == "Pen"
                    && item.quantity == 5
                    && item.id != InventoryItem::listing_key("alice", "Pen")
            })
            .times(1)
            .returning(|item| Ok(item));

        let service = SellerService::new(Arc::new(mock_repo));
        let response = service.add_item(add_request()).await.unwrap();

        assert_eq!(
            response.message,
            "Product 'Pen' added successfully by seller 'alice'."
        );
        assert!(uuid::Uuid::parse_str(&response.product_id).is_ok());
    }

    #[tokio::test]
    async fn test_add_item_duplicate_is_conflict() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo.expect_create().returning(|_| {
            Err(RepositoryError::ConstraintViolation {
                message: "exists".to_string(),
            })
        });

        let service = SellerService::new(Arc::new(mock_repo));
        let error = service.add_item(add_request()).await.unwrap_err();

        assert!(matches!(error, ServiceError::ProductAlreadyExists { .. }));
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_add_item_rejects_bad_input() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo.expect_create().times(0);
        let service = SellerService::new(Arc::new(mock_repo));

        let mut bad_url = add_request();
        bad_url.image_url = "ftp://x/img.png".to_string();
        let mut zero_price = add_request();
        zero_price.price = dec!(0);
        let mut zero_quantity = add_request();
        zero_quantity.quantity = 0;

        for request in [bad_url, zero_price, zero_quantity] {
            let error = service.add_item(request).await.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_update_missing_listing_is_not_found() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo
            .expect_update_listing()
            .times(1)
            .returning(|_, _, _, _| Err(RepositoryError::NotFound));

        let service = SellerService::new(Arc::new(mock_repo));
        let error = service
            .update_item(UpdateItemRequest {
                username: "alice".to_string(),
                product: "Ghost".to_string(),
                upd_price: dec!(1),
                upd_quantity: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(error, ServiceError::SellerProductNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_negative_values() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo.expect_update_listing().times(0);
        let service = SellerService::new(Arc::new(mock_repo));

        let error = service
            .update_item(UpdateItemRequest {
                username: "alice".to_string(),
                product: "Pen".to_string(),
                upd_price: dec!(-1),
                upd_quantity: 1,
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);

        let error = service
            .update_item(UpdateItemRequest {
                username: "alice".to_string(),
                product: "Pen".to_string(),
                upd_price: dec!(1),
                upd_quantity: -1,
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_remove_item_not_found() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo
            .expect_delete()
            .returning(|_, _| Err(RepositoryError::NotFound));

        let service = SellerService::new(Arc::new(mock_repo));
        let error = service
            .remove_item(SellerProductQuery {
                username: "alice".to_string(),
                product: "Pen".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_image_lookup() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo
            .expect_find_by_product()
            .with(predicate::eq("Pen".to_string()))
            .returning(|_| Ok(vec![listing(Some("http://x/img.png"))]));
        mock_repo
            .expect_find_by_product()
            .with(predicate::eq("Pencil".to_string()))
            .returning(|_| Ok(vec![listing(None)]));
        mock_repo
            .expect_find_by_product()
            .with(predicate::eq("Ghost".to_string()))
            .returning(|_| Ok(Vec::new()));

        let service = SellerService::new(Arc::new(mock_repo));

        let found = service.get_product_image_url("Pen").await.unwrap();
        assert_eq!(found.image_markdown, "![Pen](http://x/img.png)");

        let no_image = service.get_product_image_url("Pencil").await.unwrap_err();
        assert!(matches!(no_image, ServiceError::ImageNotFound { .. }));

        let missing = service.get_product_image_url("Ghost").await.unwrap_err();
        assert!(matches!(missing, ServiceError::ProductNotFound { .. }));
    }

    #[tokio::test]
    async fn test_product_info_with_and_without_image() {
        let mut mock_repo = MockTestInventoryRepository::new();
        mock_repo
            .expect_find_by_product()
            .with(predicate::eq("Pen".to_string()))
            .returning(|_| Ok(vec![listing(Some("http://x/img.png"))]));
        mock_repo
            .expect_find_by_product()
            .with(predicate::eq("Pencil".to_string()))
            .returning(|_| Ok(vec![listing(None)]));

        let service = SellerService::new(Arc::new(mock_repo));

        let with_image = service.get_product_info_with_image("Pen").await.unwrap();
        assert!(with_image.info.starts_with("![Pen](http://x/img.png)"));
        assert!(with_image.info.contains("Stock: 5 units."));

        let without = service.get_product_info_with_image("Pencil").await.unwrap();
        assert!(without.info.contains("Would you like to:"));
    }
}
