use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency symbol used in human-readable product blurbs
pub const CURRENCY_SYMBOL: &str = "₹";

/// A seller's stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub seller: String,
    pub product: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for `POST /add_item`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub username: String,
    pub product: String,
    pub price: Decimal,
    pub quantity: i64,
    pub image_url: String,
}

/// Query parameters for `POST /update_item`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    pub username: String,
    pub product: String,
    pub upd_price: Decimal,
    pub upd_quantity: i64,
}

/// Query parameters naming a seller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerQuery {
    pub username: String,
}

/// Query parameters naming one of a seller's products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerProductQuery {
    pub username: String,
    pub product: String,
}

/// Query parameters naming a product across all sellers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuery {
    pub product: String,
}

/// Buyer-facing product listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_id: String,
    pub product: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Seller-facing product listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerProductResponse {
    pub product_id: String,
    pub product: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAddedResponse {
    pub message: String,
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMarkdownResponse {
    pub image_markdown: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfoResponse {
    pub info: String,
}

impl InventoryItem {
    /// Create a new inventory row for a seller's product
    pub fn new(
        seller: String,
        product: String,
        price: Decimal,
        quantity: u32,
        image_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            seller,
            product,
            price,
            quantity,
            image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Key of the row reserving the `(seller, product)` pair.
    ///
    /// Listing ids are random, so a relisted product gets a new one; this
    /// key is what a conditional put uses to keep the pair unique.
    pub fn listing_key(seller: &str, product: &str) -> String {
        let name = format!("{}\u{1f}{}", seller, product);
        format!(
            "listing#{}",
            Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
        )
    }

    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }

    /// Markdown image reference, if the product has an image
    pub fn image_markdown(&self) -> Option<String> {
        if !self.has_image() {
            return None;
        }
        self.image_url
            .as_deref()
            .map(|url| format!("![{}]({})", self.product, url))
    }

    /// Human-readable blurb with price, stock and image
    pub fn info_text(&self) -> String {
        match self.image_markdown() {
            Some(markdown) => format!(
                "{}\n\nPrice: {}{}\nStock: {} units.",
                markdown, CURRENCY_SYMBOL, self.price, self.quantity
            ),
            None => format!(
                "No image for '{}'.\nPrice: {}{}\nStock: {} units.\n\
                 Would you like to:\n\
                 1. Proceed to buy anyway?\n\
                 2. Wait for an image?\n\
                 3. Check other products?",
                self.product, CURRENCY_SYMBOL, self.price, self.quantity
            ),
        }
    }

    pub fn to_summary(&self) -> ProductSummary {
        ProductSummary {
            product_id: self.id.clone(),
            product: self.product.clone(),
            price: self.price,
            quantity: self.quantity,
        }
    }

    pub fn to_seller_response(&self) -> SellerProductResponse {
        SellerProductResponse {
            product_id: self.id.clone(),
            product: self.product.clone(),
            price: self.price,
            quantity: self.quantity,
            image_url: self.image_url.clone(),
        }
    }
}
