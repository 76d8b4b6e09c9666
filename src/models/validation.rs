use rust_decimal::Decimal;

use super::{
    AddBalanceRequest, AddItemRequest, AddToCartRequest, LoginUserRequest, RegisterUserRequest,
    RemoveFromCartRequest, Role, UpdateItemRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_PASSWORD_LENGTH: usize = 256;
pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;
pub const MAX_IMAGE_URL_LENGTH: usize = 2048;
pub const MAX_PRICE: Decimal = Decimal::from_parts(99999999, 0, 0, false, 2); // 999999.99
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100000000, 0, 0, false, 2); // 1000000.00
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000;
pub const MAX_CART_QUANTITY: i64 = 10_000;

impl Validate for RegisterUserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        validate_role(&self.role)?;
        Ok(())
    }
}

impl Validate for LoginUserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

impl Validate for AddBalanceRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.buyer)?;
        validate_amount(&self.amount)?;
        Ok(())
    }
}

impl Validate for AddToCartRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.buyer)?;
        validate_identifier("product_id", &self.product_id)?;
        validate_cart_quantity(self.quantity)?;
        Ok(())
    }
}

impl Validate for RemoveFromCartRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.buyer)?;
        validate_identifier("product_id", &self.product_id)?;
        Ok(())
    }
}

impl Validate for AddItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_product_name(&self.product)?;
        validate_price(&self.price)?;
        validate_stock_quantity("quantity", self.quantity, 1)?;
        validate_image_url(&self.image_url)?;
        Ok(())
    }
}

impl Validate for UpdateItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_product_name(&self.product)?;
        validate_updated_price(&self.upd_price)?;
        validate_stock_quantity("upd_quantity", self.upd_quantity, 0)?;
        Ok(())
    }
}

/// Validate a username (buyer or seller)
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "username".to_string(),
        });
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max_length: MAX_USERNAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: "username".to_string(),
            value: username.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "password".to_string(),
        });
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max_length: MAX_PASSWORD_LENGTH,
            actual_length: password.len(),
        });
    }

    Ok(())
}

pub fn validate_role(role: &str) -> ValidationResult<Role> {
    role.parse::<Role>()
        .map_err(|reason| ValidationError::InvalidValue {
            field: "role".to_string(),
            value: role.to_string(),
            reason,
        })
}

/// Validate an opaque identifier such as a product id
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: field.to_string(),
        });
    }

    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max_length: MAX_USERNAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    Ok(())
}

pub fn validate_product_name(product: &str) -> ValidationResult<()> {
    let trimmed = product.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "product".to_string(),
        });
    }

    if trimmed.len() > MAX_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "product".to_string(),
            max_length: MAX_PRODUCT_NAME_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: "product".to_string(),
            value: product.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate a listing price: strictly positive
pub fn validate_price(price: &Decimal) -> ValidationResult<()> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field: "price".to_string(),
            value: price.to_string(),
            reason: "Price must be greater than zero".to_string(),
        });
    }

    validate_money("price", price, &MAX_PRICE)
}

/// Validate a price update: zero is allowed, negatives are not
pub fn validate_updated_price(price: &Decimal) -> ValidationResult<()> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field: "upd_price".to_string(),
            value: price.to_string(),
            reason: "Price cannot be negative".to_string(),
        });
    }

    validate_money("upd_price", price, &MAX_PRICE)
}

/// Validate a balance top-up
pub fn validate_amount(amount: &Decimal) -> ValidationResult<()> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidValue {
            field: "amount".to_string(),
            value: amount.to_string(),
            reason: "Amount must be greater than zero".to_string(),
        });
    }

    validate_money("amount", amount, &MAX_AMOUNT)
}

fn validate_money(field: &str, value: &Decimal, max: &Decimal) -> ValidationResult<()> {
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: max.to_string(),
            value: value.to_string(),
        });
    }

    if value.normalize().scale() > 2 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Cannot have more than 2 decimal places".to_string(),
        });
    }

    Ok(())
}

/// Validate a stock level and narrow it to the stored width
pub fn validate_stock_quantity(field: &str, quantity: i64, min: i64) -> ValidationResult<u32> {
    if quantity < min || quantity > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: min.to_string(),
            max: MAX_STOCK_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    u32::try_from(quantity).map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        value: quantity.to_string(),
        reason: "Quantity does not fit the stored range".to_string(),
    })
}

/// Validate a cart quantity and narrow it to the stored width
pub fn validate_cart_quantity(quantity: i64) -> ValidationResult<u32> {
    if quantity < 1 || quantity > MAX_CART_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "1".to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    u32::try_from(quantity).map_err(|_| ValidationError::InvalidValue {
        field: "quantity".to_string(),
        value: quantity.to_string(),
        reason: "Quantity does not fit the stored range".to_string(),
    })
}

/// Validate a product image URL: must be http(s) with a host
pub fn validate_image_url(url: &str) -> ValidationResult<()> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "image_url".to_string(),
        });
    }

    if trimmed.len() > MAX_IMAGE_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "image_url".to_string(),
            max_length: MAX_IMAGE_URL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let lower = trimmed.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));

    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {}
        _ => {
            return Err(ValidationError::InvalidFormat {
                field: "image_url".to_string(),
                expected: "An http:// or https:// URL".to_string(),
            })
        }
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "image_url".to_string(),
            expected: "A URL without whitespace".to_string(),
        });
    }

    Ok(())
}
