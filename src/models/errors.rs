use rust_decimal::Decimal;
use thiserror::Error;

/// Client-facing classification of a failure, independent of transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    Unauthorized,
    NotFound,
    InvalidArgument,
    InsufficientStock,
    InsufficientFunds,
    Unavailable,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// Machine-readable code carried in error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("User '{username}' already exists. Please log in instead.")]
    UserAlreadyExists { username: String },

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("No user found with username: {username}")]
    UserNotFound { username: String },

    #[error("Product not found: {product}")]
    ProductNotFound { product: String },

    #[error("Product '{product}' not found for seller '{seller}'")]
    SellerProductNotFound { seller: String, product: String },

    #[error("Product '{product}' already exists for seller '{seller}'")]
    ProductAlreadyExists { seller: String, product: String },

    #[error("Image not found for product '{product}'")]
    ImageNotFound { product: String },

    #[error("Item {product_id} not found in {buyer}'s cart")]
    CartItemNotFound { product_id: String, buyer: String },

    #[error("{buyer}'s cart is empty")]
    CartEmpty { buyer: String },

    #[error("{buyer}'s cart changed during checkout, please retry")]
    CartChanged { buyer: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Insufficient stock for '{product}': requested={requested}, available={available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    #[error("Insufficient balance. Total: ₹{total}, Available: ₹{available}")]
    InsufficientFunds { total: Decimal, available: Decimal },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Background task failed: {message}")]
    TaskFailed { message: String },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UserAlreadyExists { .. }
            | ServiceError::ProductAlreadyExists { .. }
            | ServiceError::CartChanged { .. } => ErrorKind::Conflict,
            ServiceError::InvalidCredentials => ErrorKind::Unauthorized,
            ServiceError::UserNotFound { .. }
            | ServiceError::ProductNotFound { .. }
            | ServiceError::SellerProductNotFound { .. }
            | ServiceError::ImageNotFound { .. }
            | ServiceError::CartItemNotFound { .. }
            | ServiceError::CartEmpty { .. } => ErrorKind::NotFound,
            ServiceError::ValidationError { .. } => ErrorKind::InvalidArgument,
            ServiceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ServiceError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            ServiceError::Repository { source } => source.kind(),
            ServiceError::Configuration { .. } | ServiceError::TaskFailed { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

/// Why the store refused to commit a checkout unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRejection {
    /// A product row is gone or holds less than the order needs
    InsufficientStock { product_id: String },
    /// The buyer row is gone or its savings no longer cover the total
    InsufficientFunds,
    /// A priced cart entry was removed before the commit
    CartChanged,
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Item not found")]
    NotFound,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("Checkout rejected: {reason:?}")]
    CheckoutRejected { reason: CheckoutRejection },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Invalid query parameters: {message}")]
    InvalidQuery { message: String },

    #[error("Transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound => ErrorKind::NotFound,
            RepositoryError::ConstraintViolation { .. } => ErrorKind::Conflict,
            RepositoryError::CheckoutRejected { reason } => match reason {
                CheckoutRejection::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CheckoutRejection::InsufficientFunds => ErrorKind::InsufficientFunds,
                CheckoutRejection::CartChanged => ErrorKind::Conflict,
            },
            RepositoryError::ConnectionFailed | RepositoryError::RateLimitExceeded => {
                ErrorKind::Unavailable
            }
            RepositoryError::Timeout => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        }
    }
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::TaskFailed {
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
