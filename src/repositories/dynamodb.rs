//! Helpers shared by the DynamoDB repositories: client spans, error mapping
//! and attribute decoding.

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{error, warn};

use crate::models::{RepositoryError, RepositoryResult};

pub type Item = HashMap<String, AttributeValue>;

/// Create a DynamoDB client span with X-Ray compatible attributes
pub fn client_span(table_name: &str, region: &str, operation: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,
        "aws.agent" = "rust-aws-sdk",

        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,

        "table_name" = %table_name,
        "endpoint" = format!("https://dynamodb.{}.amazonaws.com", region),

        // OpenTelemetry semantic conventions
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),

        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,

        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,

        "component" = "aws-sdk-dynamodb",
    )
}

/// Convert a DynamoDB error into a RepositoryError
pub fn map_dynamodb_error(table_name: &str, error: DynamoDbError) -> RepositoryError {
    match &error {
        DynamoDbError::ResourceNotFoundException(_) => {
            error!("DynamoDB table not found: {}", table_name);
            RepositoryError::TableNotFound {
                table_name: table_name.to_string(),
            }
        }
        DynamoDbError::ConditionalCheckFailedException(_) => {
            warn!("Conditional check failed on {}", table_name);
            RepositoryError::ConstraintViolation {
                message: format!("Conditional check failed on {}", table_name),
            }
        }
        DynamoDbError::TransactionConflictException(_) => {
            warn!("Conflicting transaction on {}", table_name);
            RepositoryError::ConstraintViolation {
                message: "Item is being modified by a concurrent transaction".to_string(),
            }
        }
        DynamoDbError::ProvisionedThroughputExceededException(_)
        | DynamoDbError::RequestLimitExceeded(_) => {
            warn!("DynamoDB throttled request on {}", table_name);
            RepositoryError::RateLimitExceeded
        }
        _ => {
            error!("DynamoDB error: {:?}", error);
            RepositoryError::AwsSdk {
                message: error.to_string(),
            }
        }
    }
}

pub fn is_conditional_check_failure(error: &DynamoDbError) -> bool {
    matches!(error, DynamoDbError::ConditionalCheckFailedException(_))
}

/// True when a transaction was cancelled by one of its condition expressions
pub fn is_cancelled_by_condition(error: &DynamoDbError) -> bool {
    match error {
        DynamoDbError::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .iter()
            .any(|reason| reason.code() == Some("ConditionalCheckFailed")),
        _ => false,
    }
}

pub fn string_attr(item: &Item, name: &str) -> RepositoryResult<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: format!("Missing {}", name),
        })
}

pub fn optional_string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

pub fn number_attr<T: FromStr>(item: &Item, name: &str) -> RepositoryResult<T> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: format!("Invalid {}", name),
        })
}

pub fn decimal_attr(item: &Item, name: &str) -> RepositoryResult<Decimal> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: format!("Invalid {}", name),
        })
}

pub fn datetime_attr(item: &Item, name: &str) -> RepositoryResult<DateTime<Utc>> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RepositoryError::InvalidQuery {
            message: format!("Invalid {}", name),
        })
}

/// Map a builder failure from the SDK's typed request structs
pub fn build_error(what: &str, error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::AwsSdk {
        message: format!("Failed to build {}: {}", what, error),
    }
}
