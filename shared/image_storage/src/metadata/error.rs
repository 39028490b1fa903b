//! Error types for image metadata storage operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{
    get_item::GetItemError, put_item::PutItemError, query::QueryError,
};
use thiserror::Error;

/// Result type for image metadata storage operations
pub type MetadataStoreResult<T> = Result<T, MetadataStoreError>;

/// Errors that can occur during image metadata storage operations
#[derive(Error, Debug)]
pub enum MetadataStoreError {
    /// Failed to insert image record into Dynamo DB
    #[error("Failed to insert image record into DynamoDB: {0}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to get image record from Dynamo DB
    #[error("Failed to get image record from DynamoDB: {0}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Failed to query image records from Dynamo DB
    #[error("Failed to query image records from DynamoDB: {0}")]
    DynamoDbQueryError(#[from] SdkError<QueryError>),

    /// Serialization error for `serde_dynamo`
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Store rejected the operation for another reason
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}
