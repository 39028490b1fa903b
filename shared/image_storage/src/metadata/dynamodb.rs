use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{types::AttributeValue, Client as DynamoDbClient};

use super::{
    ImageRecord, ImageRecordAttribute, MetadataStore, MetadataStoreError, MetadataStoreResult,
};

/// Image metadata store client for Dynamo DB operations
pub struct DynamoMetadataStore {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl DynamoMetadataStore {
    /// Creates a new image metadata store client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name for image records
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }

    fn parse_item(item: HashMap<String, AttributeValue>) -> MetadataStoreResult<ImageRecord> {
        serde_dynamo::from_item(item)
            .map_err(|e| MetadataStoreError::SerializationError(e.to_string()))
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn put(&self, record: &ImageRecord) -> MetadataStoreResult<()> {
        // Convert to DynamoDB item
        let item = serde_dynamo::to_item(record)
            .map_err(|e| MetadataStoreError::SerializationError(e.to_string()))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await?;

        Ok(())
    }

    async fn get(
        &self,
        image_key: &str,
        timestamp: &str,
    ) -> MetadataStoreResult<Option<ImageRecord>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                ImageRecordAttribute::ImageKey.to_string(),
                AttributeValue::S(image_key.to_string()),
            )
            .key(
                ImageRecordAttribute::Timestamp.to_string(),
                AttributeValue::S(timestamp.to_string()),
            )
            .consistent_read(true)
            .send()
            .await?;

        response.item().cloned().map(Self::parse_item).transpose()
    }

    async fn list_for_image(&self, image_key: &str) -> MetadataStoreResult<Vec<ImageRecord>> {
        let mut records = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", ImageRecordAttribute::ImageKey.to_string())
                .expression_attribute_values(":pk", AttributeValue::S(image_key.to_string()))
                .scan_index_forward(true)
                .set_exclusive_start_key(exclusive_start_key)
                .send()
                .await?;

            for item in response.items() {
                records.push(Self::parse_item(item.clone())?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }
}
