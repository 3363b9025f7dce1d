//! [`TableStore`] over `aws_sdk_dynamodb::Client`.
//!
//! Client construction (region, credentials, endpoint) is left to the
//! caller.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{
    self as sdk, AttributeDefinition, DeleteRequest, KeySchemaElement, KeyType, KeysAndAttributes,
    ProvisionedThroughput, ScalarAttributeType, TableStatus, WriteRequest,
};
use fabryk_acl::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;

use super::{
    AttributeValue, BUCKET_ATTRIBUTE, BatchDeleteRequest, BatchGetRequest, BatchGetResponse,
    CreateTableOutcome, Item, ItemKey, KEY_ATTRIBUTE, KeySchema, TRUE_PLACEHOLDER, TableSpec,
    TableStore, UpdateAction, UpdateRequest,
};

/// Maximum keys per BatchGetItem call.
const BATCH_READ_SIZE: usize = 100;

/// Maximum requests per BatchWriteItem call.
const BATCH_WRITE_SIZE: usize = 25;

const ACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const ACTIVE_POLL_LIMIT: u32 = 120;

/// Service error codes worth retrying.
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "InternalServerError",
    "ServiceUnavailable",
];

type SdkItem = HashMap<String, sdk::AttributeValue>;

/// DynamoDB-backed [`TableStore`].
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    /// Wrap a configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn wait_until_active(&self, table: &str) -> Result<()> {
        for _ in 0..ACTIVE_POLL_LIMIT {
            let output = self
                .client
                .describe_table()
                .table_name(table)
                .send()
                .await
                .map_err(|e| {
                    table_error(
                        "describe-table",
                        table,
                        e,
                        DescribeTableError::is_resource_not_found_exception,
                    )
                })?;
            let status = output.table.and_then(|t| t.table_status);
            if is_ready(table, status.as_ref())? {
                return Ok(());
            }
            log::debug!("Waiting for table '{table}' to become active ({status:?})");
            tokio::time::sleep(ACTIVE_POLL_INTERVAL).await;
        }
        Err(Error::transient(
            "describe-table",
            format!("table '{table}' did not become active"),
        ))
    }
}

/// `true` once the table is ACTIVE; a table being deleted never will be.
fn is_ready(table: &str, status: Option<&TableStatus>) -> Result<bool> {
    match status {
        Some(TableStatus::Active) => Ok(true),
        Some(TableStatus::Deleting) => Err(Error::store(
            "create-table",
            format!("table '{table}' is being deleted"),
        )),
        _ => Ok(false),
    }
}

fn is_transient<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(service) => service
            .err()
            .code()
            .is_some_and(|code| TRANSIENT_ERROR_CODES.contains(&code)),
        _ => false,
    }
}

fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    if is_transient(&err) {
        Error::transient_with_source(operation, message, err)
    } else {
        Error::store_with_source(operation, message, err)
    }
}

/// `TableNotFound` when the service says the table is missing, `Store` otherwise.
fn table_error<E, R>(
    operation: &'static str,
    table: &str,
    err: SdkError<E, R>,
    is_not_found: fn(&E) -> bool,
) -> Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    if err.as_service_error().is_some_and(is_not_found) {
        Error::table_not_found(table)
    } else {
        sdk_error(operation, err)
    }
}

fn build_error(operation: &'static str, err: BuildError) -> Error {
    Error::store_with_source(operation, err.to_string(), err)
}

fn to_sdk_item(key: &ItemKey) -> SdkItem {
    key.to_attributes()
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                AttributeValue::S(s) => sdk::AttributeValue::S(s),
                AttributeValue::Bool(b) => sdk::AttributeValue::Bool(b),
            };
            (name, value)
        })
        .collect()
}

fn from_sdk_item(item: SdkItem) -> Item {
    item.into_iter()
        .map(|(name, value)| {
            let value = match value {
                sdk::AttributeValue::S(s) => AttributeValue::S(s),
                sdk::AttributeValue::Bool(b) => AttributeValue::Bool(b),
                // Only presence matters for field attributes.
                _ => AttributeValue::Bool(true),
            };
            (name, value)
        })
        .collect()
}

fn key_from_sdk_item(item: SdkItem) -> Option<ItemKey> {
    ItemKey::from_attributes(&from_sdk_item(item))
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| build_error("create-table", e))
}

fn string_attribute(name: &str) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| build_error("create-table", e))
}

#[async_trait]
impl TableStore for DynamoDbStore {
    async fn get_item(&self, table: &str, key: &ItemKey) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_sdk_item(key)))
            .send()
            .await
            .map_err(|e| {
                table_error("get-item", table, e, GetItemError::is_resource_not_found_exception)
            })?;
        Ok(output.item.map(from_sdk_item))
    }

    async fn batch_get_item(&self, request: BatchGetRequest) -> Result<BatchGetResponse> {
        let table = request.table.as_str();
        let mut response = BatchGetResponse::default();

        for chunk in request.keys.chunks(BATCH_READ_SIZE) {
            let keys = KeysAndAttributes::builder()
                .set_keys(Some(chunk.iter().map(to_sdk_item).collect()))
                .build()
                .map_err(|e| build_error("batch-get-item", e))?;
            let output = self
                .client
                .batch_get_item()
                .request_items(table, keys)
                .send()
                .await
                .map_err(|e| {
                    table_error(
                        "batch-get-item",
                        table,
                        e,
                        BatchGetItemError::is_resource_not_found_exception,
                    )
                })?;

            if let Some(responses) = output.responses {
                for items in responses.into_values() {
                    response.items.extend(items.into_iter().map(from_sdk_item));
                }
            }
            if let Some(unprocessed) = output.unprocessed_keys {
                for keys_attrs in unprocessed.into_values() {
                    response
                        .unprocessed
                        .extend(keys_attrs.keys.into_iter().filter_map(key_from_sdk_item));
                }
            }
        }

        Ok(response)
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<()> {
        let table = request.table.as_str();
        let mut builder = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_sdk_item(&request.key)))
            .update_expression(request.update.expression());
        for (placeholder, field) in request.update.attribute_names() {
            builder = builder.expression_attribute_names(placeholder, field);
        }
        if let UpdateAction::SetTrue = request.update.action() {
            builder = builder
                .expression_attribute_values(TRUE_PLACEHOLDER, sdk::AttributeValue::Bool(true));
        }

        builder.send().await.map_err(|e| {
            table_error(
                "update-item",
                table,
                e,
                UpdateItemError::is_resource_not_found_exception,
            )
        })?;
        Ok(())
    }

    async fn batch_delete_item(&self, request: BatchDeleteRequest) -> Result<Vec<ItemKey>> {
        let table = request.table.as_str();
        let mut unprocessed = Vec::new();

        for chunk in request.keys.chunks(BATCH_WRITE_SIZE) {
            let writes = chunk
                .iter()
                .map(|key| {
                    let delete = DeleteRequest::builder()
                        .set_key(Some(to_sdk_item(key)))
                        .build()
                        .map_err(|e| build_error("batch-write-item", e))?;
                    Ok(WriteRequest::builder().delete_request(delete).build())
                })
                .collect::<Result<Vec<_>>>()?;
            let output = self
                .client
                .batch_write_item()
                .request_items(table, writes)
                .send()
                .await
                .map_err(|e| {
                    table_error(
                        "batch-write-item",
                        table,
                        e,
                        BatchWriteItemError::is_resource_not_found_exception,
                    )
                })?;

            if let Some(items) = output.unprocessed_items {
                unprocessed.extend(
                    items
                        .into_values()
                        .flatten()
                        .filter_map(|write| write.delete_request)
                        .filter_map(|delete| key_from_sdk_item(delete.key)),
                );
            }
        }

        Ok(unprocessed)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<CreateTableOutcome> {
        let mut builder = self
            .client
            .create_table()
            .table_name(&spec.name)
            .attribute_definitions(string_attribute(KEY_ATTRIBUTE)?)
            .key_schema(key_element(KEY_ATTRIBUTE, KeyType::Hash)?)
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(spec.read_capacity_units)
                    .write_capacity_units(spec.write_capacity_units)
                    .build()
                    .map_err(|e| build_error("create-table", e))?,
            );
        if spec.key_schema == KeySchema::Composite {
            builder = builder
                .attribute_definitions(string_attribute(BUCKET_ATTRIBUTE)?)
                .key_schema(key_element(BUCKET_ATTRIBUTE, KeyType::Range)?);
        }

        match builder.send().await {
            Ok(_) => {
                self.wait_until_active(&spec.name).await?;
                Ok(CreateTableOutcome::Created)
            }
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_in_use_exception()) =>
            {
                log::debug!("Table '{}' already exists", spec.name);
                self.wait_until_active(&spec.name).await?;
                Ok(CreateTableOutcome::AlreadyExists)
            }
            Err(e) => Err(sdk_error("create-table", e)),
        }
    }

    async fn delete_table(&self, table: &str) -> Result<()> {
        self.client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| {
                table_error(
                    "delete-table",
                    table,
                    e,
                    DeleteTableError::is_resource_not_found_exception,
                )
            })?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(|e| sdk_error("list-tables", e))?;
            names.extend(output.table_names.unwrap_or_default());
            match output.last_evaluated_table_name {
                Some(last) => start = Some(last),
                None => break,
            }
        }
        Ok(names)
    }

    fn name(&self) -> &str {
        "dynamodb"
    }
}
