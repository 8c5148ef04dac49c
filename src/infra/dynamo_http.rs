use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::app::ports::QueryPort;
use crate::config::StoreConfig;
use crate::constants::{DATA_FIELD, PARTITION_KEY, TIMESTAMP_FIELD};
use crate::error::{BenchError, Result};
use crate::types::{ContinuationToken, QueryPage, QueryRequest, RawRecord};

const QUERY_TARGET: &str = "DynamoDB_20120810.Query";
const AMZ_JSON: &str = "application/x-amz-json-1.0";
const PARTITION_PLACEHOLDER: &str = ":benchmarkValue";

/// Record store spoken to over the DynamoDB JSON protocol.
///
/// Requests are not SigV4-signed, so there is no default AWS endpoint:
/// `endpoint` must be a signing proxy or a local emulator, optionally
/// guarded by a bearer token.
pub struct DynamoHttpStore {
    client: Client,
    endpoint: String,
    table: String,
    index: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Items", default)]
    items: Vec<Map<String, Value>>,
    #[serde(rename = "LastEvaluatedKey")]
    last_evaluated_key: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

impl DynamoHttpStore {
    pub fn new(config: &StoreConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint_url()?.to_string(),
            table: config.table.clone(),
            index: config.index.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn query_body(&self, request: &QueryRequest) -> Value {
        build_query_body(&self.table, &self.index, request)
    }
}

pub(crate) fn build_query_body(table: &str, index: &str, request: &QueryRequest) -> Value {
    let mut body = json!({
        "TableName": table,
        "IndexName": index,
        "KeyConditionExpression": format!("{} = {}", PARTITION_KEY, PARTITION_PLACEHOLDER),
        "ExpressionAttributeValues": {
            PARTITION_PLACEHOLDER: { "S": request.partition_value }
        },
    });
    if let Some(token) = &request.start {
        body["ExclusiveStartKey"] = token.clone().into_store_key();
    }
    body
}

pub(crate) fn parse_query_response(bytes: &[u8]) -> Result<QueryPage> {
    let response: QueryResponse = serde_json::from_slice(bytes)?;
    let items = response
        .items
        .iter()
        .map(decode_item)
        .collect::<Result<Vec<_>>>()?;
    Ok(QueryPage {
        items,
        next: response.last_evaluated_key.map(ContinuationToken::from_store_key),
    })
}

/// `{"timestamp": {"N": "..."}, "data": {"S": "..."}}` → RawRecord
fn decode_item(item: &Map<String, Value>) -> Result<RawRecord> {
    let timestamp = typed_attr(item, TIMESTAMP_FIELD, "N")?;
    let timestamp = timestamp.parse::<i64>().map_err(|_| {
        BenchError::invalid(TIMESTAMP_FIELD, format!("not an integer: {}", timestamp))
    })?;
    let data = typed_attr(item, DATA_FIELD, "S")?;
    Ok(RawRecord::new(timestamp, data))
}

fn typed_attr<'a>(item: &'a Map<String, Value>, name: &str, kind: &str) -> Result<&'a str> {
    let attr = item
        .get(name)
        .ok_or_else(|| BenchError::MissingField(name.to_string()))?;
    attr.get(kind)
        .and_then(Value::as_str)
        .ok_or_else(|| BenchError::invalid(name, format!("expected a {} attribute", kind)))
}

fn api_error(status: u16, bytes: &[u8]) -> BenchError {
    let message = match serde_json::from_slice::<ErrorResponse>(bytes) {
        Ok(err) if !err.kind.is_empty() => {
            let kind = err.kind.rsplit('#').next().unwrap_or(&err.kind);
            format!("{}: {}", kind, err.message)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    BenchError::Api { status, message }
}

impl QueryPort for DynamoHttpStore {
    fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        debug!(
            table = %self.table,
            index = %self.index,
            resumed = request.start.is_some(),
            "querying record store"
        );
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, AMZ_JSON)
            .header("X-Amz-Target", QUERY_TARGET)
            .body(self.query_body(request).to_string());
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let resp = builder.send()?;
        let status = resp.status();
        let bytes = resp.bytes()?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }
        parse_query_response(&bytes)
    }
}
