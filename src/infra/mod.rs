//! HTTP adapters for the record store and object storage ports.

pub mod dynamo_http;
pub mod object_store_http;

pub use dynamo_http::DynamoHttpStore;
pub use object_store_http::SupabaseObjectStore;
