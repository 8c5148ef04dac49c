use crate::error::Result;
use crate::types::{ListCursor, ObjectPage, QueryPage, QueryRequest};

/// Range queries against the record store's partitioned, sorted index
pub trait QueryPort {
    fn query(&self, request: &QueryRequest) -> Result<QueryPage>;
}

/// Object storage: paged listing under a prefix and whole-object fetch
pub trait ObjectStorePort {
    fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: ListCursor,
    ) -> Result<ObjectPage>;

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

impl<T: QueryPort + ?Sized> QueryPort for &T {
    fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        (**self).query(request)
    }
}

impl<T: ObjectStorePort + ?Sized> ObjectStorePort for &T {
    fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: ListCursor,
    ) -> Result<ObjectPage> {
        (**self).list_page(bucket, prefix, cursor)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        (**self).get_object(bucket, key)
    }
}

impl<T: QueryPort + ?Sized> QueryPort for Box<T> {
    fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        (**self).query(request)
    }
}

impl<T: ObjectStorePort + ?Sized> ObjectStorePort for Box<T> {
    fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        cursor: ListCursor,
    ) -> Result<ObjectPage> {
        (**self).list_page(bucket, prefix, cursor)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        (**self).get_object(bucket, key)
    }
}
