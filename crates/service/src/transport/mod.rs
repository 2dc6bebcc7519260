//! Access to the remote ONO app-data store.
//!
//! The store only needs two generic operations: fetch a blob and overwrite
//! a blob. `HttpOnoTransport` talks to the real endpoint; `mock` is an
//! in-memory stand-in for tests and examples.

use async_trait::async_trait;
use models::CollectionKey;

use crate::errors::StoreError;

pub mod http;
pub mod mock;

pub use http::HttpOnoTransport;

pub const GET_ACTION: &str = "GetONOAppDataFromCode";
pub const SET_ACTION: &str = "SetONOAppData";

#[async_trait]
pub trait OnoTransport: Send + Sync {
    /// Raw `data` string stored under `key`, `None` when the service has none.
    async fn get_app_data(&self, key: &CollectionKey) -> Result<Option<String>, StoreError>;

    /// Overwrite the blob stored under `key`.
    async fn set_app_data(&self, key: &CollectionKey, data_value: String) -> Result<(), StoreError>;
}
