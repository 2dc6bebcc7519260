//! Client-side data access for the ONO app-data store.
//! - `transport` speaks the two remote operations (fetch blob, overwrite blob).
//! - `store` layers the load/update/save cycle and occupancy polling on top.
//! - `runtime` wires both collections from configuration.

pub mod errors;
pub mod retry;
pub mod transport;
pub mod store;
pub mod runtime;

pub use errors::StoreError;
pub use store::RemoteCollectionStore;
