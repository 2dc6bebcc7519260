//! Build the notes and groups stores from `configs::AppConfig`.

use std::sync::Arc;

use configs::AppConfig;
use models::{CollectionKey, Group, Note, Operator};
use tracing::info;

use crate::errors::StoreError;
use crate::retry::RetryPolicy;
use crate::store::RemoteCollectionStore;
use crate::transport::{HttpOnoTransport, OnoTransport};

/// Both collections of one application, sharing a transport.
#[derive(Clone)]
pub struct Stores {
    pub notes: RemoteCollectionStore<Note>,
    pub groups: RemoteCollectionStore<Group>,
}

impl Stores {
    /// Stores over an HTTP transport configured from `cfg.ono`.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, StoreError> {
        let transport = Arc::new(HttpOnoTransport::from_config(&cfg.ono)?);
        info!(
            base_url = transport.base_url(),
            app_code = %cfg.ono.app_code,
            notes = %cfg.ono.notes_data_name,
            groups = %cfg.ono.groups_data_name,
            "ONO transport ready"
        );
        Ok(Self::with_transport(transport, cfg))
    }

    /// Stores over any transport; used by tests with the mock.
    pub fn with_transport(transport: Arc<dyn OnoTransport>, cfg: &AppConfig) -> Self {
        let retry = RetryPolicy::from_config(&cfg.retry);
        let operator = Operator::new(cfg.operator.name.clone(), cfg.operator.surname.clone());
        let notes_key = CollectionKey::new(cfg.ono.app_code.clone(), cfg.ono.notes_data_name.clone());
        let groups_key = CollectionKey::new(cfg.ono.app_code.clone(), cfg.ono.groups_data_name.clone());

        Self {
            notes: RemoteCollectionStore::new(Arc::clone(&transport), notes_key, retry.clone(), operator.clone()),
            groups: RemoteCollectionStore::new(transport, groups_key, retry, operator),
        }
    }
}
