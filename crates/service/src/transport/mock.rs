//! In-memory transport for tests and doc examples.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use models::CollectionKey;

use super::{OnoTransport, GET_ACTION, SET_ACTION};
use crate::errors::StoreError;

/// One observed call, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(CollectionKey),
    Set { key: CollectionKey, data_value: String },
}

/// Scripted answer for the next `get_app_data`.
#[derive(Debug, Clone)]
pub enum Scripted {
    Data(Option<String>),
    Fail(String),
}

/// Blob map with optional scripted reads and injected write failures.
///
/// Reads pop the script queue first and fall back to the stored blob.
/// Successful writes update the stored blob.
#[derive(Default)]
pub struct MockOnoTransport {
    blobs: Mutex<HashMap<CollectionKey, String>>,
    script: Mutex<VecDeque<Scripted>>,
    set_failures: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Call>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockOnoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, key: &CollectionKey, data: impl Into<String>) -> Self {
        lock(&self.blobs).insert(key.clone(), data.into());
        self
    }

    pub fn push_get(&self, answer: Scripted) {
        lock(&self.script).push_back(answer);
    }

    pub fn fail_next_set(&self, message: impl Into<String>) {
        lock(&self.set_failures).push_back(message.into());
    }

    pub fn blob(&self, key: &CollectionKey) -> Option<String> {
        lock(&self.blobs).get(key).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Data values written so far, oldest first.
    pub fn writes(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                Call::Set { data_value, .. } => Some(data_value.clone()),
                Call::Get(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl OnoTransport for MockOnoTransport {
    async fn get_app_data(&self, key: &CollectionKey) -> Result<Option<String>, StoreError> {
        lock(&self.calls).push(Call::Get(key.clone()));
        let next = lock(&self.script).pop_front();
        match next {
            Some(Scripted::Data(data)) => Ok(data),
            Some(Scripted::Fail(message)) => Err(StoreError::Transport { action: GET_ACTION, message }),
            None => Ok(lock(&self.blobs).get(key).cloned()),
        }
    }

    async fn set_app_data(&self, key: &CollectionKey, data_value: String) -> Result<(), StoreError> {
        lock(&self.calls).push(Call::Set { key: key.clone(), data_value: data_value.clone() });
        if let Some(message) = lock(&self.set_failures).pop_front() {
            return Err(StoreError::Transport { action: SET_ACTION, message });
        }
        lock(&self.blobs).insert(key.clone(), data_value);
        Ok(())
    }
}
