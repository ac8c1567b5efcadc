//! Fan-out and aggregation over provider requests.
//!
//! [`Dispatcher::keys`] is fail-fast: the first failing request aborts the call
//! and any keys gathered so far are dropped. [`Dispatcher::inventory`] is the
//! best-effort alternative that runs every request and reports failures per
//! request.

use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::registry::Registry;
use crate::error::{KeysError, Result};
use crate::models::key::{Key, NewKey};
use crate::models::provider::Provider;

/// How requests are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    /// One request at a time, in the order given.
    #[default]
    Sequential,
    /// One thread per request. In fail-fast mode the first error to
    /// complete wins.
    Concurrent,
}

/// A request that failed during a best-effort inventory.
#[derive(Debug)]
pub struct RequestFailure {
    pub provider: Provider,
    pub error: KeysError,
}

/// Result of a best-effort inventory.
#[derive(Debug, Default)]
pub struct Inventory {
    pub keys: Vec<Key>,
    pub failures: Vec<RequestFailure>,
}

impl Inventory {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type Outcome = (usize, Result<Vec<Key>>);

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    fan_out: FanOut,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            fan_out: FanOut::default(),
        }
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Keys for every request, merged in request order.
    pub fn keys(&self, requests: &[Provider], include_inactive: bool) -> Result<Vec<Key>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for (index, outcome) in self.join(requests, include_inactive, true) {
            outcomes.push((index, outcome?));
        }
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().flat_map(|(_, keys)| keys).collect())
    }

    /// Keys for every request that succeeded, plus one failure per request
    /// that did not.
    pub fn inventory(&self, requests: &[Provider], include_inactive: bool) -> Inventory {
        let mut outcomes = self.join(requests, include_inactive, false);
        outcomes.sort_by_key(|(index, _)| *index);

        let mut inventory = Inventory::default();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(keys) => inventory.keys.extend(keys),
                Err(error) => {
                    warn!(request = %requests[index], error = %error, "provider request failed");
                    inventory.failures.push(RequestFailure {
                        provider: requests[index].clone(),
                        error,
                    });
                }
            }
        }
        inventory
    }

    /// Create a new credential alongside `key`, on the same account.
    pub fn create_key(&self, key: &Key) -> Result<NewKey> {
        self.create_key_from_scratch(&key.provider, &key.full_account)
    }

    /// Create a new credential for `account` without an existing [`Key`].
    pub fn create_key_from_scratch(&self, provider: &Provider, account: &str) -> Result<NewKey> {
        let adapter = self
            .registry
            .resolve(&provider.provider)
            .map_err(|e| in_request(provider, e))?;
        let created = adapter
            .create_key(&provider.scope, account, &provider.credential)
            .map_err(|e| in_request(provider, e))?;
        info!(request = %provider, account, key_id = %created.id, "created key");
        Ok(created)
    }

    /// Revoke the credential `key` describes.
    pub fn delete_key(&self, key: &Key) -> Result<()> {
        self.delete_key_by_id(&key.provider, &key.full_account, &key.id)
    }

    /// Revoke a credential addressed by its `full_account` and id.
    pub fn delete_key_by_id(&self, provider: &Provider, full_account: &str, key_id: &str) -> Result<()> {
        let adapter = self
            .registry
            .resolve(&provider.provider)
            .map_err(|e| in_request(provider, e))?;
        adapter
            .delete_key(&provider.scope, full_account, key_id, &provider.credential)
            .map_err(|e| in_request(provider, e))?;
        info!(request = %provider, account = full_account, key_id, "deleted key");
        Ok(())
    }

    fn list(&self, request: &Provider, include_inactive: bool) -> Result<Vec<Key>> {
        debug!(request = %request, include_inactive, "listing keys");
        let adapter = self
            .registry
            .resolve(&request.provider)
            .map_err(|e| in_request(request, e))?;
        let keys = adapter
            .keys(&request.scope, include_inactive, &request.credential)
            .map_err(|e| in_request(request, e))?;
        debug!(request = %request, count = keys.len(), "listed keys");
        Ok(keys)
    }

    /// Run one list task per request and collect outcomes in completion
    /// order. With `fail_fast`, collection stops at the first error.
    fn join(&self, requests: &[Provider], include_inactive: bool, fail_fast: bool) -> Vec<Outcome> {
        match self.fan_out {
            FanOut::Sequential => {
                let mut outcomes = Vec::with_capacity(requests.len());
                for (index, request) in requests.iter().enumerate() {
                    let outcome = self.list(request, include_inactive);
                    let failed = outcome.is_err();
                    outcomes.push((index, outcome));
                    if failed && fail_fast {
                        break;
                    }
                }
                outcomes
            }
            FanOut::Concurrent => thread::scope(|scope| {
                let (tx, rx) = mpsc::channel();
                for (index, request) in requests.iter().enumerate() {
                    let tx = tx.clone();
                    scope.spawn(move || {
                        // receiver is gone once fail-fast has seen an error
                        let _ = tx.send((index, self.list(request, include_inactive)));
                    });
                }
                drop(tx);

                let mut outcomes = Vec::with_capacity(requests.len());
                for (index, outcome) in rx {
                    let failed = outcome.is_err();
                    outcomes.push((index, outcome));
                    if failed && fail_fast {
                        break;
                    }
                }
                outcomes
            }),
        }
    }
}

fn in_request(request: &Provider, error: KeysError) -> KeysError {
    match error {
        KeysError::Request { .. } => error,
        source => KeysError::Request {
            provider: request.provider.clone(),
            scope: request.scope.clone(),
            source: Box::new(source),
        },
    }
}
