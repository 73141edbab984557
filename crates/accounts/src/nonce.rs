//! Client-side nonce tracking.
//!
//! Bundlers and nodes can lag behind operations this process has already
//! submitted. [`NonceManager`] remembers the last nonce it handed out per
//! `(address, chain)` and never returns a value at or below it, whatever the
//! backing [`NonceSource`] reports.

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use mw_abi::AbiValue;
use mw_rpc::{BlockTag, PublicClient, public::CallRequest};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    contracts::{GET_NONCE, function},
    error::{AccountError, Result},
};

/// Identifies one nonce sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonceParams {
    /// Smart account address.
    pub address: Address,
    /// Chain the account lives on.
    pub chain_id: u64,
    /// EntryPoint nonce key (`uint192`).
    pub key: U256,
}

impl NonceParams {
    /// The default sequence, key zero.
    pub const fn new(address: Address, chain_id: u64) -> Self {
        Self { address, chain_id, key: U256::ZERO }
    }

    /// Selects the sequence for `key`.
    pub const fn with_key(mut self, key: U256) -> Self {
        self.key = key;
        self
    }

    fn cache_key(&self) -> String {
        if self.key.is_zero() {
            format!("{}.{}", self.address, self.chain_id)
        } else {
            format!("{}.{}.{}", self.address, self.chain_id, self.key)
        }
    }
}

/// Where the authoritative nonce comes from.
#[async_trait]
pub trait NonceSource: Send + Sync + Debug {
    /// Current nonce of the sequence as the source sees it.
    async fn get(&self, params: &NonceParams) -> Result<U256>;

    /// Told about every nonce handed out. Failures are the source's own business.
    async fn set(&self, _params: &NonceParams, _nonce: U256) {}
}

/// Reads `EntryPoint.getNonce(sender, key)` with `eth_call`.
#[derive(Debug, Clone)]
pub struct EntryPointNonceSource {
    client: PublicClient,
    entry_point: Address,
}

impl EntryPointNonceSource {
    /// Reads nonces from the EntryPoint deployed at `entry_point`.
    pub const fn new(client: PublicClient, entry_point: Address) -> Self {
        Self { client, entry_point }
    }
}

#[async_trait]
impl NonceSource for EntryPointNonceSource {
    async fn get(&self, params: &NonceParams) -> Result<U256> {
        let get_nonce = function(GET_NONCE)?;
        let data =
            get_nonce.encode_input(&[AbiValue::from(params.address), AbiValue::Uint(params.key)])?;
        let request = CallRequest { from: None, to: self.entry_point, data: data.into() };
        let output = self.client.call(&request, BlockTag::Latest).await?;
        get_nonce
            .decode_output(&output)?
            .first()
            .and_then(AbiValue::as_uint)
            .ok_or_else(|| AccountError::InvalidReturnData {
                function: "getNonce",
                reason: "expected a uint256".into(),
            })
    }
}

#[derive(Debug, Default)]
struct NonceState {
    /// Last nonce returned by `consume`.
    previous: Option<U256>,
    /// `consume` calls waiting on the source.
    delta: u64,
}

impl NonceState {
    fn resolve(&self, fetched: U256) -> U256 {
        match self.previous {
            Some(previous) if fetched <= previous => previous.saturating_add(U256::from(1)),
            _ => fetched,
        }
    }
}

/// Hands out strictly increasing nonces per `(address, chain, key)`.
#[derive(Debug)]
pub struct NonceManager {
    source: Arc<dyn NonceSource>,
    state: Mutex<HashMap<String, NonceState>>,
}

impl NonceManager {
    /// A manager with no history, backed by `source`.
    pub fn new(source: Arc<dyn NonceSource>) -> Self {
        Self { source, state: Mutex::new(HashMap::new()) }
    }

    /// The nonce the next `consume` would return, counting calls still in flight.
    pub async fn get(&self, params: &NonceParams) -> Result<U256> {
        let fetched = self.source.get(params).await?;
        let mut state = self.state.lock().await;
        let entry = state.entry(params.cache_key()).or_default();
        Ok(entry.resolve(fetched).saturating_add(U256::from(entry.delta)))
    }

    /// Reserves and returns the next nonce.
    pub async fn consume(&self, params: &NonceParams) -> Result<U256> {
        let key = params.cache_key();
        self.state.lock().await.entry(key.clone()).or_default().delta += 1;

        let fetched = self.source.get(params).await;

        let nonce = {
            let mut state = self.state.lock().await;
            let entry = state.entry(key).or_default();
            entry.delta = entry.delta.saturating_sub(1);
            let nonce = entry.resolve(fetched?);
            entry.previous = Some(nonce);
            nonce
        };
        debug!(
            message = "nonce consumed",
            address = %params.address,
            chain_id = params.chain_id,
            nonce = %nonce
        );

        self.source.set(params, nonce).await;
        Ok(nonce)
    }

    /// Hands back `nonce` from a [`Self::consume`] that will never be submitted.
    ///
    /// Only the latest reservation can be released; once a later nonce has been
    /// handed out this is a no-op.
    pub async fn release(&self, params: &NonceParams, nonce: U256) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.get_mut(&params.cache_key()) else {
            return;
        };
        if entry.previous == Some(nonce) {
            entry.previous = nonce.checked_sub(U256::from(1));
            debug!(
                message = "nonce released",
                address = %params.address,
                chain_id = params.chain_id,
                nonce = %nonce
            );
        }
    }

    /// Forgets everything known about `params`.
    pub async fn reset(&self, params: &NonceParams) {
        self.state.lock().await.remove(&params.cache_key());
    }
}
