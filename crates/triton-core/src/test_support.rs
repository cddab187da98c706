//! Hand-written port mocks shared by the unit tests.
//!
//! `None` in a `MockLedger` field means "this read fails"; every read bumps
//! the call counter so tests can assert that validation happens before any
//! RPC traffic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{Address, ChatId, ServiceId, TxHash},
    ports::{LedgerReader, Messenger, MetadataStore, WalletManager},
    Error, Result,
};

#[derive(Default)]
pub struct MockLedger {
    pub reads: AtomicUsize,
    pub native_balance: Option<u128>,
    /// Per-(token, holder) overrides; `None` inside means "this read fails".
    pub token_balances: std::collections::HashMap<(String, String), Option<u128>>,
    pub token_balance: Option<u128>,
    pub token_decimals: Option<u8>,
    pub activity_checker: Option<String>,
    pub accrued_rewards: Option<u128>,
    pub checkpoint_nonces: Option<Vec<u64>>,
    pub liveness_ratio: Option<u128>,
    pub liveness_period: Option<u64>,
    pub ts_checkpoint: Option<u64>,
    pub metadata_hash: Option<String>,
    pub service_ids: Option<Vec<u64>>,
    pub marketplace_mech: Option<String>,
    pub agent_mech: Option<String>,
    pub requests_count_legacy: Option<u64>,
    pub requests_count: Option<u64>,
}

impl MockLedger {
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read<T: Clone>(&self, field: &Option<T>, what: &str) -> Result<T> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        field
            .clone()
            .ok_or_else(|| Error::Ledger(format!("mock: {what} unavailable")))
    }

    fn read_address(&self, field: &Option<String>, what: &str) -> Result<Address> {
        Address::new(self.read(field, what)?)
    }
}

#[async_trait]
impl LedgerReader for MockLedger {
    async fn native_balance(&self, _address: &Address) -> Result<u128> {
        self.read(&self.native_balance, "native balance")
    }

    async fn token_balance(&self, token: &Address, holder: &Address) -> Result<u128> {
        let key = (token.as_str().to_string(), holder.as_str().to_string());
        match self.token_balances.get(&key) {
            Some(entry) => self.read(entry, "token balance"),
            None => self.read(&self.token_balance, "token balance"),
        }
    }

    async fn token_decimals(&self, _token: &Address) -> Result<u8> {
        self.read(&self.token_decimals, "token decimals")
    }

    async fn activity_checker(&self, _staking_contract: &Address) -> Result<Address> {
        self.read_address(&self.activity_checker, "activity checker")
    }

    async fn accrued_rewards(
        &self,
        _staking_contract: &Address,
        _service_id: ServiceId,
    ) -> Result<u128> {
        self.read(&self.accrued_rewards, "accrued rewards")
    }

    async fn checkpoint_nonces(
        &self,
        _staking_contract: &Address,
        _service_id: ServiceId,
    ) -> Result<Vec<u64>> {
        self.read(&self.checkpoint_nonces, "checkpoint nonces")
    }

    async fn liveness_ratio(&self, _activity_checker: &Address) -> Result<u128> {
        self.read(&self.liveness_ratio, "liveness ratio")
    }

    async fn liveness_period(&self, _staking_contract: &Address) -> Result<u64> {
        self.read(&self.liveness_period, "liveness period")
    }

    async fn ts_checkpoint(&self, _staking_contract: &Address) -> Result<u64> {
        self.read(&self.ts_checkpoint, "checkpoint timestamp")
    }

    async fn metadata_hash(&self, _staking_contract: &Address) -> Result<String> {
        self.read(&self.metadata_hash, "metadata hash")
    }

    async fn service_ids(&self, _staking_contract: &Address) -> Result<Vec<u64>> {
        self.read(&self.service_ids, "service ids")
    }

    async fn marketplace_mech(&self, _activity_checker: &Address) -> Result<Address> {
        self.read_address(&self.marketplace_mech, "marketplace mech")
    }

    async fn agent_mech(&self, _activity_checker: &Address) -> Result<Address> {
        self.read_address(&self.agent_mech, "agent mech")
    }

    async fn requests_count_legacy(&self, _mech: &Address, _requester: &Address) -> Result<u64> {
        self.read(&self.requests_count_legacy, "legacy request count")
    }

    async fn requests_count(&self, _mech: &Address, _requester: &Address) -> Result<u64> {
        self.read(&self.requests_count, "request count")
    }
}

pub struct MockMetadataStore {
    value: Option<serde_json::Value>,
    status: u16,
}

impl MockMetadataStore {
    pub fn with_value(value: serde_json::Value) -> Self {
        Self {
            value: Some(value),
            status: 200,
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            value: None,
            status,
        }
    }
}

#[async_trait]
impl MetadataStore for MockMetadataStore {
    async fn fetch(&self, metadata_hash: &str) -> Result<serde_json::Value> {
        match &self.value {
            Some(v) => Ok(v.clone()),
            None => Err(Error::MetadataFetch {
                address: format!("https://metadata.test/{metadata_hash}"),
                reason: self.status.to_string(),
            }),
        }
    }
}

/// Wallet mock: `None` transfer/claim fields mean "this operation fails".
#[derive(Default)]
pub struct MockWallet {
    pub master_eoa: Option<String>,
    pub master_safe: Option<String>,
    pub staking_program: Option<String>,
    pub claimed_wei: Option<u128>,
    pub master_transfer_tx: Option<String>,
    pub safe_transfer_tx: Option<String>,
    pub master_transfers: AtomicUsize,
    pub safe_transfers: AtomicUsize,
}

#[async_trait]
impl WalletManager for MockWallet {
    fn master_eoa(&self) -> Address {
        Address::new(
            self.master_eoa
                .as_deref()
                .unwrap_or("0x00000000000000000000000000000000000000e0"),
        )
        .expect("well-formed mock address")
    }

    fn master_safe(&self, _chain: &str) -> Option<Address> {
        self.master_safe
            .as_deref()
            .map(|s| Address::new(s).expect("well-formed mock address"))
    }

    async fn current_staking_program(&self, _service_config_id: &str) -> Result<String> {
        self.staking_program
            .clone()
            .ok_or_else(|| Error::Wallet("mock: no staking program".to_string()))
    }

    async fn claim_rewards(&self, _service_config_id: &str) -> Result<u128> {
        self.claimed_wei
            .ok_or_else(|| Error::Wallet("mock: claim failed".to_string()))
    }

    async fn transfer_from_master_safe(
        &self,
        _chain: &str,
        _to: &Address,
        _asset: &Address,
        _amount_wei: u128,
    ) -> Result<TxHash> {
        self.master_transfers.fetch_add(1, Ordering::SeqCst);
        self.master_transfer_tx
            .clone()
            .map(TxHash)
            .ok_or_else(|| Error::Wallet("mock: master transfer failed".to_string()))
    }

    async fn transfer_erc20_from_safe(
        &self,
        _service_config_id: &str,
        _safe: &Address,
        _token: &Address,
        _to: &Address,
        _amount_wei: u128,
    ) -> Result<TxHash> {
        self.safe_transfers.fetch_add(1, Ordering::SeqCst);
        self.safe_transfer_tx
            .clone()
            .map(TxHash)
            .ok_or_else(|| Error::Wallet("mock: safe transfer failed".to_string()))
    }
}

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<()> {
        self.sent.lock().expect("messenger lock").push(text.to_string());
        Ok(())
    }

    async fn send_markdown(&self, _chat_id: ChatId, text: &str) -> Result<()> {
        self.sent.lock().expect("messenger lock").push(text.to_string());
        Ok(())
    }
}
