use async_trait::async_trait;

use crate::{
    domain::{Address, ChatId, ServiceId, TxHash},
    Result,
};

/// Read-only access to contract state on the home chain.
///
/// All amounts come back in the token's smallest unit (wei for native); unit
/// conversion happens in the core, decimals are read through this port rather
/// than assumed.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn native_balance(&self, address: &Address) -> Result<u128>;
    async fn token_balance(&self, token: &Address, holder: &Address) -> Result<u128>;
    async fn token_decimals(&self, token: &Address) -> Result<u8>;

    /// The activity checker a staking contract enforces.
    async fn activity_checker(&self, staking_contract: &Address) -> Result<Address>;

    /// Accrued reward counter for a service (`mapServiceInfo`).
    async fn accrued_rewards(&self, staking_contract: &Address, service_id: ServiceId)
        -> Result<u128>;

    /// Per-service nonces recorded at the last checkpoint (`getServiceInfo`).
    /// Index 1 is the mech request count; the list may be empty for services
    /// that have never been checkpointed.
    async fn checkpoint_nonces(
        &self,
        staking_contract: &Address,
        service_id: ServiceId,
    ) -> Result<Vec<u64>>;

    /// Required request rate, scaled by 1e18, per second.
    async fn liveness_ratio(&self, activity_checker: &Address) -> Result<u128>;

    async fn liveness_period(&self, staking_contract: &Address) -> Result<u64>;
    async fn ts_checkpoint(&self, staking_contract: &Address) -> Result<u64>;

    /// Content hash of the staking program metadata, hex without `0x`.
    async fn metadata_hash(&self, staking_contract: &Address) -> Result<String>;

    /// Ids of all services currently staked on a contract.
    async fn service_ids(&self, staking_contract: &Address) -> Result<Vec<u64>>;

    /// `mechMarketplace` getter (marketplace-generation activity checkers).
    async fn marketplace_mech(&self, activity_checker: &Address) -> Result<Address>;

    /// `agentMech` getter (older activity checkers).
    async fn agent_mech(&self, activity_checker: &Address) -> Result<Address>;

    /// Lifetime request count, `mapRequestsCounts` spelling (older mechs).
    async fn requests_count_legacy(&self, mech: &Address, requester: &Address) -> Result<u64>;

    /// Lifetime request count, `mapRequestCounts` spelling (newer mechs).
    async fn requests_count(&self, mech: &Address, requester: &Address) -> Result<u64>;
}

/// Content-addressed metadata store (an IPFS-style HTTP gateway).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn fetch(&self, metadata_hash: &str) -> Result<serde_json::Value>;
}

/// The external wallet/service manager. It owns keys, Safe transaction
/// building, and service lifecycle; this port only asks it to act.
#[async_trait]
pub trait WalletManager: Send + Sync {
    fn master_eoa(&self) -> Address;
    fn master_safe(&self, chain: &str) -> Option<Address>;

    /// The staking program a service is currently enrolled in.
    async fn current_staking_program(&self, service_config_id: &str) -> Result<String>;

    /// Claim accrued staking rewards into the master safe. Returns the
    /// claimed amount in wei.
    async fn claim_rewards(&self, service_config_id: &str) -> Result<u128>;

    /// Transfer an asset out of the master safe.
    async fn transfer_from_master_safe(
        &self,
        chain: &str,
        to: &Address,
        asset: &Address,
        amount_wei: u128,
    ) -> Result<TxHash>;

    /// ERC-20 transfer out of the service safe, signed by the service's
    /// on-chain signer.
    async fn transfer_erc20_from_safe(
        &self,
        service_config_id: &str,
        safe: &Address,
        token: &Address,
        to: &Address,
        amount_wei: u128,
    ) -> Result<TxHash>;
}

/// Best-effort spot price lookup.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// OLAS price in USD, or `None` when the feed is unavailable.
    async fn olas_usd(&self) -> Option<f64>;
}

/// Chat delivery port. Telegram is the only implementation today; the trait
/// keeps the core free of bot-framework types.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;

    /// MarkdownV2 with web-page previews disabled.
    async fn send_markdown(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
