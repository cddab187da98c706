//! Gnosis chain adapter (alloy).
//!
//! Implements the core `LedgerReader` port over a JSON-RPC HTTP provider,
//! plus the IPFS metadata store and the CoinGecko price feed.

use alloy::{
    primitives::{Address as EvmAddress, U256},
    providers::{Provider, RootProvider},
};
use async_trait::async_trait;

pub mod bindings;
pub mod coingecko;
pub mod ipfs;

use bindings::{IActivityChecker, IERC20, IMech, IStakingToken};
use triton_core::{
    domain::{Address, ServiceId},
    ports::LedgerReader,
    Error, Result,
};

/// Read-only ledger over one RPC endpoint.
#[derive(Clone)]
pub struct GnosisLedger {
    provider: RootProvider,
}

impl GnosisLedger {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC url {rpc_url}: {e}")))?;
        Ok(Self {
            provider: RootProvider::new_http(url),
        })
    }
}

fn evm_address(address: &Address) -> Result<EvmAddress> {
    address
        .as_str()
        .parse()
        .map_err(|e| Error::Ledger(format!("invalid address {address}: {e}")))
}

fn core_address(address: EvmAddress) -> Result<Address> {
    Address::new(address.to_string())
}

fn to_u128(value: U256, what: &str) -> Result<u128> {
    u128::try_from(value).map_err(|_| Error::Ledger(format!("{what} out of range: {value}")))
}

fn to_u64(value: U256, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::Ledger(format!("{what} out of range: {value}")))
}

fn read_err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Ledger(format!("{what}: {e}"))
}

#[async_trait]
impl LedgerReader for GnosisLedger {
    async fn native_balance(&self, address: &Address) -> Result<u128> {
        let balance = self
            .provider
            .get_balance(evm_address(address)?)
            .await
            .map_err(read_err("native balance"))?;
        to_u128(balance, "native balance")
    }

    async fn token_balance(&self, token: &Address, holder: &Address) -> Result<u128> {
        let erc20 = IERC20::new(evm_address(token)?, self.provider.clone());
        let balance = erc20
            .balanceOf(evm_address(holder)?)
            .call()
            .await
            .map_err(read_err("token balance"))?;
        to_u128(balance, "token balance")
    }

    async fn token_decimals(&self, token: &Address) -> Result<u8> {
        let erc20 = IERC20::new(evm_address(token)?, self.provider.clone());
        erc20.decimals().call().await.map_err(read_err("token decimals"))
    }

    async fn activity_checker(&self, staking_contract: &Address) -> Result<Address> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let checker = staking
            .activityChecker()
            .call()
            .await
            .map_err(read_err("activity checker"))?;
        core_address(checker)
    }

    async fn accrued_rewards(
        &self,
        staking_contract: &Address,
        service_id: ServiceId,
    ) -> Result<u128> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let info = staking
            .mapServiceInfo(U256::from(service_id.0))
            .call()
            .await
            .map_err(read_err("service info"))?;
        to_u128(info.reward, "accrued rewards")
    }

    async fn checkpoint_nonces(
        &self,
        staking_contract: &Address,
        service_id: ServiceId,
    ) -> Result<Vec<u64>> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let info = staking
            .getServiceInfo(U256::from(service_id.0))
            .call()
            .await
            .map_err(read_err("service info"))?;
        info.nonces
            .into_iter()
            .map(|nonce| to_u64(nonce, "checkpoint nonce"))
            .collect()
    }

    async fn liveness_ratio(&self, activity_checker: &Address) -> Result<u128> {
        let checker = IActivityChecker::new(evm_address(activity_checker)?, self.provider.clone());
        let ratio = checker
            .livenessRatio()
            .call()
            .await
            .map_err(read_err("liveness ratio"))?;
        to_u128(ratio, "liveness ratio")
    }

    async fn liveness_period(&self, staking_contract: &Address) -> Result<u64> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let period = staking
            .livenessPeriod()
            .call()
            .await
            .map_err(read_err("liveness period"))?;
        to_u64(period, "liveness period")
    }

    async fn ts_checkpoint(&self, staking_contract: &Address) -> Result<u64> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let ts = staking
            .tsCheckpoint()
            .call()
            .await
            .map_err(read_err("checkpoint timestamp"))?;
        to_u64(ts, "checkpoint timestamp")
    }

    async fn metadata_hash(&self, staking_contract: &Address) -> Result<String> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let hash = staking
            .metadataHash()
            .call()
            .await
            .map_err(read_err("metadata hash"))?;
        Ok(alloy::hex::encode(hash))
    }

    async fn service_ids(&self, staking_contract: &Address) -> Result<Vec<u64>> {
        let staking = IStakingToken::new(evm_address(staking_contract)?, self.provider.clone());
        let ids = staking
            .getServiceIds()
            .call()
            .await
            .map_err(read_err("service ids"))?;
        ids.into_iter().map(|id| to_u64(id, "service id")).collect()
    }

    async fn marketplace_mech(&self, activity_checker: &Address) -> Result<Address> {
        let checker = IActivityChecker::new(evm_address(activity_checker)?, self.provider.clone());
        let mech = checker
            .mechMarketplace()
            .call()
            .await
            .map_err(read_err("marketplace mech"))?;
        core_address(mech)
    }

    async fn agent_mech(&self, activity_checker: &Address) -> Result<Address> {
        let checker = IActivityChecker::new(evm_address(activity_checker)?, self.provider.clone());
        let mech = checker
            .agentMech()
            .call()
            .await
            .map_err(read_err("agent mech"))?;
        core_address(mech)
    }

    async fn requests_count_legacy(&self, mech: &Address, requester: &Address) -> Result<u64> {
        let mech = IMech::new(evm_address(mech)?, self.provider.clone());
        let count = mech
            .mapRequestsCounts(evm_address(requester)?)
            .call()
            .await
            .map_err(read_err("request count"))?;
        to_u64(count, "request count")
    }

    async fn requests_count(&self, mech: &Address, requester: &Address) -> Result<u64> {
        let mech = IMech::new(evm_address(mech)?, self.provider.clone());
        let count = mech
            .mapRequestCounts(evm_address(requester)?)
            .call()
            .await
            .map_err(read_err("request count"))?;
        to_u64(count, "request count")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_alloy() {
        let core = Address::new("0x77af31De935740567Cf4fF1986D04B2c964A786a").unwrap();
        let evm = evm_address(&core).unwrap();
        let back = core_address(evm).unwrap();
        assert_eq!(back, core);
    }

    #[test]
    fn u256_conversions_reject_overflow() {
        assert_eq!(to_u64(U256::from(7u64), "x").unwrap(), 7);
        assert!(to_u64(U256::MAX, "x").is_err());
        assert_eq!(to_u128(U256::from(7u64), "x").unwrap(), 7);
        assert!(to_u128(U256::MAX, "x").is_err());
    }
}
