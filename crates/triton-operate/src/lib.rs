//! Operate daemon adapter.
//!
//! The operate daemon owns keys, Safe transaction building, claiming, and
//! service lifecycle. This crate is a thin JSON client over its HTTP API:
//! service discovery at startup plus the `WalletManager` port for everything
//! that moves funds. Nothing here signs or encodes transactions.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use triton_core::{
    domain::{Address, ServiceId, TxHash},
    ports::WalletManager,
    service::ServiceConfig,
    Error, Result,
};

#[derive(Clone)]
pub struct OperateClient {
    http: reqwest::Client,
    base_url: String,
    master_eoa: Address,
    master_safes: HashMap<String, Address>,
}

// === Wire DTOs ===

#[derive(Debug, Deserialize)]
struct WalletDto {
    address: String,
    #[serde(default)]
    safes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ServiceDto {
    service_config_id: String,
    name: String,
    home_chain: String,
    chain_configs: HashMap<String, ChainConfigDto>,
}

#[derive(Debug, Deserialize)]
struct ChainConfigDto {
    chain_data: ChainDataDto,
    #[serde(default)]
    user_params: Option<UserParamsDto>,
}

#[derive(Debug, Deserialize)]
struct ChainDataDto {
    /// The service's registry token, i.e. its numeric service id.
    token: u64,
    #[serde(default)]
    instances: Vec<String>,
    multisig: String,
}

#[derive(Debug, Deserialize)]
struct UserParamsDto {
    #[serde(default)]
    staking_program_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaimDto {
    /// Claimed amount in wei, as a decimal string.
    claimed: String,
}

#[derive(Debug, Deserialize)]
struct TransferDto {
    tx_hash: String,
}

impl OperateClient {
    /// Connect to a daemon and cache its master wallet info.
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {e}")))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let wallet: WalletDto = request(http.get(format!("{base_url}/api/wallet"))).await?;
        let master_eoa = Address::new(&wallet.address)?;
        let master_safes = wallet
            .safes
            .into_iter()
            .map(|(chain, safe)| Ok((chain, Address::new(&safe)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        info!("connected to operate daemon at {base_url} (master EOA {master_eoa})");

        Ok(Self {
            http,
            base_url,
            master_eoa,
            master_safes,
        })
    }

    /// All services the daemon manages, in daemon order.
    pub async fn services(&self) -> Result<Vec<ServiceConfig>> {
        let dtos: Vec<ServiceDto> = self
            .get(&format!("{}/api/services", self.base_url))
            .await?;
        dtos.into_iter().map(service_config_from).collect()
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        request(self.http.get(url)).await
    }

    async fn post<T: DeserializeOwned>(&self, url: &str, body: serde_json::Value) -> Result<T> {
        request(self.http.post(url).json(&body)).await
    }
}

fn service_config_from(dto: ServiceDto) -> Result<ServiceConfig> {
    let chain_config = dto.chain_configs.get(&dto.home_chain).ok_or_else(|| {
        Error::Validation(format!(
            "service {} has no configuration for its home chain {}",
            dto.name, dto.home_chain
        ))
    })?;

    let instances = chain_config
        .chain_data
        .instances
        .iter()
        .map(Address::new)
        .collect::<Result<Vec<_>>>()?;

    Ok(ServiceConfig {
        service_config_id: dto.service_config_id,
        name: dto.name,
        home_chain: dto.home_chain.clone(),
        service_id: ServiceId(chain_config.chain_data.token),
        instances,
        multisig: Address::new(&chain_config.chain_data.multisig)?,
    })
}

async fn request<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<T> {
    let response = builder
        .send()
        .await
        .map_err(|e| Error::Wallet(format!("operate request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(200);
        return Err(Error::Wallet(format!("operate returned {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Wallet(format!("operate response decode failed: {e}")))
}

#[async_trait]
impl WalletManager for OperateClient {
    fn master_eoa(&self) -> Address {
        self.master_eoa.clone()
    }

    fn master_safe(&self, chain: &str) -> Option<Address> {
        self.master_safes.get(chain).cloned()
    }

    async fn current_staking_program(&self, service_config_id: &str) -> Result<String> {
        // Re-fetched on every call: the program can change when the service
        // is migrated between staking contracts.
        let dto: ServiceDto = self
            .get(&format!(
                "{}/api/services/{service_config_id}",
                self.base_url
            ))
            .await?;

        dto.chain_configs
            .get(&dto.home_chain)
            .and_then(|c| c.user_params.as_ref())
            .and_then(|p| p.staking_program_id.clone())
            .ok_or_else(|| {
                Error::Wallet(format!(
                    "no staking program configured for service {service_config_id}"
                ))
            })
    }

    async fn claim_rewards(&self, service_config_id: &str) -> Result<u128> {
        let dto: ClaimDto = self
            .post(
                &format!(
                    "{}/api/services/{service_config_id}/claim",
                    self.base_url
                ),
                serde_json::json!({}),
            )
            .await?;

        dto.claimed.parse().map_err(|_| {
            Error::Wallet(format!("claim returned a malformed amount: {}", dto.claimed))
        })
    }

    async fn transfer_from_master_safe(
        &self,
        chain: &str,
        to: &Address,
        asset: &Address,
        amount_wei: u128,
    ) -> Result<TxHash> {
        let dto: TransferDto = self
            .post(
                &format!("{}/api/wallet/transfer", self.base_url),
                serde_json::json!({
                    "chain": chain,
                    "to": to.as_str(),
                    "asset": asset.as_str(),
                    "amount": amount_wei.to_string(),
                }),
            )
            .await?;
        Ok(TxHash(dto.tx_hash))
    }

    async fn transfer_erc20_from_safe(
        &self,
        service_config_id: &str,
        safe: &Address,
        token: &Address,
        to: &Address,
        amount_wei: u128,
    ) -> Result<TxHash> {
        let dto: TransferDto = self
            .post(
                &format!(
                    "{}/api/services/{service_config_id}/safe_transfer",
                    self.base_url
                ),
                serde_json::json!({
                    "safe": safe.as_str(),
                    "token": token.as_str(),
                    "to": to.as_str(),
                    "amount": amount_wei.to_string(),
                }),
            )
            .await?;
        Ok(TxHash(dto.tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_dto_maps_to_config() {
        let dto: ServiceDto = serde_json::from_value(serde_json::json!({
            "service_config_id": "sc-1",
            "name": "trader",
            "home_chain": "gnosis",
            "chain_configs": {
                "gnosis": {
                    "chain_data": {
                        "token": 123,
                        "instances": ["0xabcdef1234567890abcdef1234567890abcdef12"],
                        "multisig": "0x1234567890abcdef1234567890abcdef12345678"
                    },
                    "user_params": { "staking_program_id": "expert" }
                }
            }
        }))
        .unwrap();

        let config = service_config_from(dto).unwrap();
        assert_eq!(config.service_config_id, "sc-1");
        assert_eq!(config.service_id.0, 123);
        assert_eq!(config.instances.len(), 1);
        assert_eq!(
            config.multisig.as_str(),
            "0x1234567890abcdef1234567890abcdef12345678"
        );
    }

    #[test]
    fn service_dto_without_home_chain_config_is_rejected() {
        let dto: ServiceDto = serde_json::from_value(serde_json::json!({
            "service_config_id": "sc-1",
            "name": "trader",
            "home_chain": "gnosis",
            "chain_configs": {}
        }))
        .unwrap();

        assert!(matches!(
            service_config_from(dto),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn wallet_dto_tolerates_missing_safes() {
        let dto: WalletDto = serde_json::from_value(serde_json::json!({
            "address": "0x3333333333333333333333333333333333333333"
        }))
        .unwrap();
        assert!(dto.safes.is_empty());
    }
}
