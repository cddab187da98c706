//! Content-addressed metadata fetch over an IPFS HTTP gateway.

use std::time::Duration;

use async_trait::async_trait;

use triton_core::{ports::MetadataStore, Error, Result};

/// Gateway prefix; the contract's bytes32 metadata hash is appended after the
/// CIDv1 raw-multihash prefix.
const IPFS_GATEWAY: &str = "https://gateway.autonolas.tech/ipfs/f01701220";

pub struct IpfsMetadataStore {
    http: reqwest::Client,
}

impl IpfsMetadataStore {
    /// The timeout bounds the whole fetch; metadata is small, so a slow
    /// gateway is treated as a failure rather than waited out.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl MetadataStore for IpfsMetadataStore {
    async fn fetch(&self, metadata_hash: &str) -> Result<serde_json::Value> {
        let address = format!("{IPFS_GATEWAY}{metadata_hash}");

        let response = self
            .http
            .get(&address)
            .send()
            .await
            .map_err(|e| Error::MetadataFetch {
                address: address.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::MetadataFetch {
                address,
                reason: status.as_u16().to_string(),
            });
        }

        response.json().await.map_err(|e| Error::MetadataFetch {
            address,
            reason: format!("invalid JSON: {e}"),
        })
    }
}
