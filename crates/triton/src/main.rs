use std::sync::Arc;

use tracing::error;

use triton_chain::{coingecko::CoinGeckoPriceFeed, ipfs::IpfsMetadataStore, GnosisLedger};
use triton_core::{
    config::Config,
    ports::{LedgerReader, MetadataStore, PriceFeed, WalletManager},
    registry::ServiceRegistry,
    service::TritonService,
};
use triton_operate::OperateClient;

#[tokio::main]
async fn main() -> Result<(), triton_core::Error> {
    triton_core::logging::init("triton")?;

    let cfg = Arc::new(Config::load()?);

    let ledger: Arc<dyn LedgerReader> = Arc::new(GnosisLedger::new(&cfg.gnosis_rpc)?);
    let metadata: Arc<dyn MetadataStore> = Arc::new(IpfsMetadataStore::new(cfg.http_timeout)?);
    let price: Arc<dyn PriceFeed> = Arc::new(CoinGeckoPriceFeed::new(
        cfg.coingecko_api_key.clone(),
        cfg.http_timeout,
    )?);

    // One daemon can manage several services; a dead daemon only costs its
    // own services.
    let mut services = Vec::new();
    for (operator, endpoint) in &cfg.operators {
        let client = match OperateClient::connect(endpoint, cfg.http_timeout).await {
            Ok(client) => client,
            Err(e) => {
                error!("failed to connect to operate daemon {operator} at {endpoint}: {e}");
                continue;
            }
        };
        let wallet: Arc<dyn WalletManager> = Arc::new(client.clone());

        match client.services().await {
            Ok(configs) => {
                for config in configs {
                    let label = format!("{operator}-{}", config.name);
                    services.push(TritonService::new(
                        label,
                        config,
                        ledger.clone(),
                        metadata.clone(),
                        wallet.clone(),
                        cfg.withdrawal_address.clone(),
                        cfg.local_time_offset,
                    ));
                }
            }
            Err(e) => error!("failed to list services for {operator}: {e}"),
        }
    }

    let registry = Arc::new(ServiceRegistry::new(services));
    if registry.is_empty() {
        return Err(triton_core::Error::Config(
            "no services discovered from the configured operators".to_string(),
        ));
    }

    triton_telegram::router::run_polling(cfg, registry, ledger, price)
        .await
        .map_err(|e| triton_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
