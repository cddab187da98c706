//! Scheduled background tasks: hourly balance alerts and monthly autoclaim.

use std::sync::Arc;

use tracing::{error, info};

use crate::{
    config::Config,
    domain::ChatId,
    formatting,
    ports::Messenger,
    registry::ServiceRegistry,
    scheduler::{Job, Schedule},
    staking::wei_to_olas,
    Result,
};

/// Hourly sweep over all services: any balance under its threshold produces
/// an alert message. A failing service is logged and skipped; the sweep
/// continues.
pub struct BalanceAlertJob {
    registry: Arc<ServiceRegistry>,
    messenger: Arc<dyn Messenger>,
    cfg: Arc<Config>,
}

impl BalanceAlertJob {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        messenger: Arc<dyn Messenger>,
        cfg: Arc<Config>,
    ) -> Self {
        Self {
            registry,
            messenger,
            cfg,
        }
    }
}

#[async_trait::async_trait]
impl Job for BalanceAlertJob {
    fn name(&self) -> &str {
        "balance_check"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Hourly { minute: 0 }
    }

    async fn run(&self) -> Result<()> {
        let chat = ChatId(self.cfg.chat_id);

        for service in self.registry.iter() {
            let balances = match service.check_balance().await {
                Ok(b) => b,
                Err(e) => {
                    error!("balance check failed for {}: {e}", service.label());
                    continue;
                }
            };

            // check_balance validated both of these.
            let Ok(agent) = service.agent_address() else {
                continue;
            };
            let Some(master_safe) = service.master_safe() else {
                continue;
            };

            if balances.agent_eoa_native < self.cfg.agent_balance_threshold {
                let message = formatting::agent_balance_alert(
                    service.label(),
                    agent,
                    balances.agent_eoa_native,
                );
                self.messenger.send_markdown(chat, &message).await?;
            }

            if balances.service_safe_native + balances.service_safe_wrapped_native
                < self.cfg.safe_balance_threshold
            {
                let message = formatting::service_safe_alert(
                    service.label(),
                    service.service_safe(),
                    balances.service_safe_native,
                    balances.service_safe_wrapped_native,
                );
                self.messenger.send_markdown(chat, &message).await?;
            }

            if balances.master_safe_native < self.cfg.master_safe_balance_threshold {
                let message = formatting::master_safe_alert(
                    service.label(),
                    &master_safe,
                    balances.master_safe_native,
                );
                self.messenger.send_markdown(chat, &message).await?;
            }
        }

        Ok(())
    }
}

/// Monthly claim-then-withdraw sweep, gated by the autoclaim toggle.
pub struct AutoclaimJob {
    registry: Arc<ServiceRegistry>,
    messenger: Arc<dyn Messenger>,
    cfg: Arc<Config>,
}

impl AutoclaimJob {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        messenger: Arc<dyn Messenger>,
        cfg: Arc<Config>,
    ) -> Self {
        Self {
            registry,
            messenger,
            cfg,
        }
    }
}

#[async_trait::async_trait]
impl Job for AutoclaimJob {
    fn name(&self) -> &str {
        "autoclaim"
    }

    fn schedule(&self) -> Schedule {
        Schedule::Monthly {
            day: self.cfg.autoclaim_day,
            hour: self.cfg.autoclaim_hour_utc,
        }
    }

    async fn run(&self) -> Result<()> {
        if !self.cfg.autoclaim {
            info!("autoclaim task is disabled");
            return Ok(());
        }

        // Claim first so the withdrawals below sweep fresh rewards too.
        for service in self.registry.iter() {
            match service.claim_rewards().await {
                Ok(claimed_wei) => info!(
                    "claimed {:.2} OLAS for {}",
                    wei_to_olas(claimed_wei),
                    service.label()
                ),
                Err(e) => error!("failed to claim rewards for {}: {e}", service.label()),
            }
        }

        let mut messages = Vec::new();
        for service in self.registry.iter() {
            let Some(to) = service.withdrawal_address().cloned() else {
                continue;
            };
            match service.withdraw_rewards().await {
                Ok(report) => {
                    for (source, e) in &report.failures {
                        error!("{source} withdrawal failed for {}: {e}", service.label());
                    }
                    if report.withdrawals.is_empty() {
                        messages
                            .push(formatting::cannot_withdraw_message(service.label(), true));
                    } else {
                        for withdrawal in &report.withdrawals {
                            messages.push(formatting::withdrawal_message(
                                service.label(),
                                withdrawal,
                                &to,
                                true,
                            ));
                        }
                    }
                }
                Err(e) => {
                    error!("withdrawal failed for {}: {e}", service.label());
                    messages.push(formatting::cannot_withdraw_message(service.label(), true));
                }
            }
        }

        if messages.is_empty() {
            info!("no rewards to withdraw");
            return Ok(());
        }

        self.messenger
            .send_markdown(ChatId(self.cfg.chat_id), &messages.join("\n\n"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, ServiceId};
    use crate::service::{ServiceConfig, TritonService};
    use crate::test_support::{MockLedger, MockMetadataStore, MockWallet, RecordingMessenger};
    use chrono::FixedOffset;

    fn test_config(autoclaim: bool) -> Config {
        Config {
            gnosis_rpc: "http://localhost:8545".to_string(),
            telegram_token: "token".to_string(),
            chat_id: 1,
            operators: vec![("op".to_string(), "http://localhost:8000".to_string())],
            withdrawal_address: None,
            autoclaim,
            manual_claim: true,
            autoclaim_day: 1,
            autoclaim_hour_utc: 9,
            agent_balance_threshold: 0.1,
            safe_balance_threshold: 1.0,
            master_safe_balance_threshold: 5.0,
            local_time_offset: FixedOffset::east_opt(0).unwrap(),
            coingecko_api_key: None,
            http_timeout: std::time::Duration::from_secs(30),
        }
    }

    fn service(ledger: MockLedger, wallet: MockWallet, withdrawal: Option<&str>) -> TritonService {
        TritonService::new(
            "op-trader".to_string(),
            ServiceConfig {
                service_config_id: "svc-1".to_string(),
                name: "trader".to_string(),
                home_chain: "gnosis".to_string(),
                service_id: ServiceId(1),
                instances: vec![
                    Address::new("0xabcdef1234567890abcdef1234567890abcdef12").unwrap()
                ],
                multisig: Address::new("0x1234567890abcdef1234567890abcdef12345678").unwrap(),
            },
            Arc::new(ledger),
            Arc::new(MockMetadataStore::with_value(serde_json::json!({}))),
            Arc::new(wallet),
            withdrawal.map(|w| Address::new(w).unwrap()),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn wallet_with_safe() -> MockWallet {
        MockWallet {
            master_safe: Some("0x4444444444444444444444444444444444444444".to_string()),
            ..MockWallet::default()
        }
    }

    #[tokio::test]
    async fn low_balances_produce_alerts() {
        let ledger = MockLedger {
            native_balance: Some(10_000_000_000_000_000), // 0.01, under every threshold
            token_balance: Some(0),
            token_decimals: Some(18),
            ..MockLedger::default()
        };
        let registry = Arc::new(ServiceRegistry::new(vec![service(
            ledger,
            wallet_with_safe(),
            None,
        )]));
        let messenger = Arc::new(RecordingMessenger::default());
        let job = BalanceAlertJob::new(
            registry,
            messenger.clone(),
            Arc::new(test_config(false)),
        );

        job.run().await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains("Agent EOA"));
        assert!(sent[1].contains("Service Safe"));
        assert!(sent[2].contains("Master Safe"));
    }

    #[tokio::test]
    async fn healthy_balances_stay_silent() {
        let ledger = MockLedger {
            native_balance: Some(10_000_000_000_000_000_000), // 10.0
            token_balance: Some(0),
            token_decimals: Some(18),
            ..MockLedger::default()
        };
        let registry = Arc::new(ServiceRegistry::new(vec![service(
            ledger,
            wallet_with_safe(),
            None,
        )]));
        let messenger = Arc::new(RecordingMessenger::default());
        let job = BalanceAlertJob::new(
            registry,
            messenger.clone(),
            Arc::new(test_config(false)),
        );

        job.run().await.unwrap();
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn autoclaim_disabled_sends_nothing() {
        let registry = Arc::new(ServiceRegistry::new(vec![service(
            MockLedger::default(),
            wallet_with_safe(),
            Some("0x1111111111111111111111111111111111111111"),
        )]));
        let messenger = Arc::new(RecordingMessenger::default());
        let job = AutoclaimJob::new(registry, messenger.clone(), Arc::new(test_config(false)));

        job.run().await.unwrap();
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn autoclaim_reports_withdrawals() {
        let ledger = MockLedger {
            token_balance: Some(2_000_000_000_000_000_000),
            ..MockLedger::default()
        };
        let wallet = MockWallet {
            claimed_wei: Some(1_000_000_000_000_000_000),
            master_transfer_tx: Some("0xaaa".to_string()),
            safe_transfer_tx: Some("0xbbb".to_string()),
            ..wallet_with_safe()
        };
        let registry = Arc::new(ServiceRegistry::new(vec![service(
            ledger,
            wallet,
            Some("0x1111111111111111111111111111111111111111"),
        )]));
        let messenger = Arc::new(RecordingMessenger::default());
        let job = AutoclaimJob::new(registry, messenger.clone(), Arc::new(test_config(true)));

        job.run().await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Autoclaim"));
        assert!(sent[0].contains("withdrawal transaction"));
    }

    #[tokio::test]
    async fn autoclaim_survives_claim_failures() {
        // Claim fails (no claimed_wei) and withdrawals fail; the job still
        // completes and reports the failure line.
        let ledger = MockLedger {
            token_balance: Some(1_000_000_000_000_000_000),
            ..MockLedger::default()
        };
        let registry = Arc::new(ServiceRegistry::new(vec![service(
            ledger,
            wallet_with_safe(),
            Some("0x1111111111111111111111111111111111111111"),
        )]));
        let messenger = Arc::new(RecordingMessenger::default());
        let job = AutoclaimJob::new(registry, messenger.clone(), Arc::new(test_config(true)));

        job.run().await.unwrap();

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Cannot withdraw rewards"));
    }
}
