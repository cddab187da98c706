//! Per-service operations: staking status, balances, claiming, withdrawal.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::info;

use crate::{
    contracts,
    domain::{
        Address, BalanceSnapshot, ServiceId, StakingStatus, Withdrawal, WithdrawalReport,
        WithdrawalSource,
    },
    mech,
    ports::{LedgerReader, MetadataStore, WalletManager},
    staking::{self, wei_to_olas, StatusParams},
    Error, Result,
};

/// Static description of one staked service, as discovered from its operate
/// daemon at startup.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub service_config_id: String,
    pub name: String,
    pub home_chain: String,
    pub service_id: ServiceId,
    /// Agent EOAs running the service. At least one is required for any
    /// balance work.
    pub instances: Vec<Address>,
    /// The service safe (multisig holding the service's funds).
    pub multisig: Address,
}

/// One watched service with its injected collaborators.
pub struct TritonService {
    label: String,
    config: ServiceConfig,
    ledger: Arc<dyn LedgerReader>,
    metadata: Arc<dyn MetadataStore>,
    wallet: Arc<dyn WalletManager>,
    withdrawal_address: Option<Address>,
    render_offset: FixedOffset,
}

impl TritonService {
    pub fn new(
        label: String,
        config: ServiceConfig,
        ledger: Arc<dyn LedgerReader>,
        metadata: Arc<dyn MetadataStore>,
        wallet: Arc<dyn WalletManager>,
        withdrawal_address: Option<Address>,
        render_offset: FixedOffset,
    ) -> Self {
        Self {
            label,
            config,
            ledger,
            metadata,
            wallet,
            withdrawal_address,
            render_offset,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn service_id(&self) -> ServiceId {
        self.config.service_id
    }

    pub fn service_safe(&self) -> &Address {
        &self.config.multisig
    }

    pub fn withdrawal_address(&self) -> Option<&Address> {
        self.withdrawal_address.as_ref()
    }

    pub fn master_eoa(&self) -> Address {
        self.wallet.master_eoa()
    }

    pub fn master_safe(&self) -> Option<Address> {
        self.wallet.master_safe(&self.config.home_chain)
    }

    /// First agent instance. Missing instances are a validation error.
    pub fn agent_address(&self) -> Result<&Address> {
        self.config.instances.first().ok_or_else(|| {
            Error::Validation("no agent instances found in the chain configuration".to_string())
        })
    }

    /// The staking contract the service is currently enrolled on.
    async fn staking_contract_address(&self) -> Result<Address> {
        let program_id = self
            .wallet
            .current_staking_program(&self.config.service_config_id)
            .await
            .map_err(|e| {
                Error::Validation(format!("failed to get staking contract address: {e}"))
            })?;

        let program = contracts::staking_program_by_id(&program_id).ok_or_else(|| {
            Error::Validation(format!(
                "staking contract address not found for program {program_id}"
            ))
        })?;
        Ok(program.contract_address())
    }

    /// Current staking snapshot for this service.
    pub async fn staking_status(&self) -> Result<StakingStatus> {
        info!("checking staking status for {}", self.label);

        let staking_contract = self.staking_contract_address().await?;
        let activity_checker = self
            .ledger
            .activity_checker(&staking_contract)
            .await
            .map_err(|e| Error::StakingStatus(Box::new(e)))?;

        let mech = mech::resolve_mech(self.ledger.as_ref(), &activity_checker).await;

        staking::get_staking_status(
            self.ledger.as_ref(),
            self.metadata.as_ref(),
            StatusParams {
                staking_contract: &staking_contract,
                mech: &mech.address,
                activity_checker: &activity_checker,
                service_id: self.config.service_id,
                safe: self.service_safe(),
                render_offset: self.render_offset,
            },
        )
        .await
    }

    /// Sample the seven balances. Preconditions (an agent instance and a
    /// master safe on the home chain) are checked before any read goes out.
    pub async fn check_balance(&self) -> Result<BalanceSnapshot> {
        let agent = self.agent_address()?.clone();
        let master_safe = self.master_safe().ok_or_else(|| {
            Error::Validation("master wallet safe not found for the home chain".to_string())
        })?;
        let master_eoa = self.master_eoa();

        let olas = contracts::olas_token();
        let wrapped = contracts::wrapped_native_token();

        let agent_eoa_native = wei_to_eth(self.ledger.native_balance(&agent).await?);
        let service_safe_native =
            wei_to_eth(self.ledger.native_balance(self.service_safe()).await?);

        let wrapped_decimals = self.ledger.token_decimals(&wrapped).await?;
        let service_safe_wrapped_native = to_display_units(
            self.ledger
                .token_balance(&wrapped, self.service_safe())
                .await?,
            wrapped_decimals,
        );

        let master_eoa_native = wei_to_eth(self.ledger.native_balance(&master_eoa).await?);
        let master_safe_native = wei_to_eth(self.ledger.native_balance(&master_safe).await?);

        let olas_decimals = self.ledger.token_decimals(&olas).await?;
        let master_safe_olas = to_display_units(
            self.ledger.token_balance(&olas, &master_safe).await?,
            olas_decimals,
        );
        let service_safe_olas = to_display_units(
            self.ledger.token_balance(&olas, self.service_safe()).await?,
            olas_decimals,
        );

        info!(
            "{}: agent {agent_eoa_native:.2} xDAI | service safe {service_safe_native:.2} xDAI {service_safe_wrapped_native:.2} wxDAI {service_safe_olas:.2} OLAS | master EOA {master_eoa_native:.2} xDAI | master safe {master_safe_native:.2} xDAI",
            self.label
        );

        Ok(BalanceSnapshot {
            agent_eoa_native,
            service_safe_native,
            service_safe_wrapped_native,
            master_eoa_native,
            master_safe_native,
            master_safe_olas,
            service_safe_olas,
        })
    }

    /// Claim accrued rewards into the master safe. Returns the claimed amount
    /// in wei; the caller decides how to log and report failures.
    pub async fn claim_rewards(&self) -> Result<u128> {
        info!("claiming rewards for {}", self.label);
        self.wallet
            .claim_rewards(&self.config.service_config_id)
            .await
    }

    /// Sweep OLAS rewards to the configured withdrawal address.
    ///
    /// No address configured means no action. The master-safe and
    /// service-safe legs are independent: a failed balance read or transfer
    /// on one leg is recorded in the report and the other leg still runs.
    pub async fn withdraw_rewards(&self) -> Result<WithdrawalReport> {
        let Some(to) = self.withdrawal_address.clone() else {
            return Ok(WithdrawalReport::default());
        };

        let master_safe = self.master_safe().ok_or_else(|| {
            Error::Validation("master wallet safe not found for the home chain".to_string())
        })?;
        let olas = contracts::olas_token();

        let mut report = WithdrawalReport::default();

        // Master safe leg.
        match self.ledger.token_balance(&olas, &master_safe).await {
            Ok(0) => info!("{}: no master safe OLAS to withdraw", self.label),
            Ok(balance) => {
                info!(
                    "{}: withdrawing {:.2} OLAS rewards",
                    self.label,
                    wei_to_olas(balance)
                );
                match self
                    .wallet
                    .transfer_from_master_safe(&self.config.home_chain, &to, &olas, balance)
                    .await
                {
                    Ok(tx_hash) => report.withdrawals.push(Withdrawal {
                        tx_hash,
                        amount_olas: wei_to_olas(balance),
                        source: WithdrawalSource::MasterSafe,
                    }),
                    Err(e) => report.failures.push((WithdrawalSource::MasterSafe, e)),
                }
            }
            Err(e) => report.failures.push((WithdrawalSource::MasterSafe, e)),
        }

        // Service safe leg, isolated from the master leg.
        match self.ledger.token_balance(&olas, self.service_safe()).await {
            Ok(0) => {}
            Ok(balance) => {
                info!(
                    "{}: withdrawing {:.2} OLAS from {} to {to}",
                    self.label,
                    wei_to_olas(balance),
                    self.service_safe()
                );
                match self
                    .wallet
                    .transfer_erc20_from_safe(
                        &self.config.service_config_id,
                        self.service_safe(),
                        &olas,
                        &to,
                        balance,
                    )
                    .await
                {
                    Ok(tx_hash) => report.withdrawals.push(Withdrawal {
                        tx_hash,
                        amount_olas: wei_to_olas(balance),
                        source: WithdrawalSource::ServiceSafe,
                    }),
                    Err(e) => report.failures.push((WithdrawalSource::ServiceSafe, e)),
                }
            }
            Err(e) => report.failures.push((WithdrawalSource::ServiceSafe, e)),
        }

        Ok(report)
    }
}

fn wei_to_eth(wei: u128) -> f64 {
    to_display_units(wei, 18)
}

fn to_display_units(amount: u128, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}
