use chrono::{DateTime, FixedOffset};

use crate::{Error, Result};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Numeric on-chain service id (the staked service's registry token).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServiceId(pub u64);

/// An EVM address: `0x` followed by 40 hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref();
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| Error::Validation(format!("invalid address: {s}")))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Validation(format!("invalid address: {s}")));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// A transaction hash as returned by the wallet manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHash(pub String);

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which resolution path produced a mech address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MechSource {
    /// `mechMarketplace` on a marketplace-generation activity checker.
    Marketplace,
    /// `agentMech` on an older activity checker.
    AgentMech,
    /// Neither getter answered; the fixed default was used.
    Fallback,
}

/// A resolved mech address together with the path that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMech {
    pub address: Address,
    pub source: MechSource,
}

/// One service's staking activity snapshot. Derived fresh on each query,
/// never persisted.
#[derive(Clone, Debug)]
pub struct StakingStatus {
    pub accrued_rewards_olas: f64,
    /// Signed: a negative value means the lifetime counter is behind the
    /// checkpoint counter, which callers should see rather than a clamped 0.
    pub mech_requests_this_epoch: i64,
    pub required_mech_requests: u64,
    pub epoch_end: DateTime<FixedOffset>,
    pub metadata: serde_json::Value,
}

/// The seven balances sampled per service. Each read is independent; there is
/// no atomicity guarantee across them.
#[derive(Clone, Copy, Debug, Default)]
pub struct BalanceSnapshot {
    pub agent_eoa_native: f64,
    pub service_safe_native: f64,
    pub service_safe_wrapped_native: f64,
    pub master_eoa_native: f64,
    pub master_safe_native: f64,
    pub master_safe_olas: f64,
    pub service_safe_olas: f64,
}

/// Which safe a withdrawal was sent from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalSource {
    MasterSafe,
    ServiceSafe,
}

impl std::fmt::Display for WithdrawalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalSource::MasterSafe => f.write_str("Master Safe"),
            WithdrawalSource::ServiceSafe => f.write_str("Service Safe"),
        }
    }
}

/// One executed withdrawal transfer.
#[derive(Clone, Debug)]
pub struct Withdrawal {
    pub tx_hash: TxHash,
    pub amount_olas: f64,
    pub source: WithdrawalSource,
}

/// Outcome of a withdrawal sweep over both safes.
///
/// Failed legs are reported alongside the successes so callers can log them;
/// the withdrawer itself never logs errors or propagates leg failures.
#[derive(Debug, Default)]
pub struct WithdrawalReport {
    pub withdrawals: Vec<Withdrawal>,
    pub failures: Vec<(WithdrawalSource, Error)>,
}
