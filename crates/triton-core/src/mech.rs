//! Mech-address resolution.
//!
//! Two activity-checker generations exist: marketplace checkers expose a
//! `mechMarketplace` getter, older ones expose `agentMech`. The schemas are
//! tried in order; when neither answers, a fixed default mech keeps status
//! reporting alive. The chosen path is recorded in the result.

use tracing::{debug, warn};

use crate::{
    contracts,
    domain::{Address, MechSource, ResolvedMech},
    ports::LedgerReader,
    Result,
};

/// One activity-checker schema generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MechSchema {
    Marketplace,
    AgentMech,
}

/// Schemas in resolution order, newest generation first.
pub const RESOLUTION_ORDER: [MechSchema; 2] = [MechSchema::Marketplace, MechSchema::AgentMech];

impl MechSchema {
    pub async fn read(
        self,
        ledger: &dyn LedgerReader,
        activity_checker: &Address,
    ) -> Result<Address> {
        match self {
            MechSchema::Marketplace => ledger.marketplace_mech(activity_checker).await,
            MechSchema::AgentMech => ledger.agent_mech(activity_checker).await,
        }
    }

    fn source(self) -> MechSource {
        match self {
            MechSchema::Marketplace => MechSource::Marketplace,
            MechSchema::AgentMech => MechSource::AgentMech,
        }
    }
}

/// Resolve the mech an activity checker is monitoring.
///
/// Never fails: a missing function, revert, or transport error all just move
/// resolution to the next schema, and both schemas failing yields the fixed
/// default. An approximate mech address keeps downstream status reporting
/// useful where an error would not.
pub async fn resolve_mech(ledger: &dyn LedgerReader, activity_checker: &Address) -> ResolvedMech {
    for schema in RESOLUTION_ORDER {
        match schema.read(ledger, activity_checker).await {
            Ok(address) => {
                return ResolvedMech {
                    address,
                    source: schema.source(),
                }
            }
            Err(e) => debug!("{schema:?} read on {activity_checker} failed: {e}"),
        }
    }

    warn!("no mech getter answered on {activity_checker}, using the default mech");
    ResolvedMech {
        address: contracts::fallback_mech(),
        source: MechSource::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockLedger;

    const MARKETPLACE_MECH: &str = "0x1111111111111111111111111111111111111111";
    const AGENT_MECH: &str = "0x2222222222222222222222222222222222222222";

    fn checker() -> Address {
        Address::new("0x00000000000000000000000000000000000000aa").unwrap()
    }

    #[tokio::test]
    async fn prefers_marketplace_schema() {
        let ledger = MockLedger {
            marketplace_mech: Some(MARKETPLACE_MECH.to_string()),
            agent_mech: Some(AGENT_MECH.to_string()),
            ..MockLedger::default()
        };

        let resolved = resolve_mech(&ledger, &checker()).await;
        assert_eq!(resolved.source, MechSource::Marketplace);
        assert_eq!(resolved.address.as_str(), MARKETPLACE_MECH);
    }

    #[tokio::test]
    async fn falls_back_to_agent_mech_when_marketplace_fails() {
        let ledger = MockLedger {
            marketplace_mech: None,
            agent_mech: Some(AGENT_MECH.to_string()),
            ..MockLedger::default()
        };

        let resolved = resolve_mech(&ledger, &checker()).await;
        assert_eq!(resolved.source, MechSource::AgentMech);
        assert_eq!(resolved.address.as_str(), AGENT_MECH);
    }

    #[tokio::test]
    async fn uses_fixed_default_when_both_schemas_fail() {
        let ledger = MockLedger::default();

        let resolved = resolve_mech(&ledger, &checker()).await;
        assert_eq!(resolved.source, MechSource::Fallback);
        assert_eq!(
            resolved.address.as_str(),
            "0x77af31De935740567Cf4fF1986D04B2c964A786a"
        );
    }
}
