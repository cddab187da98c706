//! Staking-status computation.
//!
//! Reconciles on-chain counters (request counts, checkpoints, liveness
//! parameters) into one per-service activity snapshot.

use chrono::{FixedOffset, TimeZone, Utc};
use tracing::warn;

use crate::{
    contracts,
    domain::{Address, ServiceId, StakingStatus},
    ports::{LedgerReader, MetadataStore},
    Error, Result,
};

const SECONDS_PER_DAY: u128 = 86_400;
const WAD: u128 = 1_000_000_000_000_000_000;

/// Convert a wei-denominated OLAS amount to display units (18 decimals).
pub fn wei_to_olas(wei: u128) -> f64 {
    wei as f64 / WAD as f64
}

/// Daily request quota implied by a liveness ratio (a 1e18-scaled per-second
/// rate), rounded up. Rounding down would understate the quota and mark a
/// lagging service compliant.
pub fn required_daily_requests(liveness_ratio: u128) -> u64 {
    let scaled = liveness_ratio.saturating_mul(SECONDS_PER_DAY);
    (scaled.div_ceil(WAD)) as u64
}

/// Lifetime request count the requester has made to a mech.
///
/// Newer mechs renamed the getter from `mapRequestsCounts` to
/// `mapRequestCounts`; both are tried, oldest spelling first, and the first
/// that answers wins. Both failing is a read failure.
pub async fn mech_request_count(
    ledger: &dyn LedgerReader,
    mech: &Address,
    requester: &Address,
) -> Result<u64> {
    match ledger.requests_count_legacy(mech, requester).await {
        Ok(count) => Ok(count),
        Err(_) => ledger.requests_count(mech, requester).await,
    }
}

/// Inputs for one status computation.
#[derive(Clone, Copy, Debug)]
pub struct StatusParams<'a> {
    pub staking_contract: &'a Address,
    pub mech: &'a Address,
    pub activity_checker: &'a Address,
    pub service_id: ServiceId,
    pub safe: &'a Address,
    pub render_offset: FixedOffset,
}

/// Produce a staking snapshot for one service.
///
/// Ledger failures wrap into the staking-status error; a metadata fetch
/// failure keeps its own distinct error so callers can tell the two apart.
pub async fn get_staking_status(
    ledger: &dyn LedgerReader,
    metadata_store: &dyn MetadataStore,
    params: StatusParams<'_>,
) -> Result<StakingStatus> {
    let StatusParams {
        staking_contract,
        mech,
        activity_checker,
        service_id,
        safe,
        render_offset,
    } = params;

    let accrued = ledger
        .accrued_rewards(staking_contract, service_id)
        .await
        .map_err(wrap)?;

    let lifetime_requests = mech_request_count(ledger, mech, safe).await.map_err(wrap)?;

    let nonces = ledger
        .checkpoint_nonces(staking_contract, service_id)
        .await
        .map_err(wrap)?;
    let requests_at_checkpoint = nonces.get(1).copied().unwrap_or(0);

    let mech_requests_this_epoch = lifetime_requests as i64 - requests_at_checkpoint as i64;
    if mech_requests_this_epoch < 0 {
        // Lifetime counter behind the checkpoint counter: checkpoint data is
        // stale or the mech address is wrong. Keep the signed value visible.
        warn!(
            "service {} request count went backwards: lifetime {lifetime_requests} < checkpoint {requests_at_checkpoint}",
            service_id.0
        );
    }

    let liveness_ratio = ledger.liveness_ratio(activity_checker).await.map_err(wrap)?;
    let required_mech_requests = required_daily_requests(liveness_ratio);

    let liveness_period = ledger.liveness_period(staking_contract).await.map_err(wrap)?;
    let checkpoint_ts = ledger.ts_checkpoint(staking_contract).await.map_err(wrap)?;
    let epoch_end_ts = checkpoint_ts.saturating_add(liveness_period);
    let epoch_end = Utc
        .timestamp_opt(epoch_end_ts as i64, 0)
        .single()
        .ok_or_else(|| wrap(Error::Ledger(format!("epoch end out of range: {epoch_end_ts}"))))?
        .with_timezone(&render_offset);

    let metadata_hash = ledger.metadata_hash(staking_contract).await.map_err(wrap)?;
    let metadata = metadata_store.fetch(&metadata_hash).await?;

    Ok(StakingStatus {
        accrued_rewards_olas: wei_to_olas(accrued),
        mech_requests_this_epoch,
        required_mech_requests,
        epoch_end,
        metadata,
    })
}

fn wrap(e: Error) -> Error {
    Error::StakingStatus(Box::new(e))
}

/// Free slots per known staking contract, in table order.
pub async fn available_slots(ledger: &dyn LedgerReader) -> Result<Vec<(&'static str, u32)>> {
    let mut slots = Vec::new();
    for program in contracts::STAKING_PROGRAMS {
        let ids = ledger.service_ids(&program.contract_address()).await?;
        slots.push((program.name, program.slots.saturating_sub(ids.len() as u32)));
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockLedger, MockMetadataStore};

    fn addr(n: u8) -> Address {
        Address::new(format!("0x{:040x}", n as u64)).unwrap()
    }

    #[test]
    fn wei_to_olas_uses_18_decimals() {
        assert_eq!(wei_to_olas(0), 0.0);
        assert_eq!(wei_to_olas(1_000_000_000_000_000_000), 1.0);
        assert_eq!(wei_to_olas(2_500_000_000_000_000_000), 2.5);
    }

    #[test]
    fn required_requests_rounds_up() {
        // ratio = 1e18 / 86400: one request per day.
        assert_eq!(required_daily_requests(WAD / 86_400), 1);
        // One unit above the exact rate must round up, not down.
        assert_eq!(required_daily_requests(WAD / 86_400 + 1), 2);
        assert_eq!(required_daily_requests(0), 0);
        // ten per day.
        assert_eq!(required_daily_requests(115_740_740_740_740), 10);
        assert_eq!(required_daily_requests(115_740_740_740_741), 11);
    }

    #[tokio::test]
    async fn request_count_prefers_legacy_getter() {
        let ledger = MockLedger {
            requests_count_legacy: Some(7),
            requests_count: Some(99),
            ..MockLedger::default()
        };
        assert_eq!(
            mech_request_count(&ledger, &addr(1), &addr(2)).await.unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn request_count_falls_back_to_new_getter() {
        let ledger = MockLedger {
            requests_count_legacy: None,
            requests_count: Some(99),
            ..MockLedger::default()
        };
        assert_eq!(
            mech_request_count(&ledger, &addr(1), &addr(2)).await.unwrap(),
            99
        );
    }

    fn full_ledger() -> MockLedger {
        MockLedger {
            accrued_rewards: Some(1_500_000_000_000_000_000),
            requests_count_legacy: Some(15),
            checkpoint_nonces: Some(vec![3, 10]),
            liveness_ratio: Some(WAD / 86_400 + 1), // two requests per day after ceiling
            liveness_period: Some(86_400),
            ts_checkpoint: Some(1_700_000_000),
            metadata_hash: Some("abcd".to_string()),
            ..MockLedger::default()
        }
    }

    #[tokio::test]
    async fn status_combines_all_reads() {
        let ledger = full_ledger();
        let metadata = MockMetadataStore::with_value(serde_json::json!({"name": "Program"}));

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let status = get_staking_status(
            &ledger,
            &metadata,
            StatusParams {
                staking_contract: &addr(1),
                mech: &addr(2),
                activity_checker: &addr(3),
                service_id: ServiceId(42),
                safe: &addr(4),
                render_offset: offset,
            },
        )
        .await
        .unwrap();

        assert_eq!(status.accrued_rewards_olas, 1.5);
        assert_eq!(status.mech_requests_this_epoch, 5); // 15 lifetime - 10 at checkpoint
        assert_eq!(status.required_mech_requests, 2);
        assert_eq!(status.epoch_end.timestamp(), 1_700_086_400);
        assert_eq!(status.epoch_end.offset(), &offset);
        assert_eq!(status.metadata["name"], "Program");
    }

    #[tokio::test]
    async fn status_treats_missing_checkpoint_nonces_as_zero() {
        let ledger = MockLedger {
            checkpoint_nonces: Some(Vec::new()),
            ..full_ledger()
        };
        let metadata = MockMetadataStore::with_value(serde_json::json!({}));

        let status = get_staking_status(
            &ledger,
            &metadata,
            StatusParams {
                staking_contract: &addr(1),
                mech: &addr(2),
                activity_checker: &addr(3),
                service_id: ServiceId(42),
                safe: &addr(4),
                render_offset: FixedOffset::east_opt(0).unwrap(),
            },
        )
        .await
        .unwrap();

        assert_eq!(status.mech_requests_this_epoch, 15);
    }

    #[tokio::test]
    async fn status_surfaces_negative_epoch_count() {
        let ledger = MockLedger {
            requests_count_legacy: Some(4),
            checkpoint_nonces: Some(vec![0, 10]),
            ..full_ledger()
        };
        let metadata = MockMetadataStore::with_value(serde_json::json!({}));

        let status = get_staking_status(
            &ledger,
            &metadata,
            StatusParams {
                staking_contract: &addr(1),
                mech: &addr(2),
                activity_checker: &addr(3),
                service_id: ServiceId(42),
                safe: &addr(4),
                render_offset: FixedOffset::east_opt(0).unwrap(),
            },
        )
        .await
        .unwrap();

        // Not clamped: stale checkpoints must be visible to operators.
        assert_eq!(status.mech_requests_this_epoch, -6);
    }

    #[tokio::test]
    async fn ledger_failure_wraps_as_staking_status_error() {
        let ledger = MockLedger {
            accrued_rewards: None,
            ..full_ledger()
        };
        let metadata = MockMetadataStore::with_value(serde_json::json!({}));

        let err = get_staking_status(
            &ledger,
            &metadata,
            StatusParams {
                staking_contract: &addr(1),
                mech: &addr(2),
                activity_checker: &addr(3),
                service_id: ServiceId(42),
                safe: &addr(4),
                render_offset: FixedOffset::east_opt(0).unwrap(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::StakingStatus(_)));
        assert!(err.to_string().starts_with("failed to get staking status"));
    }

    #[tokio::test]
    async fn metadata_failure_keeps_its_own_error() {
        let ledger = full_ledger();
        let metadata = MockMetadataStore::failing(404);

        let err = get_staking_status(
            &ledger,
            &metadata,
            StatusParams {
                staking_contract: &addr(1),
                mech: &addr(2),
                activity_checker: &addr(3),
                service_id: ServiceId(42),
                safe: &addr(4),
                render_offset: FixedOffset::east_opt(0).unwrap(),
            },
        )
        .await
        .unwrap_err();

        match err {
            Error::MetadataFetch { address, reason } => {
                assert!(address.contains("abcd"));
                assert_eq!(reason, "404");
            }
            other => panic!("expected MetadataFetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slots_subtract_staked_services() {
        let ledger = MockLedger {
            service_ids: Some(vec![1, 2, 3]),
            ..MockLedger::default()
        };

        let slots = available_slots(&ledger).await.unwrap();
        assert_eq!(slots.len(), contracts::STAKING_PROGRAMS.len());
        assert_eq!(slots[0], ("Hobbyist (100 OLAS)", 97));
    }
}
