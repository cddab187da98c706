//! Chat message construction (Telegram MarkdownV2 + plain text).
//!
//! All builders are pure so the exact message text is unit-testable without a
//! bot in the loop.

use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::{Address, BalanceSnapshot, StakingStatus, Withdrawal};

pub const GNOSISSCAN_ADDRESS_URL: &str = "https://gnosisscan.io/address/";
pub const GNOSISSCAN_TX_URL: &str = "https://gnosisscan.io/tx/";

/// Escape a text fragment for Telegram MarkdownV2 parse mode.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Compact decimal rendering: up to six fractional digits, trailing zeros
/// trimmed ("2", "0.5", "1.234567").
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{value:.6}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn address_link(text: &str, address: &Address) -> String {
    format!(
        "[{}]({GNOSISSCAN_ADDRESS_URL}{address})",
        escape_markdown_v2(text)
    )
}

fn label_prefix(label: &str) -> String {
    format!("\\[{}\\]", escape_markdown_v2(label))
}

/// One service's block in the `/staking_status` reply (plain text).
pub fn staking_status_message(label: &str, status: &StakingStatus) -> String {
    let program_name = status
        .metadata
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    format!(
        "[{label}] {:.2} OLAS [{}/{}]\nStaking program: {program_name}\nNext epoch: {}",
        status.accrued_rewards_olas,
        status.mech_requests_this_epoch,
        status.required_mech_requests,
        status.epoch_end.format("%Y-%m-%d %H:%M:%S %:z"),
    )
}

/// The totals line closing the `/staking_status` reply (plain text).
pub fn rewards_total_message(
    accrued: f64,
    agent_safe_olas: f64,
    master_safe_olas: f64,
    olas_usd: Option<f64>,
) -> String {
    let combined = accrued + agent_safe_olas + master_safe_olas;
    let mut message = format!("Total rewards = {} OLAS", format_amount(combined));

    let mut breakdown = Vec::new();
    if accrued > 0.0 {
        breakdown.push(format!("{} accrued", format_amount(accrued)));
    }
    if agent_safe_olas > 0.0 {
        breakdown.push(format!("{} in agent safes", format_amount(agent_safe_olas)));
    }
    if master_safe_olas > 0.0 {
        breakdown.push(format!(
            "{} in master safes",
            format_amount(master_safe_olas)
        ));
    }
    if !breakdown.is_empty() {
        message.push_str(&format!(" ({})", breakdown.join(" + ")));
    }

    if let Some(price) = olas_usd {
        message.push_str(&format!(" [${}]", format_amount(combined * price)));
    }

    message
}

/// One service's block in the `/balance` reply (MarkdownV2).
pub fn balance_message(
    label: &str,
    snapshot: &BalanceSnapshot,
    agent: &Address,
    service_safe: &Address,
    master_eoa: &Address,
    master_safe: &Address,
) -> String {
    let amount = |v: f64| escape_markdown_v2(&format_amount(v));

    format!(
        "{}\n{} \\= {} xDAI\n{} \\= {} xDAI  {} wxDAI  {} OLAS\n{} \\= {} xDAI\n{} \\= {} xDAI  {} OLAS",
        label_prefix(label),
        address_link("Agent EOA", agent),
        amount(snapshot.agent_eoa_native),
        address_link("Service Safe", service_safe),
        amount(snapshot.service_safe_native),
        amount(snapshot.service_safe_wrapped_native),
        amount(snapshot.service_safe_olas),
        address_link("Master EOA", master_eoa),
        amount(snapshot.master_eoa_native),
        address_link("Master Safe", master_safe),
        amount(snapshot.master_safe_native),
        amount(snapshot.master_safe_olas),
    )
}

/// One claimed-rewards line in the `/claim` reply (plain text).
pub fn claim_message(label: &str, claimed_olas: f64) -> String {
    format!(
        "[{label}] Claimed {} OLAS rewards into the Master safe.",
        format_amount(claimed_olas)
    )
}

/// One executed withdrawal in the `/withdraw` or autoclaim reply (MarkdownV2).
pub fn withdrawal_message(
    label: &str,
    withdrawal: &Withdrawal,
    to: &Address,
    autoclaim: bool,
) -> String {
    let prefix = if autoclaim { "\\(Autoclaim\\) " } else { "" };
    format!(
        "{} {prefix}Sent the [withdrawal transaction]({GNOSISSCAN_TX_URL}{})\\. {} OLAS sent from the {} to [{}]({GNOSISSCAN_ADDRESS_URL}{to}) \\#withdraw",
        label_prefix(label),
        withdrawal.tx_hash,
        escape_markdown_v2(&format_amount(withdrawal.amount_olas)),
        withdrawal.source,
        escape_markdown_v2(to.as_str()),
    )
}

/// The "nothing withdrawn" line (MarkdownV2).
pub fn cannot_withdraw_message(label: &str, autoclaim: bool) -> String {
    let prefix = if autoclaim { "\\(Autoclaim\\) " } else { "" };
    format!("{} {prefix}Cannot withdraw rewards", label_prefix(label))
}

/// Low-balance alert for the agent EOA (MarkdownV2).
pub fn agent_balance_alert(label: &str, agent: &Address, balance: f64) -> String {
    format!(
        "{} {} balance is {} xDAI",
        label_prefix(label),
        address_link("Agent EOA", agent),
        escape_markdown_v2(&format_amount(balance)),
    )
}

/// Low-balance alert for the service safe (MarkdownV2).
pub fn service_safe_alert(label: &str, safe: &Address, native: f64, wrapped: f64) -> String {
    format!(
        "{} {} balance is {} xDAI  {} wxDAI",
        label_prefix(label),
        address_link("Service Safe", safe),
        escape_markdown_v2(&format_amount(native)),
        escape_markdown_v2(&format_amount(wrapped)),
    )
}

/// Low-balance alert for the master safe (MarkdownV2).
pub fn master_safe_alert(label: &str, safe: &Address, balance: f64) -> String {
    format!(
        "{} {} balance is {} xDAI",
        label_prefix(label),
        address_link("Master Safe", safe),
        escape_markdown_v2(&format_amount(balance)),
    )
}

/// The `/jobs` reply: one line per job with its next run in the configured
/// offset (plain text).
pub fn jobs_message(
    runs: &[(String, Option<DateTime<Utc>>)],
    offset: FixedOffset,
) -> String {
    if runs.is_empty() {
        return "No scheduled jobs".to_string();
    }

    runs.iter()
        .map(|(name, next)| {
            let next = match next {
                Some(dt) => dt
                    .with_timezone(&offset)
                    .format("%Y-%m-%d %H:%M:%S %:z")
                    .to_string(),
                None => "N/A".to_string(),
            };
            format!("• {name}: {next}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `/slots` reply (plain text).
pub fn slots_message(slots: &[(&str, u32)]) -> String {
    slots
        .iter()
        .map(|(name, free)| format!("[{name}] {free} available slots"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TxHash, WithdrawalSource};
    use chrono::TimeZone;

    fn addr(n: u8) -> Address {
        Address::new(format!("0x{:040x}", n as u64)).unwrap()
    }

    #[test]
    fn markdown_escaping_covers_reserved_chars() {
        assert_eq!(escape_markdown_v2("a.b-c"), "a\\.b\\-c");
        assert_eq!(escape_markdown_v2("x_y"), "x\\_y");
        assert_eq!(escape_markdown_v2("(1+2)=3!"), "\\(1\\+2\\)\\=3\\!");
        assert_eq!(escape_markdown_v2("plain"), "plain");
    }

    #[test]
    fn amounts_render_compactly() {
        assert_eq!(format_amount(2.0), "2");
        assert_eq!(format_amount(0.5), "0.5");
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(1.2345678), "1.234568");
        assert_eq!(format_amount(100.10), "100.1");
    }

    #[test]
    fn staking_status_block_shape() {
        let status = StakingStatus {
            accrued_rewards_olas: 10.5,
            mech_requests_this_epoch: 5,
            required_mech_requests: 10,
            epoch_end: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2025, 7, 21, 12, 0, 0)
                .unwrap(),
            metadata: serde_json::json!({"name": "Staking Program 1"}),
        };

        let message = staking_status_message("op-trader", &status);
        assert_eq!(
            message,
            "[op-trader] 10.50 OLAS [5/10]\nStaking program: Staking Program 1\nNext epoch: 2025-07-21 12:00:00 +00:00"
        );
    }

    #[test]
    fn totals_line_includes_breakdown_and_value() {
        let message = rewards_total_message(10.0, 2.0, 3.0, Some(2.0));
        assert_eq!(
            message,
            "Total rewards = 15 OLAS (10 accrued + 2 in agent safes + 3 in master safes) [$30]"
        );

        let bare = rewards_total_message(0.0, 0.0, 0.0, None);
        assert_eq!(bare, "Total rewards = 0 OLAS");
    }

    #[test]
    fn balance_block_links_every_address() {
        let snapshot = BalanceSnapshot {
            agent_eoa_native: 0.5,
            service_safe_native: 2.0,
            service_safe_wrapped_native: 1.0,
            master_eoa_native: 1.5,
            master_safe_native: 3.0,
            master_safe_olas: 4.0,
            service_safe_olas: 100.0,
        };
        let message = balance_message(
            "op-trader",
            &snapshot,
            &addr(1),
            &addr(2),
            &addr(3),
            &addr(4),
        );

        assert!(message.starts_with("\\[op\\-trader\\]\n"));
        assert!(message.contains(&format!("[Agent EOA]({GNOSISSCAN_ADDRESS_URL}{})", addr(1))));
        assert!(message.contains("\\= 0\\.5 xDAI"));
        assert!(message.contains("100 OLAS"));
        assert_eq!(message.lines().count(), 5);
    }

    #[test]
    fn withdrawal_line_marks_autoclaim_runs() {
        let withdrawal = Withdrawal {
            tx_hash: TxHash("0xabc".to_string()),
            amount_olas: 50.0,
            source: WithdrawalSource::MasterSafe,
        };

        let manual = withdrawal_message("op-trader", &withdrawal, &addr(9), false);
        assert!(manual.contains("Sent the [withdrawal transaction]"));
        assert!(manual.contains("50 OLAS sent from the Master Safe"));
        assert!(manual.contains("\\#withdraw"));
        assert!(!manual.contains("Autoclaim"));

        let auto = withdrawal_message("op-trader", &withdrawal, &addr(9), true);
        assert!(auto.contains("\\(Autoclaim\\) Sent the"));
    }

    #[test]
    fn jobs_listing_renders_offset_and_missing_runs() {
        let runs = vec![
            (
                "balance_check".to_string(),
                Some(Utc.with_ymd_and_hms(2026, 8, 6, 14, 0, 0).unwrap()),
            ),
            ("autoclaim".to_string(), None),
        ];
        let message = jobs_message(&runs, FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            message,
            "• balance_check: 2026-08-06 16:00:00 +02:00\n• autoclaim: N/A"
        );

        assert_eq!(jobs_message(&[], FixedOffset::east_opt(0).unwrap()), "No scheduled jobs");
    }

    #[test]
    fn slots_listing() {
        let message = slots_message(&[("Hobbyist (100 OLAS)", 97), ("Expert (1k OLAS)", 0)]);
        assert_eq!(
            message,
            "[Hobbyist (100 OLAS)] 97 available slots\n[Expert (1k OLAS)] 0 available slots"
        );
    }
}
