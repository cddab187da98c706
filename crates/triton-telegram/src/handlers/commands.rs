use std::collections::HashSet;
use std::sync::Arc;

use tracing::error;

use triton_core::{
    domain::ChatId,
    formatting,
    staking::{self, wei_to_olas},
    Result,
};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

pub async fn handle_command(text: &str, state: Arc<AppState>) {
    let chat = ChatId(state.cfg.chat_id);
    let (cmd, _args) = parse_command(text);

    let outcome = match cmd.as_str() {
        "staking_status" => staking_status(&state, chat).await,
        "balance" => balance(&state, chat).await,
        "claim" => claim(&state, chat).await,
        "withdraw" => withdraw(&state, chat).await,
        "slots" => slots(&state, chat).await,
        "jobs" => jobs(&state, chat).await,
        "ip" => ip(&state, chat).await,
        _ => Ok(()),
    };

    if let Err(e) = outcome {
        error!("command /{cmd} failed: {e}");
    }
}

async fn staking_status(state: &AppState, chat: ChatId) -> Result<()> {
    let mut messages = Vec::new();
    let mut total_rewards = 0.0;
    let mut agent_safe_olas = 0.0;
    let mut master_safe_olas = 0.0;
    let mut seen_master_safes = HashSet::new();

    for service in state.registry.iter() {
        let status = match service.staking_status().await {
            Ok(status) => status,
            Err(e) => {
                error!("staking status failed for {}: {e}", service.label());
                messages.push(format!("[{}] Failed to get staking status", service.label()));
                continue;
            }
        };
        total_rewards += status.accrued_rewards_olas;
        messages.push(formatting::staking_status_message(service.label(), &status));

        let balances = match service.check_balance().await {
            Ok(balances) => balances,
            Err(e) => {
                error!("balance check failed for {}: {e}", service.label());
                continue;
            }
        };
        agent_safe_olas += balances.service_safe_olas;
        if let Some(master_safe) = service.master_safe() {
            // Several services can share one master safe; count it once.
            if seen_master_safes.insert(master_safe) {
                master_safe_olas += balances.master_safe_olas;
            }
        }
    }

    let price = state.price.olas_usd().await;
    messages.push(formatting::rewards_total_message(
        total_rewards,
        agent_safe_olas,
        master_safe_olas,
        price,
    ));

    state.messenger.send_text(chat, &messages.join("\n\n")).await
}

async fn balance(state: &AppState, chat: ChatId) -> Result<()> {
    let mut messages = Vec::new();

    for service in state.registry.iter() {
        let balances = match service.check_balance().await {
            Ok(balances) => balances,
            Err(e) => {
                error!("balance check failed for {}: {e}", service.label());
                messages.push(format!(
                    "\\[{}\\] Failed to check balances",
                    formatting::escape_markdown_v2(service.label())
                ));
                continue;
            }
        };

        // check_balance validated both of these.
        let (Ok(agent), Some(master_safe)) = (service.agent_address(), service.master_safe())
        else {
            continue;
        };

        messages.push(formatting::balance_message(
            service.label(),
            &balances,
            agent,
            service.service_safe(),
            &service.master_eoa(),
            &master_safe,
        ));
    }

    state
        .messenger
        .send_markdown(chat, &messages.join("\n\n"))
        .await
}

async fn claim(state: &AppState, chat: ChatId) -> Result<()> {
    if !state.cfg.manual_claim {
        return state.messenger.send_text(chat, "Manual claim is disabled").await;
    }

    let mut messages = Vec::new();
    for service in state.registry.iter() {
        let claimed_wei = match service.claim_rewards().await {
            Ok(claimed_wei) => claimed_wei,
            Err(e) => {
                error!("failed to claim rewards for {}: {e}", service.label());
                continue;
            }
        };
        if claimed_wei == 0 {
            continue;
        }
        messages.push(formatting::claim_message(
            service.label(),
            wei_to_olas(claimed_wei),
        ));
    }

    let reply = if messages.is_empty() {
        "No rewards claimed".to_string()
    } else {
        messages.join("\n\n")
    };
    state.messenger.send_text(chat, &reply).await
}

async fn withdraw(state: &AppState, chat: ChatId) -> Result<()> {
    let mut messages = Vec::new();

    for service in state.registry.iter() {
        let Some(to) = service.withdrawal_address().cloned() else {
            messages.push(formatting::cannot_withdraw_message(service.label(), false));
            continue;
        };

        match service.withdraw_rewards().await {
            Ok(report) => {
                for (source, e) in &report.failures {
                    error!("{source} withdrawal failed for {}: {e}", service.label());
                }
                if report.withdrawals.is_empty() {
                    messages.push(formatting::cannot_withdraw_message(service.label(), false));
                } else {
                    for withdrawal in &report.withdrawals {
                        messages.push(formatting::withdrawal_message(
                            service.label(),
                            withdrawal,
                            &to,
                            false,
                        ));
                    }
                }
            }
            Err(e) => {
                error!("withdrawal failed for {}: {e}", service.label());
                messages.push(formatting::cannot_withdraw_message(service.label(), false));
            }
        }
    }

    state
        .messenger
        .send_markdown(chat, &messages.join("\n\n"))
        .await
}

async fn slots(state: &AppState, chat: ChatId) -> Result<()> {
    match staking::available_slots(state.ledger.as_ref()).await {
        Ok(slots) => {
            state
                .messenger
                .send_text(chat, &formatting::slots_message(&slots))
                .await
        }
        Err(e) => {
            error!("slots lookup failed: {e}");
            state
                .messenger
                .send_text(chat, "Failed to fetch staking slots")
                .await
        }
    }
}

async fn jobs(state: &AppState, chat: ChatId) -> Result<()> {
    let runs = state.scheduler.next_runs();
    state
        .messenger
        .send_text(
            chat,
            &formatting::jobs_message(&runs, state.cfg.local_time_offset),
        )
        .await
}

async fn ip(state: &AppState, chat: ChatId) -> Result<()> {
    let ip = match public_ip().await {
        Ok(ip) => ip,
        Err(e) => {
            error!("failed to get public IP: {e}");
            "Unavailable".to_string()
        }
    };
    state
        .messenger
        .send_text(chat, &format!("Public IP address: {ip}"))
        .await
}

async fn public_ip() -> std::result::Result<String, reqwest::Error> {
    let ip = reqwest::get("https://api.ipify.org").await?.text().await?;
    Ok(ip.trim().to_string())
}
