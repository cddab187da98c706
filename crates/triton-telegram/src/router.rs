use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{info, warn};

use triton_core::{
    config::Config,
    domain::ChatId,
    ports::{LedgerReader, Messenger, PriceFeed},
    registry::ServiceRegistry,
    scheduler::Scheduler,
    tasks::{AutoclaimJob, BalanceAlertJob},
};

use crate::{handlers, TelegramMessenger};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub registry: Arc<ServiceRegistry>,
    pub ledger: Arc<dyn LedgerReader>,
    pub price: Arc<dyn PriceFeed>,
    pub messenger: Arc<dyn Messenger>,
    pub scheduler: Arc<Scheduler>,
}

pub async fn run_polling(
    cfg: Arc<Config>,
    registry: Arc<ServiceRegistry>,
    ledger: Arc<dyn LedgerReader>,
    price: Arc<dyn PriceFeed>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_token.clone());

    if let Ok(me) = bot.get_me().await {
        info!("triton started: @{}", me.username());
    }
    info!("watching {} services", registry.len());

    if let Err(e) = bot
        .set_my_commands(vec![
            BotCommand::new("staking_status", "Staking status"),
            BotCommand::new("balance", "Check wallet balances"),
            BotCommand::new("claim", "Claim rewards"),
            BotCommand::new("withdraw", "Withdraw rewards"),
            BotCommand::new("slots", "Check available staking slots"),
            BotCommand::new("jobs", "Check the scheduled jobs"),
            BotCommand::new("ip", "Get the bot public IP"),
        ])
        .await
    {
        warn!("failed to register bot commands: {e}");
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));

    let mut scheduler = Scheduler::new();
    scheduler.register(Arc::new(BalanceAlertJob::new(
        registry.clone(),
        messenger.clone(),
        cfg.clone(),
    )));
    scheduler.register(Arc::new(AutoclaimJob::new(
        registry.clone(),
        messenger.clone(),
        cfg.clone(),
    )));
    scheduler.start();
    let scheduler = Arc::new(scheduler);

    // Startup notice, shortly after boot (best-effort).
    {
        let messenger = messenger.clone();
        let chat = ChatId(cfg.chat_id);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            if let Err(e) = messenger.send_text(chat, "Triton has started").await {
                warn!("startup notification failed: {e}");
            }
        });
    }

    let state = Arc::new(AppState {
        cfg,
        registry,
        ledger,
        price,
        messenger,
        scheduler,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
