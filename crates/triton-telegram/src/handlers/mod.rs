//! Telegram update handlers.
//!
//! Only commands from the configured chat are acted on; everything else is
//! ignored.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with('/') {
        return Ok(());
    }

    if msg.chat.id.0 != state.cfg.chat_id {
        warn!("ignoring command from unknown chat {}", msg.chat.id.0);
        return Ok(());
    }

    commands::handle_command(text, state).await;
    Ok(())
}
