use std::sync::Arc;

use anyhow::Context;

use intake_bot::bot::{Bot, MessageHandler};
use intake_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use intake_bot::config::{BotConfig, SheetsConfig};
use intake_bot::store::{GoogleSheetsClient, MemorySheet, RecordStore, SheetStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let bot_config = BotConfig::from_env().context("invalid bot configuration")?;
    let sheets_config = SheetsConfig::from_env();

    eprintln!("📋 Intake Bot v{}", env!("CARGO_PKG_VERSION"));

    // ── Record store ─────────────────────────────────────────────────────
    let store = Arc::new(build_store(&sheets_config));
    if store.is_configured() {
        // Makes sure row 1 carries the column names; never fatal.
        if let Err(e) = store.setup_headers().await {
            tracing::warn!(error = %e, "Could not write sheet headers");
        }
    }

    // ── Channels ─────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    let mut active_channels = vec!["cli"];

    // Always add CLI
    channels.add(Box::new(CliChannel::new()));

    // Conditionally add Telegram if a bot token is set
    if let Some(token) = bot_config.bot_token.clone() {
        let allowed_users = bot_config.allowed_users.clone();
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                allowed_users.join(", ")
            }
        );
        channels.add(Box::new(TelegramChannel::new(token, allowed_users)));
        active_channels.push("telegram");
    }

    if !bot_config.admin_users.is_empty() {
        eprintln!("   Operators: {}", bot_config.admin_users.join(", "));
    }
    eprintln!("   Channels: {}", active_channels.join(", "));
    eprintln!("   Type a message and press Enter. Ctrl+C to exit.\n");

    let lane_idle_timeout = bot_config.lane_idle_timeout;
    let handler = MessageHandler::new(store, bot_config);
    Bot::new(handler, channels, lane_idle_timeout).run().await?;

    Ok(())
}

/// Pick the sheet backend: in-process for local runs, Google Sheets when
/// fully configured, otherwise a disabled store.
fn build_store(config: &SheetsConfig) -> SheetStore {
    if config.local_sheet {
        eprintln!("   Sheet: in-memory ({})", config.sheet_name);
        return SheetStore::new(Arc::new(MemorySheet::new()), config.sheet_name.clone());
    }

    let (Some(spreadsheet_id), Some(key_json)) =
        (&config.spreadsheet_id, &config.service_account_json)
    else {
        tracing::warn!("Google Sheets not configured; store calls will fail");
        eprintln!("   Sheet: disabled");
        return SheetStore::disabled();
    };

    match GoogleSheetsClient::new(spreadsheet_id, key_json) {
        Ok(client) => {
            eprintln!(
                "   Sheet: {} / {} (as {})",
                spreadsheet_id,
                config.sheet_name,
                client.client_email()
            );
            SheetStore::new(Arc::new(client), config.sheet_name.clone())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Google Sheets credentials rejected; store disabled");
            eprintln!("   Sheet: disabled ({e})");
            SheetStore::disabled()
        }
    }
}
