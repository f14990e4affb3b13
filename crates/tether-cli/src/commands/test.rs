//! `tether test` -- verify the bot token and chat id end to end.

use std::io::Write;
use std::process::ExitCode;

use anyhow::{bail, Context};

use tether_types::TetherConfig;

use crate::GlobalArgs;

const TEST_MESSAGE: &str = "*Tether connected*\n\nThis chat will receive loop notifications\\. \
                            Send /help for remote commands\\.";

/// Run `tether test`.
pub fn run(global: &GlobalArgs, config: TetherConfig) -> anyhow::Result<ExitCode> {
    let bridge = super::bridge(global, config);
    if !bridge.is_configured() {
        bail!(
            "telegram is not configured: set telegram.enabled, telegram.bot_token and \
             telegram.chat_id (or TETHER_TELEGRAM__* variables)"
        );
    }
    let rt = super::runtime()?;

    rt.block_on(async {
        print!("Checking bot token... ");
        std::io::stdout().flush()?;
        let bot = bridge
            .identify()
            .await
            .context("getMe failed, check the bot token")?;
        println!("ok ({})", bot.handle());

        print!("Sending test message... ");
        std::io::stdout().flush()?;
        let delivery = bridge
            .notifier()
            .send_reply(TEST_MESSAGE)
            .await
            .context("sendMessage failed, check the chat id")?;
        if delivery.was_sent() {
            println!("ok");
        } else {
            println!("not sent ({delivery:?})");
        }
        Ok::<_, anyhow::Error>(ExitCode::SUCCESS)
    })
}
