use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};

use framed_chat::{
    Dialer,
    bot::ChatBot,
    cli::{self, BotArgs},
    console::{self, InputMode},
};

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_tracing();

    let args = match cli::parse_args::<BotArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chatbot: {err:#}");
            cli::failure()
        }
    }
}

async fn run(args: BotArgs) -> Result<()> {
    let BotArgs { dial } = args;
    let conn = Dialer::new(Arc::new(ChatBot))
        .spawn(dial.host, dial.service)
        .wait()
        .await
        .context("could not join the chat room")?;
    console::run_console(&conn, InputMode::Discard).await
}
