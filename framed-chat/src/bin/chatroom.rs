use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use tracing::info;

use framed_chat::{
    Listener,
    cli::{self, RoomArgs},
    room::ChatRoom,
};

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_tracing();

    let args = match cli::parse_args::<RoomArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chatroom: {err:#}");
            cli::failure()
        }
    }
}

async fn run(args: RoomArgs) -> Result<()> {
    let listener = Listener::bind((args.bind, args.port), Arc::new(ChatRoom::new()))
        .await
        .with_context(|| format!("failed to listen on {}:{}", args.bind, args.port))?;
    let addr = listener.local_addr()?;
    info!("chat room listening on {addr}");
    listener.run_until_ctrl_c().await;
    Ok(())
}
