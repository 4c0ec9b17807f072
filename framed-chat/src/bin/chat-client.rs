use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};

use framed_chat::{
    Dialer,
    cli::{self, ClientArgs},
    client::ChatClient,
    console::{self, InputMode},
};

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_tracing();

    let args = match cli::parse_args::<ClientArgs>() {
        Ok(args) => args,
        Err(code) => return code,
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("chat-client: {err:#}");
            cli::failure()
        }
    }
}

async fn run(args: ClientArgs) -> Result<()> {
    let ClientArgs { dial } = args;
    let conn = Dialer::new(Arc::new(ChatClient))
        .connect(&dial.host, &dial.service)
        .await
        .with_context(|| format!("could not join {}:{}", dial.host, dial.service))?;
    console::run_console(&conn, InputMode::Forward).await
}
