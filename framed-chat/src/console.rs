//! Terminal glue shared by the `chatbot` and `chat-client` binaries.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use tokio::{select, sync::mpsc};
use tracing::{debug, warn};

use crate::connection::ConnectionHandle;

/// What to do with lines typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Send every line as one frame.
    Forward,
    /// Read lines but drop them; stdin only signals when to quit.
    Discard,
}

/// Writes a received payload to stdout, followed by a newline.
pub fn print_payload(payload: &[u8]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(payload)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

/// Pumps stdin into `conn` until stdin ends, Ctrl-C is pressed or the
/// connection closes on its own. The connection is then closed and the call
/// returns once teardown has completed.
pub async fn run_console(conn: &ConnectionHandle, mode: InputMode) -> Result<()> {
    let mut lines = spawn_stdin_reader();

    loop {
        select! {
            line = lines.recv() => {
                if !handle_stdin_line(line, conn, mode)? {
                    break;
                }
            }
            () = conn.closed() => {
                debug!(id = %conn.id(), "connection closed; leaving console");
                return Ok(());
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                handle_ctrl_c(ctrl_c);
                break;
            }
        }
    }

    conn.close();
    conn.closed().await;
    Ok(())
}

// Tokio's stdin parks a blocking-pool thread that can hold up runtime
// shutdown, so lines are read on a plain thread instead.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

fn handle_stdin_line(
    line: Option<io::Result<String>>,
    conn: &ConnectionHandle,
    mode: InputMode,
) -> Result<bool> {
    let Some(line) = line else {
        return Ok(false);
    };
    let line = line?;

    if mode == InputMode::Forward {
        if let Err(error) = conn.write(line.trim_end_matches('\r')) {
            warn!(%error, "failed to queue line");
            return Ok(false);
        }
    }
    Ok(true)
}

fn handle_ctrl_c(result: io::Result<()>) {
    if let Err(error) = result {
        warn!(?error, "ctrl-c handler failed");
    }
}
