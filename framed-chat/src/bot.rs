//! Chat bot answering `!echo` and `!eval` commands on its own connection.

use tracing::{debug, warn};

use crate::{
    application::Application, connection::ConnectionHandle, console, error::TransportError, eval,
};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Commands the bot understands, borrowed from the incoming message.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Echo(&'a str),
    Eval(&'a str),
}

impl<'a> Command<'a> {
    /// Splits `message` into a command word and its argument at the first
    /// space. Without a space the whole message is both the word and the
    /// argument, so a bare `!echo` echoes itself. Unknown command words yield
    /// `None`.
    pub fn parse(message: &'a str) -> Option<Self> {
        let trimmed = message.trim_start().trim_end_matches(LINE_ENDINGS);
        let (word, rest) = trimmed.split_once(' ').unwrap_or((trimmed, trimmed));
        match word {
            "!echo" => Some(Command::Echo(rest)),
            "!eval" => Some(Command::Eval(rest)),
            _ => None,
        }
    }
}

/// Computes the bot's reply to `message`, if any.
pub fn respond(message: &str) -> Option<String> {
    match Command::parse(message)? {
        Command::Echo(text) => Some(text.to_string()),
        Command::Eval(expression) => Some(match eval::evaluate(expression) {
            Ok(answer) => answer.to_string(),
            Err(error) => format!("Invalid input to eval: {error}"),
        }),
    }
}

#[derive(Debug, Default)]
pub struct ChatBot;

impl Application for ChatBot {
    fn on_connected(&self, conn: &ConnectionHandle) {
        debug!(id = %conn.id(), "bot connected");
    }

    fn on_message(&self, conn: &ConnectionHandle, payload: &[u8]) -> bool {
        if let Err(error) = console::print_payload(payload) {
            debug!(%error, "failed to echo message");
        }

        let message = String::from_utf8_lossy(payload);
        if let Some(reply) = respond(&message) {
            if let Err(error) = conn.write(reply) {
                warn!(%error, "failed to queue reply");
            }
        }
        true
    }

    fn on_closed(&self, _conn: &ConnectionHandle, error: Option<&TransportError>) {
        if error.is_some() {
            println!("Disconnected from session by host.");
        }
    }
}
