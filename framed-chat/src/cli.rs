use std::{net::IpAddr, process::ExitCode};

use clap::{Args, Parser};

/// Arguments of the `chatroom` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Relay every message to all other connected clients", long_about = None)]
pub struct RoomArgs {
    /// TCP port to listen on. Use 0 for an ephemeral port.
    pub port: u16,

    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
}

/// Where a dialing binary connects to.
#[derive(Args, Debug, Clone)]
pub struct DialArgs {
    /// Host name or address of the chat room.
    pub host: String,

    /// Port of the chat room.
    pub service: String,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Join a chat room and answer !echo and !eval commands", long_about = None)]
pub struct BotArgs {
    #[command(flatten)]
    pub dial: DialArgs,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Join a chat room and send each stdin line as a message", long_about = None)]
pub struct ClientArgs {
    #[command(flatten)]
    pub dial: DialArgs,
}

/// Exit status reported for argument, startup and connect failures.
pub fn failure() -> ExitCode {
    ExitCode::from(u8::MAX)
}

/// Parses the process arguments. `--help` and `--version` come back as
/// `Err(ExitCode::SUCCESS)` after printing; anything else clap rejects is
/// printed and mapped to [`failure`].
pub fn parse_args<T: Parser>() -> Result<T, ExitCode> {
    T::try_parse().map_err(|err| {
        let _ = err.print();
        if err.use_stderr() {
            failure()
        } else {
            ExitCode::SUCCESS
        }
    })
}

/// Installs the `tracing` subscriber. Logs go to stderr so stdout carries
/// only chat payloads.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn room_takes_port_and_optional_bind() {
        let args = RoomArgs::try_parse_from(["chatroom", "5000"]).unwrap();
        assert_eq!(args.port, 5000);
        assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let args = RoomArgs::try_parse_from(["chatroom", "0", "--bind", "127.0.0.1"]).unwrap();
        assert_eq!(args.port, 0);
        assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn room_rejects_missing_or_invalid_port() {
        assert!(RoomArgs::try_parse_from(["chatroom"]).is_err());
        assert!(RoomArgs::try_parse_from(["chatroom", "notaport"]).is_err());
        assert!(RoomArgs::try_parse_from(["chatroom", "70000"]).is_err());
    }

    #[test]
    fn dialers_take_host_and_service() {
        let args = ClientArgs::try_parse_from(["chat-client", "localhost", "5000"]).unwrap();
        assert_eq!(args.dial.host, "localhost");
        assert_eq!(args.dial.service, "5000");

        let args = BotArgs::try_parse_from(["chatbot", "::1", "http"]).unwrap();
        assert_eq!(args.dial.service, "http");

        assert!(ClientArgs::try_parse_from(["chat-client", "localhost"]).is_err());
        assert!(BotArgs::try_parse_from(["chatbot", "a", "b", "c"]).is_err());
    }

    #[test]
    fn help_is_not_an_error_exit() {
        let err = RoomArgs::try_parse_from(["chatroom", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
        let err = RoomArgs::try_parse_from(["chatroom"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
