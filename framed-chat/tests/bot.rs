use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use framed_chat::{
    ConnectionHandle, Dialer,
    bot::ChatBot,
    header::{self, HEADER_LEN, SENTINEL},
};

const WAIT: Duration = Duration::from_secs(2);

/// Dials a bot at a bare listener and returns the bot's handle plus the
/// server side of its socket.
async fn connect_bot() -> (ConnectionHandle, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port().to_string();
    let (bot, accepted) = tokio::join!(
        Dialer::new(Arc::new(ChatBot)).connect("127.0.0.1", &port),
        listener.accept()
    );
    let (server, _) = accepted.expect("accept");
    (bot.expect("dial"), server)
}

async fn ask(server: &mut TcpStream, message: &str) -> String {
    server
        .write_all(&header::frame(message.as_bytes()))
        .await
        .expect("send");

    let mut head = [0u8; HEADER_LEN];
    timeout(WAIT, server.read_exact(&mut head))
        .await
        .expect("bot did not reply")
        .expect("read header");
    let mut body = vec![0u8; header::decode(&head) as usize];
    server.read_exact(&mut body).await.expect("read body");
    String::from_utf8(body).expect("utf8")
}

#[tokio::test]
async fn evaluates_arithmetic() {
    let (_bot, mut server) = connect_bot().await;
    assert_eq!(ask(&mut server, "!eval 3 + 4").await, "7");
    assert_eq!(ask(&mut server, "!eval 100 / 7").await, "14");
    assert_eq!(ask(&mut server, "  !eval -5 * 5").await, "-25");
}

#[tokio::test]
async fn bad_expressions_get_an_error_reply_and_keep_the_connection() {
    let (bot, mut server) = connect_bot().await;

    let reply = ask(&mut server, "!eval 10 / 0").await;
    assert!(reply.starts_with("Invalid input to eval"), "reply {reply:?}");
    let reply = ask(&mut server, "!eval abc + 1").await;
    assert!(reply.starts_with("Invalid input to eval"), "reply {reply:?}");

    assert!(bot.is_open());
    assert_eq!(ask(&mut server, "!eval 1 + 1").await, "2");
}

#[tokio::test]
async fn echoes_the_argument() {
    let (_bot, mut server) = connect_bot().await;
    assert_eq!(ask(&mut server, "!echo hello world").await, "hello world");
    assert_eq!(ask(&mut server, "!echo").await, "!echo");
}

#[tokio::test]
async fn ignores_ordinary_chat() {
    let (_bot, mut server) = connect_bot().await;
    server
        .write_all(&header::frame(b"just talking"))
        .await
        .expect("send");
    // The first reply belongs to the echo, so the chat line got none.
    assert_eq!(ask(&mut server, "!echo marker").await, "marker");
}

#[tokio::test]
async fn sentinel_ends_the_session() {
    let (bot, mut server) = connect_bot().await;
    server
        .write_all(&header::encode(SENTINEL))
        .await
        .expect("send sentinel");

    timeout(WAIT, bot.closed()).await.expect("bot did not close");
    assert!(!bot.is_open());
}
