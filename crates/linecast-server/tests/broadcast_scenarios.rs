//! End-to-end tests over real loopback TCP sockets.
//!
//! Each test starts [`serve`] on `127.0.0.1:0`, connects plain `TcpStream`
//! clients and checks exactly which lines each client receives.
//!
//! A new session's Admit is queued slightly after its welcome line is written,
//! so tests pause briefly after a client's welcome before relying on it being
//! a broadcast recipient.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use linecast_core::RelayConfig;
use linecast_server::infrastructure::serve;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(200);
const SETTLE: Duration = Duration::from_millis(100);

// ── Harness ───────────────────────────────────────────────────────────────────

struct Server {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
}

impl Server {
    async fn start(config: RelayConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::new(AtomicBool::new(true));
        tokio::spawn(serve(listener, config, Arc::clone(&running)));
        Self { addr, running }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

struct Client {
    id: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connects, consumes the welcome line and records the id it names.
    async fn connect(server: &Server) -> Self {
        let stream = TcpStream::connect(server.addr).await.unwrap();
        let (read, writer) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        let welcome = timeout(WAIT, lines.next_line())
            .await
            .expect("timed out waiting for welcome")
            .unwrap()
            .expect("connection closed before welcome");
        assert!(welcome.starts_with("Welcome, "), "unexpected first line: {welcome}");
        let id = welcome
            .split('`')
            .nth(1)
            .expect("welcome must name the session id")
            .to_string();

        sleep(SETTLE).await;
        Self { id, lines, writer }
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed unexpectedly")
    }

    async fn send(&mut self, text: &str) {
        self.writer
            .write_all(format!("{text}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn assert_quiet(&mut self) {
        let result = timeout(QUIET, self.lines.next_line()).await;
        assert!(result.is_err(), "expected no line, got {result:?}");
    }

    async fn assert_closed_by_server(&mut self) {
        let next = timeout(WAIT, self.lines.next_line())
            .await
            .expect("server did not close the connection");
        match next {
            Ok(None) => {}
            Ok(Some(line)) => panic!("expected EOF, got line: {line}"),
            // A reset is also a close.
            Err(_) => {}
        }
    }
}

fn test_config() -> RelayConfig {
    RelayConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..RelayConfig::default()
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lone_client_gets_welcome_and_no_join_notice() {
    // Arrange
    let server = Server::start(test_config()).await;

    // Act
    let mut c1 = Client::connect(&server).await;

    // Assert
    assert!(!c1.id.is_empty());
    c1.assert_quiet().await;
}

#[tokio::test]
async fn test_existing_client_sees_newcomer_join() {
    let server = Server::start(test_config()).await;
    let mut c1 = Client::connect(&server).await;

    let mut c2 = Client::connect(&server).await;

    assert_eq!(c1.recv().await, format!("user:`{}` has joined", c2.id));
    c2.assert_quiet().await;
}

#[tokio::test]
async fn test_line_is_relayed_to_others_but_not_echoed() {
    // Arrange
    let server = Server::start(test_config()).await;
    let mut c1 = Client::connect(&server).await;
    let mut c2 = Client::connect(&server).await;
    c1.recv().await; // c2's join notice

    // Act
    c1.send("hello").await;

    // Assert
    assert_eq!(c2.recv().await, format!("{}:hello", c1.id));
    c1.assert_quiet().await;
}

#[tokio::test]
async fn test_three_clients_fan_out() {
    let server = Server::start(test_config()).await;
    let mut c1 = Client::connect(&server).await;
    let mut c2 = Client::connect(&server).await;
    let mut c3 = Client::connect(&server).await;
    c1.recv().await; // c2 joined
    c1.recv().await; // c3 joined
    c2.recv().await; // c3 joined

    c2.send("from two").await;

    let expected = format!("{}:from two", c2.id);
    assert_eq!(c1.recv().await, expected);
    assert_eq!(c3.recv().await, expected);
    c2.assert_quiet().await;
}

#[tokio::test]
async fn test_disconnect_is_announced_to_remaining_clients() {
    // Arrange
    let server = Server::start(test_config()).await;
    let c1 = Client::connect(&server).await;
    let mut c2 = Client::connect(&server).await;
    let c1_id = c1.id.clone();

    // Act
    drop(c1);

    // Assert
    assert_eq!(c2.recv().await, format!("user:`{c1_id}` has left"));
    c2.assert_quiet().await;
}

#[tokio::test]
async fn test_idle_client_is_disconnected_and_announced() {
    // Arrange: c2 joins partway through c1's idle window, so c1 expires first
    let server = Server::start(RelayConfig {
        idle_timeout: Duration::from_millis(600),
        ..test_config()
    })
    .await;
    let mut c1 = Client::connect(&server).await;
    sleep(Duration::from_millis(150)).await;
    let mut c2 = Client::connect(&server).await;

    // Act / Assert: c1 is told about c2, then the server hangs up on it
    assert_eq!(c1.recv().await, format!("user:`{}` has joined", c2.id));
    c1.assert_closed_by_server().await;
    assert_eq!(c2.recv().await, format!("user:`{}` has left", c1.id));
}

#[tokio::test]
async fn test_activity_keeps_client_connected_past_window() {
    let server = Server::start(RelayConfig {
        idle_timeout: Duration::from_millis(500),
        ..test_config()
    })
    .await;
    let mut c1 = Client::connect(&server).await;

    // Empty lines count as activity without being relayed.
    for _ in 0..6 {
        sleep(Duration::from_millis(200)).await;
        c1.send("").await;
    }

    c1.assert_quiet().await;
}

#[tokio::test]
async fn test_crlf_lines_are_relayed_without_carriage_return() {
    let server = Server::start(test_config()).await;
    let mut c1 = Client::connect(&server).await;
    let mut c2 = Client::connect(&server).await;
    c1.recv().await;

    c1.writer.write_all(b"telnet style\r\n").await.unwrap();

    assert_eq!(c2.recv().await, format!("{}:telnet style", c1.id));
}

#[tokio::test]
async fn test_client_ids_are_unique() {
    let server = Server::start(test_config()).await;
    let c1 = Client::connect(&server).await;
    let c2 = Client::connect(&server).await;
    let c3 = Client::connect(&server).await;

    assert_ne!(c1.id, c2.id);
    assert_ne!(c2.id, c3.id);
    assert_ne!(c1.id, c3.id);
}
