// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Global host:port used by all tests after the server publishes its bound address.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return its shared host:port.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());
                vessel_sync::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_addr_and_readiness(published_addr);
    });

    SERVER_ADDR
        .get()
        .expect("server addr should be initialized")
        .as_str()
}

pub fn http_url(path: &str) -> String {
    format!("http://{}{}", ensure_server(), path)
}

// Wait for address publication and then for the socket to accept TCP connections.
fn wait_for_server_addr_and_readiness(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_ADDR.set(addr.clone());

    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

// Registers a vessel with a unique name so tests sharing the server do not collide.
pub async fn register_unique_vessel(client: &reqwest::Client, prefix: &str) -> String {
    let name = format!("{prefix}-{}", uuid::Uuid::new_v4());
    let res = client
        .post(http_url("/vessels"))
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await
        .expect("register request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    name
}

pub async fn connect_client() -> (Socket, Value) {
    let url = format!("ws://{}/ws", ensure_server());
    let (mut socket, _) = connect_async(url).await.expect("websocket connect");
    let identity = next_json(&mut socket).await;
    assert_eq!(identity["type"], "Identity");
    (socket, identity)
}

pub async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::text(value.to_string()))
        .await
        .expect("websocket send");
}

// Next text frame parsed as JSON; control frames are skipped.
pub async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("message within timeout")
            .expect("stream still open")
            .expect("websocket frame");
        if msg.is_text() {
            let text = msg.to_text().expect("text frame");
            return serde_json::from_str(text).expect("server sends json");
        }
    }
}

// Reads messages until one satisfies the predicate.
pub async fn wait_for<F>(socket: &mut Socket, mut predicate: F) -> Value
where
    F: FnMut(&Value) -> bool,
{
    for _ in 0..500 {
        let value = next_json(socket).await;
        if predicate(&value) {
            return value;
        }
    }
    panic!("expected message never arrived");
}
