//! End-to-end tests driving a live server over TCP with a framed client,
//! the same way a SLIME frontend talks to it.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use swank_core::{read_str, RhaiEvaluator, SwankCodec, Value};
use swank_daemon::{DaemonConfig, SwankServer};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

type Client = Framed<TcpStream, SwankCodec>;

async fn start_server(config: DaemonConfig) -> SocketAddr {
    let server = SwankServer::bind(&config, Arc::new(RhaiEvaluator::new()))
        .await
        .expect("bind failed");
    let addr = server.local_addr().expect("no local addr");
    tokio::spawn(server.run());
    addr
}

fn test_config() -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.server.port = 0;
    config
}

async fn connect(addr: SocketAddr) -> Client {
    let stream = TcpStream::connect(addr).await.expect("connect failed");
    Framed::new(stream, SwankCodec::default())
}

async fn recv(client: &mut Client) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a frame")
        .map(|frame| frame.expect("frame error"))
}

/// Connect and consume the unsolicited handshake frame.
async fn connect_past_handshake(addr: SocketAddr) -> Client {
    let mut client = connect(addr).await;
    recv(&mut client).await.expect("no handshake frame");
    client
}

#[tokio::test]
async fn test_first_frame_is_indentation_update() {
    let addr = start_server(test_config()).await;
    let mut client = connect(addr).await;

    let payload = recv(&mut client).await.expect("no handshake frame");
    let form = read_str(&payload).unwrap();
    let items = form.as_list().unwrap();
    assert_eq!(items[0], Value::symbol(":indentation-update"));

    let entries = items[1].as_list().unwrap();
    assert_eq!(entries.len(), 9);
    for name in [
        "def", "class", "if", "else", "while", "for", "try", "except", "finally",
    ] {
        assert!(
            entries.contains(&Value::cons(Value::symbol(name), Value::Int(1))),
            "missing indentation entry for {name}"
        );
    }
}

#[tokio::test]
async fn test_connection_info_reply() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client
        .send("(:emacs-rex (swank:connection-info) nil t 1)".to_string())
        .await
        .unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    let form = read_str(&reply).unwrap();
    let items = form.as_list().unwrap();
    assert_eq!(items[0], Value::symbol(":return"));
    assert_eq!(items[2], Value::Int(1));

    let ok = items[1].as_list().unwrap();
    assert_eq!(ok[0], Value::symbol(":ok"));
    let info = ok[1].as_list().unwrap();
    assert_eq!(info[0], Value::symbol(":pid"));
    assert!(reply.contains(":version \"2012-07-13\""));
    assert!(reply.contains("(:coding-systems (\"utf-8-unix\" \"iso-latin-1-unix\"))"));
}

#[tokio::test]
async fn test_interactive_eval_round_trip() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client
        .send("(:emacs-rex (swank:interactive-eval \"1 + 2\") nil t 2)".to_string())
        .await
        .unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    assert_eq!(reply, "(:return (:ok \"3\") 2)");
}

#[tokio::test]
async fn test_eval_failure_keeps_connection_usable() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client
        .send("(:emacs-rex (swank:interactive-eval \"1 +\") nil t 3)".to_string())
        .await
        .unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    let form = read_str(&reply).unwrap();
    let items = form.as_list().unwrap();
    assert_eq!(items.len(), 7);
    assert_eq!(items[0], Value::symbol(":debug"));
    assert_eq!(items[6], Value::Int(3));

    // The connection survives the debug envelope.
    client
        .send("(:emacs-rex (swank:interactive-eval \"2 * 2\") nil t 4)".to_string())
        .await
        .unwrap();
    let reply = recv(&mut client).await.expect("no reply");
    assert_eq!(reply, "(:return (:ok \"4\") 4)");
}

#[tokio::test]
async fn test_state_is_shared_across_connections() {
    let addr = start_server(test_config()).await;

    let mut first = connect_past_handshake(addr).await;
    first
        .send("(:emacs-rex (swank:interactive-eval \"let shared = 41;\") nil t 1)".to_string())
        .await
        .unwrap();
    recv(&mut first).await.expect("no reply");

    let mut second = connect_past_handshake(addr).await;
    second
        .send("(:emacs-rex (swank:interactive-eval \"shared + 1\") nil t 1)".to_string())
        .await
        .unwrap();
    let reply = recv(&mut second).await.expect("no reply");
    assert_eq!(reply, "(:return (:ok \"42\") 1)");
}

#[tokio::test]
async fn test_simple_completions() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client
        .send("(:emacs-rex (swank:simple-completions \"wh\" '\"rhai\") nil t 5)".to_string())
        .await
        .unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    assert_eq!(reply, "(:return (:ok ((\"while\") \"while\")) 5)");
}

#[tokio::test]
async fn test_unknown_op_answers_nil() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client
        .send("(:emacs-rex (swank:frobnicate) nil t 6)".to_string())
        .await
        .unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    assert_eq!(reply, "(:return (:ok nil) 6)");
}

#[tokio::test]
async fn test_unreadable_request_closes_connection() {
    let addr = start_server(test_config()).await;
    let mut client = connect_past_handshake(addr).await;

    client.send("(((".to_string()).await.unwrap();

    let reply = recv(&mut client).await.expect("no reply");
    let form = read_str(&reply).unwrap();
    assert_eq!(form.as_list().unwrap()[0], Value::symbol(":debug"));

    assert_eq!(recv(&mut client).await, None);
}

#[tokio::test]
async fn test_port_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slime-port");

    let mut config = test_config();
    config.server.port_file = Some(path.clone());
    let addr = start_server(config).await;

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, addr.port().to_string());
}
