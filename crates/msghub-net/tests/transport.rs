//! Loopback integration tests for the gateway and client transports.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use msghub_core::types::SessionKey;
use msghub_net::{TcpClient, TcpGateway};
use msghub_protocol::Frame;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_session_lifecycle_and_fanout() {
    let gateway = Arc::new(TcpGateway::new(32768));

    let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();
    gateway.on_connection(move |key, connected| {
        let _ = conn_tx.send((key, connected));
        Ok(())
    });

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    gateway.on_message(move |key, frame| {
        let _ = msg_tx.send((key, frame));
        Ok(())
    });

    let addr = gateway.start(0).await.unwrap();

    let client = TcpClient::new("alice", 32768, 100);

    let (client_conn_tx, mut client_conn_rx) = mpsc::unbounded_channel();
    client.on_connection(move |connected| {
        let _ = client_conn_tx.send(connected);
        Ok(())
    });

    let (client_msg_tx, mut client_msg_rx) = mpsc::unbounded_channel();
    client.on_message(move |frame| {
        let _ = client_msg_tx.send(frame);
        Ok(())
    });

    client.start(format!("127.0.0.1:{}", addr.port()));

    // Both sides observe the connection.
    let connected = timeout(WAIT, client_conn_rx.recv()).await.unwrap().unwrap();
    assert!(connected);

    let (key, connected) = timeout(WAIT, conn_rx.recv()).await.unwrap().unwrap();
    assert!(connected);
    assert_eq!(key.id, "alice");
    assert!(!key.sub_id.is_empty());
    assert_eq!(gateway.connection_count(), 1);

    // Client → server message.
    client
        .send(Frame::text(r#"{"command":"request_client_status_update"}"#))
        .await
        .unwrap();

    let (from, frame) = timeout(WAIT, msg_rx.recv()).await.unwrap().unwrap();
    assert_eq!(from, key);
    assert!(frame.text.contains("request_client_status_update"));

    // Directed server → client message.
    gateway
        .send(&key, Frame::text(r#"{"command":"update_user_clinet_status"}"#))
        .await
        .unwrap();
    let frame = timeout(WAIT, client_msg_rx.recv()).await.unwrap().unwrap();
    assert!(frame.text.contains("update_user_clinet_status"));

    // Fan-out send reaches the client too.
    gateway
        .send(
            &SessionKey::broadcast(),
            Frame::text(r#"{"command":"send_broadcast_message"}"#),
        )
        .await
        .unwrap();
    let frame = timeout(WAIT, client_msg_rx.recv()).await.unwrap().unwrap();
    assert!(frame.text.contains("send_broadcast_message"));

    // Disconnect surfaces on the gateway side.
    client.stop().await;
    let (gone, connected) = timeout(WAIT, conn_rx.recv()).await.unwrap().unwrap();
    assert_eq!(gone, key);
    assert!(!connected);

    gateway.stop().await;
}

#[tokio::test]
async fn test_send_to_unknown_session_fails() {
    let gateway = TcpGateway::new(1024);
    let result = gateway
        .send(&SessionKey::new("ghost", "g1"), Frame::text("{}"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_binary_frames_survive_the_transport() {
    let gateway = Arc::new(TcpGateway::new(32768));

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    gateway.on_message(move |_key, frame| {
        let _ = msg_tx.send(frame);
        Ok(())
    });
    gateway.on_connection(|_key, _connected| Ok(()));

    let addr = gateway.start(0).await.unwrap();

    let client = TcpClient::new("bob", 32768, 100);
    let (client_conn_tx, mut client_conn_rx) = mpsc::unbounded_channel();
    client.on_connection(move |connected| {
        let _ = client_conn_tx.send(connected);
        Ok(())
    });
    client.start(format!("127.0.0.1:{}", addr.port()));

    assert!(timeout(WAIT, client_conn_rx.recv()).await.unwrap().unwrap());

    let payload: Vec<u8> = (0..=255u8).collect();
    client
        .send(Frame::with_binary(r#"{"command":"upload"}"#, payload.clone()))
        .await
        .unwrap();

    let frame = timeout(WAIT, msg_rx.recv()).await.unwrap().unwrap();
    assert_eq!(&frame.binary[..], &payload[..]);

    client.stop().await;
    gateway.stop().await;
}
