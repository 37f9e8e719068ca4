//! End-to-end tests: `BoardClient` against the in-process `SimServer`.
//!
//! Each test starts a simulated board on an OS-chosen loopback port, scripts
//! its faults, and checks what a front end would display.

use std::time::Duration;

use messenger_client::client::BoardClient;
use messenger_client::config::{ClientConfig, RetryPolicy};
use messenger_client::request::Operation;
use messenger_client::response::ParsedResponse;
use messenger_client::simulator::{Fault, SimServer, SimulatorConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn board(config: SimulatorConfig) -> SimServer {
    SimServer::spawn("127.0.0.1:0".parse().unwrap(), config)
        .await
        .expect("bind simulated board")
}

async fn client_for(server: &SimServer, user: &str, retries: u32) -> BoardClient {
    let config = ClientConfig {
        host: "127.0.0.1".into(),
        port: server.local_addr.port(),
        retry: RetryPolicy {
            retries,
            timeout: Duration::from_millis(200),
        },
    };
    BoardClient::connect(user, &config).await.expect("connect")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// An empty board answers a fetch with bare `OK`.
#[tokio::test]
async fn fetch_of_empty_board_is_plain_ok() {
    let server = board(SimulatorConfig::default()).await;
    let mut client = client_for(&server, "ann", 3).await;

    let parsed = client.request(&Operation::Fetch).await.unwrap();
    assert_eq!(parsed, ParsedResponse::OkPlain);

    let update = client.fetch().await;
    assert_eq!(update.status, "0 messages retrieved");
    assert_eq!(update.messages, Some(vec![]));
    server.shutdown().await;
}

#[tokio::test]
async fn posted_messages_come_back_in_order() {
    let server = board(SimulatorConfig::default()).await;
    let mut ann = client_for(&server, "ann", 3).await;
    let mut bob = client_for(&server, "bob", 3).await;

    assert_eq!(ann.post("hello").await.unwrap().status, "Message Sent");
    assert_eq!(bob.post("hi ann").await.unwrap().status, "Message Sent");

    let update = ann.fetch().await;
    assert_eq!(update.status, "2 messages retrieved");
    let lines = update.messages.expect("listing");
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" ann hello"), "{:?}", lines[0]);
    assert!(lines[1].ends_with(" bob hi ann"), "{:?}", lines[1]);
    server.shutdown().await;
}

#[tokio::test]
async fn empty_post_is_not_sent() {
    let server = board(SimulatorConfig::default()).await;
    let mut client = client_for(&server, "ann", 3).await;

    assert!(client.post("").await.is_none());
    assert_eq!(client.stats().transmissions, 0);
    assert_eq!(server.received(), 0);
    server.shutdown().await;
}

/// The first request is lost; the retransmission gets through.
#[tokio::test]
async fn dropped_request_is_retransmitted() {
    let server = board(SimulatorConfig::default()).await;
    server.push_fault(Fault::Drop);
    let mut client = client_for(&server, "ann", 3).await;

    assert_eq!(client.post("still here").await.unwrap().status, "Message Sent");
    assert_eq!(client.stats().transmissions, 2);
    assert_eq!(server.received(), 2);
    assert_eq!(server.entries().len(), 1);
    server.shutdown().await;
}

/// A stale-looking reply makes the client resend; the board sees the resend
/// as a duplicate and does not store the post twice.
#[tokio::test]
async fn wrong_sequence_reply_does_not_duplicate_post() {
    let server = board(SimulatorConfig::default()).await;
    server.push_fault(Fault::WrongSeq);
    let mut client = client_for(&server, "ann", 3).await;

    assert_eq!(client.post("once").await.unwrap().status, "Message Sent");
    assert_eq!(client.stats().mismatches, 1);
    assert_eq!(server.entries().len(), 1);
    server.shutdown().await;
}

#[tokio::test]
async fn server_error_text_is_shown_verbatim() {
    let server = board(SimulatorConfig::default()).await;
    server.push_fault(Fault::Reply("ERROR board is full".into()));
    let mut client = client_for(&server, "ann", 3).await;

    let update = client.post("anyone?").await.unwrap();
    assert_eq!(update.status, "ERROR board is full");
    assert_eq!(client.stats().transmissions, 1, "server errors are not retried");
    server.shutdown().await;
}

/// Any `OK` reply to a post counts as sent, even a full listing.
#[tokio::test]
async fn listing_in_reply_to_post_counts_as_sent() {
    let server = board(SimulatorConfig::default()).await;
    server.push_fault(Fault::Reply("OK1::x::y".into()));
    let mut client = client_for(&server, "ann", 3).await;

    assert_eq!(client.post("hi").await.unwrap().status, "Message Sent");
    server.shutdown().await;
}

#[tokio::test]
async fn unresponsive_board_sets_status() {
    let server = board(SimulatorConfig::default()).await;
    for _ in 0..2 {
        server.push_fault(Fault::Drop);
    }
    let mut client = client_for(&server, "ann", 2).await;

    let update = client.fetch().await;
    assert_eq!(update.status, "ERROR server does not respond");
    assert_eq!(update.messages, None);

    // The bit did not move, so the next exchange still works.
    assert_eq!(client.fetch().await.status, "0 messages retrieved");
    server.shutdown().await;
}

#[tokio::test]
async fn garbage_reply_is_survived() {
    let server = board(SimulatorConfig::default()).await;
    server.push_fault(Fault::Garbage);
    let mut client = client_for(&server, "ann", 3).await;

    assert_eq!(client.fetch().await.status, "0 messages retrieved");
    assert_eq!(client.stats().malformed, 1);
    server.shutdown().await;
}

/// A seeded lossy board: every post lands exactly once.
#[tokio::test]
async fn lossy_board_stores_each_post_once() {
    let server = board(SimulatorConfig {
        loss_rate: 0.3,
        seed: 465,
    })
    .await;
    let mut client = client_for(&server, "ann", 12).await;

    for i in 0..5 {
        let update = client.post(&format!("msg {i}")).await.unwrap();
        assert_eq!(update.status, "Message Sent");
    }
    let texts: Vec<String> = server.entries().into_iter().map(|e| e.text).collect();
    assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    assert!(client.stats().transmissions >= 5);
    server.shutdown().await;
}
