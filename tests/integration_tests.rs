//! Integration tests across the shared protocol, the authority server and
//! the client session, over real TCP connections.

use bincode::{deserialize, serialize};
use client::game::{MoveOutcome, OpenField};
use client::network::{Client, ClientConfig, ClientError, RetryPolicy, RpcClient};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use server::authority::Authority;
use server::network::Server;
use shared::framing::{recv_message, send_message, FrameConfig};
use shared::{GlobalState, MovementRequest, PlayerState, Reply, Request};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};

async fn start_server() -> (String, Arc<Authority>) {
    let authority = Arc::new(Authority::new());
    let server = Server::new("127.0.0.1:0", Arc::clone(&authority))
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    (addr, authority)
}

fn fast_config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_millis(10),
        render_interval: Duration::from_millis(10),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(5),
        },
    }
}

async fn connect_client(id: &str, addr: &str) -> Client {
    Client::connect(id, addr, Arc::new(OpenField::new(20, 20)), fast_config())
        .await
        .unwrap()
}

fn movement(id: &str, x: i32, y: i32, sequence: u64) -> MovementRequest {
    MovementRequest {
        id: id.to_string(),
        x,
        y,
        sequence,
        health: 3,
    }
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    #[test]
    fn malformed_payloads_rejected() {
        let valid = serialize(&Request::RegisterPlayer { id: "p1".into() }).unwrap();

        let truncated = &valid[..valid.len() / 2];
        assert!(deserialize::<Request>(truncated).is_err());

        let mut corrupted = valid.clone();
        corrupted[0] = 0xFF;
        assert!(deserialize::<Request>(&corrupted).is_err());

        assert!(deserialize::<Request>(&[]).is_err());
    }

    #[test]
    fn every_reply_kind_survives_encoding() {
        let replies = vec![
            Reply::Ack(true),
            Reply::Ack(false),
            Reply::State(Default::default()),
            Reply::Error("player not found: p9".to_string()),
        ];

        for reply in replies {
            let bytes = serialize(&reply).unwrap();
            assert_eq!(deserialize::<Reply>(&bytes).unwrap(), reply);
        }
    }
}

/// AUTHORITY OVER TCP
mod authority_tests {
    use super::*;

    #[tokio::test]
    async fn example_scenario_over_tcp() {
        let (addr, _authority) = start_server().await;
        let rpc = RpcClient::connect(&addr).await.unwrap();

        assert!(rpc.register_player("p1").await.unwrap());
        assert_ok!(rpc.apply_logical_event(Default::default()).await);
        let state = rpc.get_state("p1").await.unwrap();
        assert_eq!(state.players["p1"], PlayerState::spawn("p1"));

        assert!(rpc.apply_movement(&movement("p1", 2, 1, 1)).await.unwrap());
        let stored = rpc.get_state("p1").await.unwrap().players["p1"].clone();
        assert_eq!(stored.position(), (2, 1));
        assert_eq!(stored.sequence, 1);

        assert!(!rpc.apply_movement(&movement("p1", 2, 1, 1)).await.unwrap());
        assert_eq!(rpc.get_state("p1").await.unwrap().players["p1"], stored);

        assert!(rpc.apply_movement(&movement("p1", 2, 2, 2)).await.unwrap());

        assert!(rpc.disconnect_player("p1").await.unwrap());
        assert!(!rpc
            .get_state("p1")
            .await
            .unwrap()
            .players
            .contains_key("p1"));
    }

    #[tokio::test]
    async fn unknown_player_movement_is_explicit_error() {
        let (addr, _authority) = start_server().await;
        let rpc = RpcClient::connect(&addr).await.unwrap();

        let result = rpc.apply_movement(&movement("ghost", 1, 1, 1)).await;
        let err = assert_err!(result);
        assert!(matches!(err, ClientError::Remote(_)));

        // the connection is still usable afterwards
        assert!(rpc.register_player("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn shuffled_delivery_keeps_highest_sequence() {
        let (addr, _authority) = start_server().await;
        let rpc = RpcClient::connect(&addr).await.unwrap();
        rpc.register_player("p1").await.unwrap();

        let mut sequences: Vec<u64> = (1..=30).collect();
        sequences.shuffle(&mut StdRng::seed_from_u64(42));

        let mut max_accepted = 0;
        for seq in sequences {
            let accepted = rpc
                .apply_movement(&movement("p1", seq as i32, 0, seq))
                .await
                .unwrap();
            if accepted {
                assert!(seq > max_accepted);
                max_accepted = seq;
            }
        }

        let stored = rpc.get_state("p1").await.unwrap().players["p1"].clone();
        assert_eq!(stored.sequence, max_accepted);
        assert_eq!(stored.x as u64, max_accepted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_from_many_connections() {
        let (addr, authority) = start_server().await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let addr = addr.clone();
                tokio::spawn(async move {
                    let rpc = RpcClient::connect(&addr).await.unwrap();
                    rpc.register_player("shared-id").await.unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let state = authority.get_state("test").await;
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.players["shared-id"], PlayerState::spawn("shared-id"));
    }

    #[tokio::test]
    async fn snapshot_unaffected_by_later_writes() {
        let (addr, _authority) = start_server().await;
        let rpc = RpcClient::connect(&addr).await.unwrap();
        rpc.register_player("p1").await.unwrap();

        let snapshot = rpc.get_state("p1").await.unwrap();
        rpc.apply_movement(&movement("p1", 9, 9, 1)).await.unwrap();
        rpc.register_player("p2").await.unwrap();

        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players["p1"].position(), (1, 1));
    }
}

/// CLIENT SESSION TESTS
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn clients_see_each_other_through_polling() {
        let (addr, _authority) = start_server().await;
        let alice = connect_client("alice", &addr).await;
        let bob = connect_client("bob", &addr).await;

        assert_eq!(
            alice.move_by(1, 0).await,
            Some(MoveOutcome::Committed { attempts: 1 })
        );
        assert!(bob.poll_once().await);

        let frame = bob.frame().await;
        assert_eq!(frame.players[0].id, "bob");
        let seen = frame.players.iter().find(|p| p.id == "alice").unwrap();
        assert_eq!((seen.x, seen.y), (2, 1));
    }

    #[tokio::test]
    async fn own_position_not_overwritten_by_stale_snapshot() {
        let (addr, _authority) = start_server().await;
        let client = connect_client("p1", &addr).await;
        let stale = client.snapshot().await.unwrap();

        client.move_by(0, 1).await;
        client.move_by(0, 1).await;

        let frame = client.frame().await;
        assert_eq!(stale.players["p1"].position(), (1, 1));
        assert_eq!((frame.players[0].x, frame.players[0].y), (1, 3));
        assert_eq!(frame.players.iter().filter(|p| p.id == "p1").count(), 1);
    }

    #[tokio::test]
    async fn poller_keeps_snapshot_fresh() {
        let (addr, authority) = start_server().await;
        let client = connect_client("p1", &addr).await;
        let poller = client.spawn_poller();

        authority.register("late-joiner").await;
        let mut seen = false;
        for _ in 0..50 {
            sleep(Duration::from_millis(10)).await;
            if let Some(snapshot) = client.snapshot().await {
                if snapshot.players.contains_key("late-joiner") {
                    seen = true;
                    break;
                }
            }
        }
        poller.abort();

        assert!(seen, "poller never picked up the new player");
    }

    #[tokio::test]
    async fn failed_poll_keeps_last_snapshot() {
        // scripted authority: answers registration and one snapshot, then dies
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let fake = tokio::spawn(async move {
            let config = FrameConfig::default();
            let (mut socket, _) = listener.accept().await.unwrap();

            let _: Request = recv_message(&mut socket, &config).await.unwrap();
            send_message(&mut socket, &Reply::Ack(true), &config)
                .await
                .unwrap();

            let _: Request = recv_message(&mut socket, &config).await.unwrap();
            let mut state = GlobalState::default();
            state
                .players
                .insert("p1".to_string(), PlayerState::spawn("p1"));
            state
                .players
                .insert("p2".to_string(), PlayerState::spawn("p2"));
            send_message(&mut socket, &Reply::State(state), &config)
                .await
                .unwrap();
        });

        let client = connect_client("p1", &addr).await;
        fake.await.unwrap();

        assert!(!client.poll_once().await);
        assert!(!client.poll_once().await);

        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.players.len(), 2);

        // local play continues while the authority is gone
        assert_eq!(client.move_by(1, 0).await, Some(MoveOutcome::Failed));
        assert_eq!(client.frame().await.players[0].x, 2);
    }

    #[tokio::test]
    async fn startup_fails_without_authority() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let terrain = Arc::new(OpenField::new(20, 20));
        let result = Client::connect("p1", &addr, terrain, fast_config()).await;
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }
}
