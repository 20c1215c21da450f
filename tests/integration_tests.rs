//! Integration tests for the quiz server and protocol client
//!
//! These tests run real servers on loopback sockets and drive them through
//! the client crate, validating cross-component behavior end to end.

use client::QuizClient;
use server::game::GameTiming;
use server::network::Server;
use server::questions::QuestionBank;
use server::rankings::RankingStore;
use shared::{Question, Request, Response};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// SESSION AND REPLY TESTS
mod session_tests {
    use super::*;

    /// Commands before registration are answered with an error and the
    /// connection stays open
    #[tokio::test]
    async fn registration_is_required_first() {
        let (addr, _server) = start_server("registration-required").await;
        let mut quiz = QuizClient::connect(&addr.to_string()).await.unwrap();

        let reply = quiz
            .request(&Request::CreateRoom {
                mode: 1,
                question_count: 1,
            })
            .await
            .unwrap();
        assert!(matches!(reply, Response::Error { .. }));

        // Still usable: register and get the welcome.
        match quiz.register("alice").await.unwrap() {
            Response::Ok {
                message: Some(message),
                ..
            } => assert!(message.contains("alice")),
            other => panic!("Expected welcome, got {:?}", other),
        }
    }

    /// Room creation replies with a fresh room id
    #[tokio::test]
    async fn create_room_returns_room_id() {
        let (addr, _server) = start_server("create-room").await;
        let mut quiz = registered_client(addr, "alice").await;

        let reply = quiz.create_room(2, 3).await.unwrap();
        let room_id = reply.room_id().expect("reply should carry a room id");
        assert!(room_id.starts_with("room-"));
    }

    /// Joining an unknown room is a recoverable error
    #[tokio::test]
    async fn join_unknown_room_is_an_error() {
        let (addr, _server) = start_server("join-unknown").await;
        let mut quiz = registered_client(addr, "alice").await;

        match quiz.join_room("room-missing").await.unwrap() {
            Response::Error { message } => assert_eq!(message, "Room not found or full."),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    /// A third player cannot squeeze into a two-player room
    #[tokio::test]
    async fn full_room_rejects_extra_join() {
        let (addr, _server) = start_server("full-room").await;
        let mut alice = registered_client(addr, "alice").await;
        let mut bob = registered_client(addr, "bob").await;
        let mut carol = registered_client(addr, "carol").await;

        let reply = alice.create_room(2, 1).await.unwrap();
        let room_id = reply.room_id().unwrap().to_string();

        assert!(bob.join_room(&room_id).await.unwrap().room_id().is_some());
        match carol.join_room(&room_id).await.unwrap() {
            Response::Error { message } => assert_eq!(message, "Room not found or full."),
            other => panic!("Expected error, got {:?}", other),
        }
    }
}

/// GAME FLOW TESTS
mod game_flow_tests {
    use super::*;

    /// A solo game runs question → correct → game over, and the points
    /// land in the rankings
    #[tokio::test]
    async fn solo_game_full_cycle() {
        let (addr, _server) = start_server("solo-cycle").await;
        let mut quiz = registered_client(addr, "alice").await;

        let reply = quiz.create_room(1, 1).await.unwrap();
        let room_id = reply.room_id().unwrap().to_string();

        match next_event(&mut quiz).await {
            Response::Question {
                question,
                round_index,
                round_total,
            } => {
                assert_eq!((round_index, round_total), (1, 1));
                assert_eq!(question.options.len(), 4);
            }
            other => panic!("Expected question, got {:?}", other),
        }

        quiz.submit_answer(&room_id, "2").await.unwrap();

        let points = match next_event(&mut quiz).await {
            Response::Correct { player, points, .. } => {
                assert_eq!(player, "alice");
                assert!((1..=100).contains(&points));
                points
            }
            other => panic!("Expected correct push, got {:?}", other),
        };

        match next_event(&mut quiz).await {
            Response::GameOver {
                winner,
                winner_score,
                final_scoreboard,
            } => {
                assert_eq!(winner, "alice");
                assert_eq!(winner_score, points);
                assert_eq!(final_scoreboard.get("alice"), Some(&points));
            }
            other => panic!("Expected game over, got {:?}", other),
        }

        wait_for_rankings(&mut quiz, &[("alice".to_string(), points)]).await;
    }

    /// The end-to-end two-player race: the room starts on the second join,
    /// the first correct answer wins, everyone hears about it
    #[tokio::test]
    async fn two_player_first_correct_wins() {
        let (addr, _server) = start_server("two-player").await;
        let mut alice = registered_client(addr, "alice").await;
        let mut bob = registered_client(addr, "bob").await;

        let reply = alice.create_room(2, 1).await.unwrap();
        let room_id = reply.room_id().unwrap().to_string();
        assert!(bob.join_room(&room_id).await.unwrap().room_id().is_some());

        // The game starts automatically: both members get the question.
        for quiz in [&mut alice, &mut bob] {
            match next_event(quiz).await {
                Response::Question { round_total, .. } => assert_eq!(round_total, 1),
                other => panic!("Expected question, got {:?}", other),
            }
        }

        alice.submit_answer(&room_id, "2").await.unwrap();

        let mut alice_points = 0;
        for quiz in [&mut alice, &mut bob] {
            match next_event(quiz).await {
                Response::Correct {
                    player,
                    points,
                    scoreboard,
                } => {
                    assert_eq!(player, "alice");
                    assert!(points > 0);
                    assert_eq!(scoreboard.get("bob"), Some(&0));
                    alice_points = points;
                }
                other => panic!("Expected correct push, got {:?}", other),
            }
        }

        // Bob answers afterwards (also correct) which completes the quorum
        // but earns nothing.
        bob.submit_answer(&room_id, "2").await.unwrap();

        for quiz in [&mut alice, &mut bob] {
            match next_event(quiz).await {
                Response::GameOver {
                    winner,
                    winner_score,
                    final_scoreboard,
                } => {
                    assert_eq!(winner, "alice");
                    assert_eq!(winner_score, alice_points);
                    assert_eq!(final_scoreboard.get("bob"), Some(&0));
                }
                other => panic!("Expected game over, got {:?}", other),
            }
        }
    }

    /// Nobody answers: a timeout push, then the game moves on and ends
    #[tokio::test]
    async fn unanswered_round_times_out() {
        let (addr, _server) = start_server("round-timeout").await;
        let mut quiz = registered_client(addr, "alice").await;

        quiz.create_room(1, 1).await.unwrap();

        match next_event(&mut quiz).await {
            Response::Question { .. } => {}
            other => panic!("Expected question, got {:?}", other),
        }
        match next_event(&mut quiz).await {
            Response::Timeout => {}
            other => panic!("Expected timeout, got {:?}", other),
        }
        match next_event(&mut quiz).await {
            Response::GameOver { winner_score, .. } => assert_eq!(winner_score, 0),
            other => panic!("Expected game over, got {:?}", other),
        }
    }
}

/// DISCONNECT HANDLING TESTS
mod disconnect_tests {
    use super::*;

    /// A partner leaving mid-round shrinks the quorum; the survivor can
    /// still finish the game
    #[tokio::test]
    async fn game_continues_after_partner_disconnect() {
        let (addr, _server) = start_server("partner-disconnect").await;
        let mut alice = registered_client(addr, "alice").await;
        let mut bob = registered_client(addr, "bob").await;

        let reply = alice.create_room(2, 1).await.unwrap();
        let room_id = reply.room_id().unwrap().to_string();
        bob.join_room(&room_id).await.unwrap();

        match next_event(&mut alice).await {
            Response::Question { .. } => {}
            other => panic!("Expected question, got {:?}", other),
        }

        drop(bob);
        // Give the server a moment to process the hangup.
        tokio::time::sleep(Duration::from_millis(100)).await;

        alice.submit_answer(&room_id, "2").await.unwrap();
        match next_event(&mut alice).await {
            Response::Correct { player, .. } => assert_eq!(player, "alice"),
            other => panic!("Expected correct push, got {:?}", other),
        }
        match next_event(&mut alice).await {
            Response::GameOver { winner, .. } => assert_eq!(winner, "alice"),
            other => panic!("Expected game over, got {:?}", other),
        }
    }

    /// The sole player leaving mid-game kills the room; the server stays
    /// healthy and nothing is recorded
    #[tokio::test]
    async fn sole_player_disconnect_aborts_game() {
        let (addr, _server) = start_server("sole-disconnect").await;
        let mut alice = registered_client(addr, "alice").await;

        alice.create_room(1, 2).await.unwrap();
        match next_event(&mut alice).await {
            Response::Question { .. } => {}
            other => panic!("Expected question, got {:?}", other),
        }

        drop(alice);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The server keeps serving, and the aborted game left no trace in
        // the standings.
        let mut carol = registered_client(addr, "carol").await;
        assert!(carol.list_rankings().await.unwrap().is_empty());
        assert!(carol.create_room(2, 1).await.unwrap().room_id().is_some());
    }

    /// Malformed input is treated as a disconnect
    #[tokio::test]
    async fn malformed_request_closes_connection() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (addr, _server) = start_server("malformed").await;
        let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();

        socket.write_all(b"this is not json\n").await.unwrap();

        let mut buf = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(2), socket.read_to_end(&mut buf))
            .await
            .expect("server should close the connection")
            .unwrap();
        assert_eq!(read, 0);
    }
}

/// PERSISTENCE TESTS
mod persistence_tests {
    use super::*;

    /// Game scores fold into the rankings file and survive a restart
    #[tokio::test]
    async fn rankings_survive_restart() {
        let path = temp_rankings_path("restart");
        std::fs::remove_file(&path).ok();

        let (addr, server) = start_server_with_path(&path).await;
        let mut alice = registered_client(addr, "alice").await;

        let reply = alice.create_room(1, 1).await.unwrap();
        let room_id = reply.room_id().unwrap().to_string();
        match next_event(&mut alice).await {
            Response::Question { .. } => {}
            other => panic!("Expected question, got {:?}", other),
        }
        alice.submit_answer(&room_id, "2").await.unwrap();

        let mut earned = 0;
        loop {
            if let Response::GameOver { final_scoreboard, .. } = next_event(&mut alice).await {
                earned = *final_scoreboard.get("alice").unwrap();
                break;
            }
        }
        assert!(earned > 0);
        wait_for_rankings(&mut alice, &[("alice".to_string(), earned)]).await;

        // Restart: kill the server and bring a fresh one up on the same
        // rankings file.
        server.abort();
        drop(alice);
        let (addr, _server) = start_server_with_path(&path).await;

        let mut carol = registered_client(addr, "carol").await;
        assert_eq!(
            carol.list_rankings().await.unwrap(),
            vec![("alice".to_string(), earned)]
        );

        std::fs::remove_file(&path).ok();
    }
}

// HELPER FUNCTIONS

fn fast_timing() -> GameTiming {
    GameTiming {
        question_timeout: Duration::from_millis(1200),
        poll_interval: Duration::from_millis(10),
        inter_round_pause: Duration::from_millis(30),
    }
}

/// One question whose correct answer is option "2".
fn fixed_bank() -> QuestionBank {
    QuestionBank::new(vec![Question {
        text: "Which option is second?".to_string(),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        answer: "2".to_string(),
    }])
    .unwrap()
}

fn temp_rankings_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "trivia-integration-{}-{}.json",
        tag,
        std::process::id()
    ))
}

async fn start_server_with_path(path: &PathBuf) -> (SocketAddr, JoinHandle<()>) {
    let server = Server::new(
        "127.0.0.1:0",
        fixed_bank(),
        RankingStore::load(path),
        fast_timing(),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, handle)
}

async fn start_server(tag: &str) -> (SocketAddr, JoinHandle<()>) {
    let path = temp_rankings_path(tag);
    std::fs::remove_file(&path).ok();
    start_server_with_path(&path).await
}

async fn registered_client(addr: SocketAddr, name: &str) -> QuizClient {
    let mut quiz = QuizClient::connect(&addr.to_string()).await.unwrap();
    match quiz.register(name).await.unwrap() {
        Response::Ok { .. } => quiz,
        other => panic!("Registration failed: {:?}", other),
    }
}

async fn next_event(quiz: &mut QuizClient) -> Response {
    tokio::time::timeout(Duration::from_secs(5), quiz.next_event())
        .await
        .expect("timed out waiting for server event")
        .unwrap()
}

/// Players get the game-over push before the ranking write lands, so tests
/// poll briefly for the persisted result.
async fn wait_for_rankings(quiz: &mut QuizClient, expected: &[(String, u32)]) {
    for _ in 0..100 {
        if quiz.list_rankings().await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("rankings never reached {:?}", expected);
}
