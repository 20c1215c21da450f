//! Room registry and per-room game state for the quiz server
//!
//! This module handles the server-side management of game rooms, including:
//! - Room lifecycle (create, join, starve, finish, teardown)
//! - Capacity enforcement and the one-shot start signal
//! - Concurrent answer submission with first-correct-wins resolution
//! - Disconnect cleanup across every room a player belongs to
//!
//! The registry owns all room state behind one coarse lock. Room count is
//! small and every operation is short, so a single lock is simpler than
//! per-room locking and still keeps cross-room checks consistent. Room
//! drivers never hold references into the map between steps; each operation
//! re-takes the lock and re-checks that its room still exists.

use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::{answer_points, Question, Response};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

/// Outbound handle to one player's connection. All messages for a socket
/// funnel through this sender so a session's replies and room broadcasts
/// cannot interleave on the wire.
pub type PlayerSender = mpsc::UnboundedSender<Response>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Waiting,
    Playing,
    Finished,
}

/// Live state of the question currently on the table in one room.
///
/// Created when the question is broadcast, discarded when the round ends.
/// `answered` tracks quorum; `resolved` flips once when the first correct
/// answer claims the points.
#[derive(Debug)]
pub struct ActiveQuestion {
    pub question: Question,
    pub asked_at: Instant,
    pub resolved: bool,
    pub answered: HashSet<String>,
}

/// One isolated quiz game with a fixed player capacity and question count.
pub struct Room {
    pub id: String,
    pub required_players: usize,
    pub question_count: usize,
    pub state: RoomState,
    pub players: HashMap<String, PlayerSender>,
    pub scores: HashMap<String, u32>,
    pub current_question: Option<ActiveQuestion>,
    driver_started: bool,
}

impl Room {
    fn new(
        id: String,
        required_players: usize,
        question_count: usize,
        creator: &str,
        sender: PlayerSender,
    ) -> Self {
        let mut players = HashMap::new();
        players.insert(creator.to_string(), sender);
        let mut scores = HashMap::new();
        scores.insert(creator.to_string(), 0);

        Self {
            id,
            required_players,
            question_count,
            state: RoomState::Waiting,
            players,
            scores,
            current_question: None,
            driver_started: false,
        }
    }

    /// Sends a message to every member. A failed send means that player's
    /// connection is going away; their session cleans up on its own.
    fn broadcast(&self, response: &Response) {
        for (name, sender) in &self.players {
            if sender.send(response.clone()).is_err() {
                debug!("Dropping broadcast to {} in room {}", name, self.id);
            }
        }
    }

    /// Quorum: every currently connected member has submitted for the live
    /// question. Players who left mid-round no longer count.
    fn has_quorum(&self) -> bool {
        match &self.current_question {
            Some(active) => self.players.keys().all(|name| active.answered.contains(name)),
            None => false,
        }
    }
}

/// Outcome of a join attempt. `start` is true for exactly the call that
/// brought the room to its required player count.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { start: bool },
    Full,
    NotFound,
}

/// Outcome of an answer submission.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Not playing, no live question, unknown player, or a duplicate.
    Ignored,
    /// Counted toward quorum but earned nothing.
    Counted,
    /// First correct answer for this question.
    Scored { points: u32 },
}

/// What the room driver sees when it polls a round.
#[derive(Debug, PartialEq, Eq)]
pub enum RoundStatus {
    RoomGone,
    Quorum,
    Pending,
}

/// Concurrency-safe owner of every room on the server.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a Waiting room with the creator as sole member and returns
    /// its fresh id. `start` is true when the room is already complete
    /// (single-player mode) and the caller must spawn the driver.
    pub async fn create_room(
        &self,
        required_players: usize,
        question_count: usize,
        creator: &str,
        sender: PlayerSender,
    ) -> (String, bool) {
        let mut rooms = self.rooms.write().await;
        let id = fresh_room_id(&rooms);
        let mut room = Room::new(id.clone(), required_players, question_count, creator, sender);

        let start = room.players.len() >= room.required_players && !room.driver_started;
        if start {
            room.driver_started = true;
        }

        info!(
            "Room {} created by {} ({} player(s), {} question(s))",
            id, creator, required_players, question_count
        );
        rooms.insert(id.clone(), room);
        (id, start)
    }

    /// Atomically checks capacity and inserts the player. The start signal
    /// fires for exactly one join: the flag flips inside the same locked
    /// section that crossed the threshold, so concurrent joins cannot both
    /// spawn a driver.
    pub async fn join_room(&self, room_id: &str, name: &str, sender: PlayerSender) -> JoinOutcome {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return JoinOutcome::NotFound;
        };

        if room.state != RoomState::Waiting || room.players.len() >= room.required_players {
            return JoinOutcome::Full;
        }
        // Names are unique within a room; a taken name reads as unjoinable.
        if room.players.contains_key(name) {
            return JoinOutcome::Full;
        }

        room.players.insert(name.to_string(), sender);
        room.scores.insert(name.to_string(), 0);
        info!("Player {} joined room {}", name, room_id);

        let start = room.players.len() == room.required_players && !room.driver_started;
        if start {
            room.driver_started = true;
        }
        JoinOutcome::Joined { start }
    }

    /// Removes the player from every room they belong to (the disconnect
    /// path). A room left empty is deleted on the spot, even mid-game; its
    /// driver notices at the next status check.
    pub async fn remove_player(&self, name: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|room_id, room| {
            if room.players.remove(name).is_some() {
                room.scores.remove(name);
                info!("Removed {} from room {}", name, room_id);
            }
            if room.players.is_empty() {
                info!("Room {} is empty, deleting", room_id);
                false
            } else {
                true
            }
        });
    }

    /// Explicit teardown, used by drivers aborting a starved game.
    pub async fn delete_room(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if rooms.remove(room_id).is_some() {
            info!("Room {} deleted", room_id);
        }
    }

    /// Handles one answer submission. Runs under the registry lock, which
    /// linearizes racing submissions: exactly one caller can observe
    /// `resolved == false` for a given question.
    pub async fn submit_answer(&self, room_id: &str, player: &str, answer: &str) -> SubmitOutcome {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return SubmitOutcome::Ignored;
        };
        if room.state != RoomState::Playing || !room.players.contains_key(player) {
            return SubmitOutcome::Ignored;
        }

        let elapsed = {
            let Some(active) = room.current_question.as_mut() else {
                return SubmitOutcome::Ignored;
            };
            // Duplicate submissions are a no-op: no second quorum count,
            // no second chance at the points.
            if !active.answered.insert(player.to_string()) {
                return SubmitOutcome::Ignored;
            }
            if !active.question.is_correct(answer) || active.resolved {
                return SubmitOutcome::Counted;
            }
            active.resolved = true;
            active.asked_at.elapsed()
        };

        let points = answer_points(elapsed);
        if let Some(score) = room.scores.get_mut(player) {
            *score += points;
        }
        info!(
            "Player {} answered first in room {} (+{} points after {:.2}s)",
            player,
            room_id,
            points,
            elapsed.as_secs_f64()
        );
        room.broadcast(&Response::Correct {
            player: player.to_string(),
            points,
            scoreboard: room.scores.clone(),
        });
        SubmitOutcome::Scored { points }
    }

    /// Installs a fresh question snapshot and broadcasts it. Returns false
    /// when the room is gone or starved, in which case any remnant is
    /// deleted and the driver must stop.
    pub async fn begin_round(
        &self,
        room_id: &str,
        question: Question,
        round_index: usize,
        round_total: usize,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        let starved = match rooms.get(room_id) {
            None => return false,
            Some(room) => room.players.is_empty(),
        };
        if starved {
            info!("Room {} starved, cancelling game", room_id);
            rooms.remove(room_id);
            return false;
        }
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };

        room.state = RoomState::Playing;
        let view = question.view();
        room.current_question = Some(ActiveQuestion {
            question,
            asked_at: Instant::now(),
            resolved: false,
            answered: HashSet::new(),
        });
        debug!("Room {}: round {}/{} broadcast", room_id, round_index, round_total);
        room.broadcast(&Response::Question {
            question: view,
            round_index,
            round_total,
        });
        true
    }

    pub async fn round_status(&self, room_id: &str) -> RoundStatus {
        let rooms = self.rooms.read().await;
        match rooms.get(room_id) {
            None => RoundStatus::RoomGone,
            // A missing snapshot means the round is already over.
            Some(room) if room.current_question.is_none() => RoundStatus::Quorum,
            Some(room) if room.has_quorum() => RoundStatus::Quorum,
            Some(_) => RoundStatus::Pending,
        }
    }

    /// Closes the round: notifies members when the window lapsed and
    /// discards the snapshot, so answers arriving during the inter-round
    /// pause are ignored.
    pub async fn end_round(&self, room_id: &str, timed_out: bool) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        if timed_out {
            room.broadcast(&Response::Timeout);
        }
        room.current_question = None;
    }

    /// Finishes the game: computes the winner (highest score, ties broken
    /// by lexicographically smallest name) and broadcasts the final
    /// standings. Returns the room scores so the caller can fold them into
    /// the ranking store before it deletes the room; the Finished state
    /// keeps the room unjoinable in the meantime.
    pub async fn finish_game(&self, room_id: &str) -> Option<HashMap<String, u32>> {
        let mut rooms = self.rooms.write().await;
        let starved = rooms.get(room_id)?.players.is_empty();
        if starved {
            rooms.remove(room_id);
            return None;
        }
        let room = rooms.get_mut(room_id)?;

        room.state = RoomState::Finished;
        room.current_question = None;
        let (winner, winner_score) = room
            .scores
            .iter()
            .map(|(name, score)| (name.clone(), *score))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;

        info!(
            "Game over in room {}. Winner: {} ({} points)",
            room_id, winner, winner_score
        );
        room.broadcast(&Response::GameOver {
            final_scoreboard: room.scores.clone(),
            winner,
            winner_score,
        });
        Some(room.scores.clone())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn player_count(&self, room_id: &str) -> Option<usize> {
        self.rooms.read().await.get(room_id).map(|room| room.players.len())
    }

    pub async fn requested_questions(&self, room_id: &str) -> Option<usize> {
        self.rooms.read().await.get(room_id).map(|room| room.question_count)
    }

    pub async fn room_state(&self, room_id: &str) -> Option<RoomState> {
        self.rooms.read().await.get(room_id).map(|room| room.state)
    }
}

fn fresh_room_id(rooms: &HashMap<String, Room>) -> String {
    loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        let id = format!("room-{}", suffix.to_lowercase());
        if !rooms.contains_key(&id) {
            return id;
        }
    }
}
