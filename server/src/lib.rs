//! # Quiz Room Server Library
//!
//! This library implements the coordinating server for a real-time
//! multiplayer trivia game. It groups connected players into isolated game
//! rooms, drives a timed question/answer cycle per room, resolves answer
//! races under a first-correct-wins rule with latency-based scoring, and
//! persists cumulative standings across restarts.
//!
//! ## Core Responsibilities
//!
//! ### Room Coordination
//! Rooms are the unit of isolation: each has a fixed required player count
//! (solo or head-to-head), a requested number of questions, and its own
//! lifecycle from `Waiting` through `Playing` to teardown. Nothing that
//! happens inside one room can stall or corrupt another.
//!
//! ### Race Resolution
//! Answer submissions arrive concurrently from every player's connection.
//! All of them are linearized through the room registry's lock, so exactly
//! one submission per question can be the first correct one. Points scale
//! down with answer latency and every member sees the same scoreboard.
//!
//! ### Disconnect Resilience
//! A player leaving mid-game is removed from every room they belong to; a
//! room whose last player leaves is deleted on the spot and its driver task
//! notices and terminates at its next check. Malformed input and socket
//! errors are contained to the connection that produced them.
//!
//! ### Durable Standings
//! Finished games fold each player's room score into a cumulative table
//! keyed by player name, rewritten to disk after every game and loaded
//! before the server accepts its first connection.
//!
//! ## Architecture Design
//!
//! One tokio task per connection handles parsing and dispatch; one task per
//! active room drives the question cycle. The room registry is the single
//! piece of shared mutable state between them and is guarded by one coarse
//! lock; the ranking store locks separately so ranking reads never contend
//! with per-room traffic. Outbound traffic for each socket funnels through
//! a single writer task, keeping replies and broadcasts from interleaving.
//!
//! ## Module Organization
//!
//! ### Rooms Module (`rooms`)
//! The room registry: creation, joining with a one-shot start signal,
//! answer submission with first-correct-wins resolution, disconnect
//! cleanup, and the driver-facing round operations.
//!
//! ### Game Module (`game`)
//! The per-room driver task: samples questions, broadcasts rounds, polls
//! for quorum within the timeout window, and finishes the game into the
//! ranking store.
//!
//! ### Network Module (`network`)
//! The TCP listener and per-connection session loop speaking
//! newline-delimited JSON.
//!
//! ### Questions Module (`questions`)
//! The immutable question bank with sampling without replacement.
//!
//! ### Rankings Module (`rankings`)
//! The durable cross-game score table.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameTiming;
//! use server::network::Server;
//! use server::questions::QuestionBank;
//! use server::rankings::RankingStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bank = QuestionBank::builtin();
//!     let rankings = RankingStore::load("rankings.json");
//!
//!     let server = Server::new(
//!         "127.0.0.1:65432",
//!         bank,
//!         rankings,
//!         GameTiming::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod questions;
pub mod rankings;
pub mod rooms;
