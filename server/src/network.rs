//! TCP listener and per-connection session handling for the quiz server

use crate::game::{spawn_game, GameTiming};
use crate::questions::QuestionBank;
use crate::rankings::RankingStore;
use crate::rooms::{JoinOutcome, PlayerSender, RoomRegistry, SubmitOutcome};
use log::{debug, error, info, warn};
use shared::{Request, Response};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Shared services handed to every session task.
#[derive(Clone)]
struct SessionContext {
    registry: Arc<RoomRegistry>,
    rankings: Arc<RankingStore>,
    bank: Arc<QuestionBank>,
    timing: GameTiming,
}

/// Main server: accepts connections and spawns one session task per client.
pub struct Server {
    listener: TcpListener,
    context: SessionContext,
}

impl Server {
    /// Binds the listening socket. This is the only failure that is fatal
    /// to the process; everything after it is contained per connection.
    pub async fn new(
        addr: &str,
        bank: QuestionBank,
        rankings: RankingStore,
        timing: GameTiming,
    ) -> Result<Self, Box<dyn Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            context: SessionContext {
                registry: Arc::new(RoomRegistry::new()),
                rankings: Arc::new(rankings),
                bank: Arc::new(bank),
                timing,
            },
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the listener fails.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (socket, addr) = self.listener.accept().await?;
            info!("Connection from {}", addr);
            let context = self.context.clone();
            tokio::spawn(async move {
                handle_connection(socket, addr, context).await;
            });
        }
    }
}

/// One session: a writer task serializing everything sent to this socket,
/// plus a read loop dispatching newline-delimited JSON requests.
async fn handle_connection(socket: TcpStream, addr: SocketAddr, context: SessionContext) {
    let (read_half, write_half) = socket.into_split();
    let (outbound, outbound_rx) = mpsc::unbounded_channel::<Response>();
    tokio::spawn(write_outbound(write_half, outbound_rx, addr));

    let mut session = Session {
        name: None,
        addr,
        outbound,
        context,
    };

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Request>(line) {
                    Ok(request) => session.dispatch(request).await,
                    Err(e) => {
                        // Malformed input is unrecoverable framing-wise;
                        // treat it like a disconnect.
                        warn!("Malformed request from {}: {}", addr, e);
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Read error from {}: {}", addr, e);
                break;
            }
        }
    }

    if let Some(name) = session.name.take() {
        info!("Cleaning up session for {}", name);
        session.context.registry.remove_player(&name).await;
    }
    info!("Connection from {} closed", addr);
}

/// Drains the session's outbound queue onto the socket. Ends when every
/// sender clone is gone or the peer stops reading.
async fn write_outbound(
    mut write_half: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Response>,
    addr: SocketAddr,
) {
    while let Some(response) = outbound_rx.recv().await {
        let mut payload = match serde_json::to_vec(&response) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize response for {}: {}", addr, e);
                continue;
            }
        };
        payload.push(b'\n');
        if let Err(e) = write_half.write_all(&payload).await {
            debug!("Failed to send to {}: {}", addr, e);
            break;
        }
    }
}

struct Session {
    name: Option<String>,
    addr: SocketAddr,
    outbound: PlayerSender,
    context: SessionContext,
}

impl Session {
    fn reply(&self, response: Response) {
        let _ = self.outbound.send(response);
    }

    async fn dispatch(&mut self, request: Request) {
        match (self.name.clone(), request) {
            (_, Request::Register { name }) => self.handle_register(name),
            (None, _) => {
                self.reply(Response::error("You must register a player name first."));
            }
            (Some(player), Request::CreateRoom { mode, question_count }) => {
                self.handle_create(&player, mode, question_count).await;
            }
            (Some(player), Request::JoinRoom { room_id }) => {
                self.handle_join(&player, &room_id).await;
            }
            (Some(player), Request::SubmitAnswer { room_id, answer, timestamp }) => {
                self.handle_answer(&player, &room_id, &answer, timestamp).await;
            }
            (Some(_), Request::ListRankings) => self.handle_rankings().await,
        }
    }

    fn handle_register(&mut self, name: String) {
        // The name binds this connection for the rest of the session; a
        // rename would orphan room memberships held under the old name.
        if self.name.is_some() {
            self.reply(Response::error("Already registered."));
            return;
        }
        info!("Player {} registered from {}", name, self.addr);
        self.reply(Response::ok(format!("Welcome, {}!", name)));
        self.name = Some(name);
    }

    async fn handle_create(&self, player: &str, mode: usize, question_count: usize) {
        if !(1..=2).contains(&mode) {
            self.reply(Response::error("Mode must be 1 or 2 players."));
            return;
        }
        if question_count == 0 {
            self.reply(Response::error("A game needs at least one question."));
            return;
        }

        let (room_id, start) = self
            .context
            .registry
            .create_room(mode, question_count, player, self.outbound.clone())
            .await;
        self.reply(Response::ok_room(
            format!("Room {} created. Waiting for players...", room_id),
            room_id.clone(),
        ));
        if start {
            self.start_game(room_id);
        }
    }

    async fn handle_join(&self, player: &str, room_id: &str) {
        match self
            .context
            .registry
            .join_room(room_id, player, self.outbound.clone())
            .await
        {
            JoinOutcome::Joined { start } => {
                self.reply(Response::ok_room(
                    format!("You joined room {}", room_id),
                    room_id,
                ));
                if start {
                    self.start_game(room_id.to_string());
                }
            }
            JoinOutcome::Full | JoinOutcome::NotFound => {
                self.reply(Response::error("Room not found or full."));
            }
        }
    }

    async fn handle_answer(&self, player: &str, room_id: &str, answer: &str, timestamp: f64) {
        // The client stamp is informational only; scoring uses the server's
        // monotonic clock so skewed client clocks cannot distort points.
        let outcome = self.context.registry.submit_answer(room_id, player, answer).await;
        debug!(
            "Answer '{}' from {} in {} (client time {:.3}): {:?}",
            answer, player, room_id, timestamp, outcome
        );
        if let SubmitOutcome::Scored { points } = outcome {
            debug!("{} scored {} points in {}", player, points, room_id);
        }
    }

    async fn handle_rankings(&self) {
        let rankings = self.context.rankings.sorted_rankings().await;
        self.reply(Response::ok_rankings(rankings));
    }

    fn start_game(&self, room_id: String) {
        spawn_game(
            Arc::clone(&self.context.registry),
            Arc::clone(&self.context.rankings),
            Arc::clone(&self.context.bank),
            room_id,
            self.context.timing,
        );
    }
}
