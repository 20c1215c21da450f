use crate::questions::QuestionBank;
use crate::rankings::RankingStore;
use crate::rooms::{RoomRegistry, RoundStatus};
use log::{debug, info};
use shared::{ANSWER_POLL_INTERVAL_MS, INTER_ROUND_PAUSE_SECS, QUESTION_TIMEOUT_SECS};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// Timing knobs for the question/answer cycle. Defaults are the production
/// values; tests shrink them to keep runs fast.
#[derive(Debug, Clone, Copy)]
pub struct GameTiming {
    /// How long players get to answer each question.
    pub question_timeout: Duration,
    /// How often the driver re-checks a round for quorum.
    pub poll_interval: Duration,
    /// Gap between rounds so clients can render the previous result.
    pub inter_round_pause: Duration,
}

impl Default for GameTiming {
    fn default() -> Self {
        Self {
            question_timeout: Duration::from_secs(QUESTION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(ANSWER_POLL_INTERVAL_MS),
            inter_round_pause: Duration::from_secs(INTER_ROUND_PAUSE_SECS),
        }
    }
}

/// Spawns the driver task for a room that just reached its player count.
pub fn spawn_game(
    registry: Arc<RoomRegistry>,
    rankings: Arc<RankingStore>,
    bank: Arc<QuestionBank>,
    room_id: String,
    timing: GameTiming,
) -> JoinHandle<()> {
    tokio::spawn(run_game(registry, rankings, bank, room_id, timing))
}

/// Drives one room through its question/answer rounds until the game ends
/// or the room disappears underneath it.
///
/// The driver owns no room state. Every step goes back through the registry
/// and re-checks that the room still exists, which doubles as the
/// cancellation mechanism: concurrent disconnects empty or delete the room
/// and the next check here terminates the task.
pub async fn run_game(
    registry: Arc<RoomRegistry>,
    rankings: Arc<RankingStore>,
    bank: Arc<QuestionBank>,
    room_id: String,
    timing: GameTiming,
) {
    let Some(requested) = registry.requested_questions(&room_id).await else {
        return;
    };

    // One draw without replacement for the whole game. A bank smaller than
    // the request shortens the game rather than repeating questions.
    let questions = bank.sample(requested);
    let round_total = questions.len();
    if round_total < requested {
        debug!(
            "Room {}: bank holds {} questions, trimming game from {}",
            room_id, round_total, requested
        );
    }
    info!("Starting game in room {} ({} round(s))", room_id, round_total);

    for (index, question) in questions.into_iter().enumerate() {
        if !registry.begin_round(&room_id, question, index + 1, round_total).await {
            return;
        }

        let deadline = Instant::now() + timing.question_timeout;
        let mut timed_out = true;
        while Instant::now() < deadline {
            match registry.round_status(&room_id).await {
                RoundStatus::RoomGone => return,
                RoundStatus::Quorum => {
                    timed_out = false;
                    break;
                }
                RoundStatus::Pending => sleep(timing.poll_interval).await,
            }
        }

        if timed_out {
            debug!("Room {}: round {} timed out", room_id, index + 1);
        }
        registry.end_round(&room_id, timed_out).await;
        sleep(timing.inter_round_pause).await;
    }

    // Standings fold happens after the room is Finished and before it is
    // deleted from the registry.
    if let Some(scores) = registry.finish_game(&room_id).await {
        rankings.record_game(&scores).await;
        registry.delete_room(&room_id).await;
    }
}
